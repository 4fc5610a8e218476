//! Error Types for HazardGuard Nodes
//!
//! ## Design Philosophy
//!
//! Errors are returned from the run-loop hot path and are stored in tick
//! reports, so they follow the same embedded rules everywhere:
//!
//! 1. **No Heap Allocation**: only `&'static str` and numeric context.
//! 2. **Copy Semantics**: every error is `Copy` and cheap to return.
//! 3. **Actionable**: the variant alone tells the caller how to react.
//!
//! ## Error Categories
//!
//! | Type | Raised by | Handling |
//! |---|---|---|
//! | [`ConfigError`] | configuration validation | fatal at startup |
//! | [`SensorError`] | sensor collaborators | reading treated as absent for that tick |
//! | [`TransportError`] | datagram transports | session torn down, re-init on a fixed interval |
//! | [`CodecError`] | frame decoding | frame dropped and counted |
//! | [`ActuatorError`] | actuator collaborators | recorded, later tasks still run |
//!
//! [`TaskError`] wraps whichever of these made a tick task fail so the
//! runtime can record it without aborting the rest of the tick.
//!
//! Staleness is intentionally not an error: it is the `is_stale` flag on
//! [`crate::mirror::PeerStateMirror`].

use thiserror_no_std::Error;

/// Configuration rejected before the run loop starts
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An interval or duration that must be positive is zero
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    /// Danger would be reached before warning
    #[error("danger time {danger_ms} ms is shorter than warning time {warning_ms} ms")]
    DangerBeforeWarning { warning_ms: u32, danger_ms: u32 },

    /// Staleness must be detected well after an ack times out
    #[error("stale timeout {stale_timeout_ms} ms must exceed ack timeout {ack_timeout_ms} ms")]
    StaleNotAboveAck {
        ack_timeout_ms: u32,
        stale_timeout_ms: u32,
    },

    /// The same channel is configured twice
    #[error("channel {channel} configured more than once")]
    DuplicateChannel { channel: &'static str },

    /// A sensor or command refers to a channel that is not configured
    #[error("channel {channel} is not configured")]
    UnknownChannel { channel: &'static str },

    /// More channels than the engine has room for
    #[error("at most {max} channels can be configured")]
    TooManyChannels { max: usize },

    /// Threshold bounds are inverted or not finite
    #[error("invalid threshold: {reason}")]
    InvalidThreshold { reason: &'static str },

    /// Threshold kind does not fit the channel's reading
    #[error("threshold does not match channel {channel}")]
    ThresholdMismatch { channel: &'static str },

    /// Configuration text could not be parsed
    #[error("configuration parse error at line {line}, column {column}")]
    Parse { line: usize, column: usize },
}

/// Failure reported by a datagram transport
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Used before a successful `init`
    #[error("transport not initialised")]
    NotInitialized,

    /// Radio or socket could not be brought up
    #[error("transport init failed: {reason}")]
    InitFailed { reason: &'static str },

    /// Datagram could not be handed to the medium
    #[error("send failed: {reason}")]
    SendFailed { reason: &'static str },

    /// Receive path reported an error (transient)
    #[error("receive failed: {reason}")]
    ReceiveFailed { reason: &'static str },

    /// Datagram exceeds the medium's payload limit
    #[error("datagram of {len} bytes exceeds limit of {max}")]
    Oversized { len: usize, max: usize },
}

/// Frame could not be encoded or decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Datagram was empty after stripping padding
    #[error("empty frame")]
    Empty,

    /// Not a well-formed frame
    #[error("malformed frame")]
    Malformed,

    /// Frame carries a different schema version
    #[error("schema version {found} does not match expected {expected}")]
    VersionMismatch { expected: u16, found: u16 },

    /// Frame exceeds the datagram size limit
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// Failure reported by a sensor collaborator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed
    #[error("sensor read failed: {reason}")]
    ReadFailed { reason: &'static str },

    /// Bounded bus wait elapsed without a response
    #[error("sensor timed out")]
    Timeout,

    /// Device answered with a value that cannot be a measurement
    #[error("sensor returned an invalid value")]
    InvalidValue,
}

/// Failure reported by an actuator collaborator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Output device rejected the command
    #[error("actuator failed: {reason}")]
    Failed { reason: &'static str },
}

/// A tick task that failed; later tasks in the same tick still run
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    #[error("sensor task: {0}")]
    Sensor(#[from] SensorError),

    #[error("link task: {0}")]
    Transport(#[from] TransportError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("actuator task: {0}")]
    Actuator(#[from] ActuatorError),
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotInitialized => defmt::write!(fmt, "transport not initialised"),
            Self::InitFailed { reason } => defmt::write!(fmt, "init failed: {}", reason),
            Self::SendFailed { reason } => defmt::write!(fmt, "send failed: {}", reason),
            Self::ReceiveFailed { reason } => defmt::write!(fmt, "receive failed: {}", reason),
            Self::Oversized { len, max } => defmt::write!(fmt, "datagram {} > {}", len, max),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ReadFailed { reason } => defmt::write!(fmt, "read failed: {}", reason),
            Self::Timeout => defmt::write!(fmt, "sensor timeout"),
            Self::InvalidValue => defmt::write!(fmt, "invalid value"),
        }
    }
}
