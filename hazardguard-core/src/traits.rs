//! Collaborator traits
//!
//! The core never touches hardware. Sensors, output devices and the clock
//! are reached through the narrow contracts below; the datagram medium has
//! its own trait in [`crate::link::Transport`]. Keep these small: a board
//! port implements each one in a few lines.

use crate::alarm::{Reading, SystemAlarm};
use crate::errors::{ActuatorError, SensorError};
use crate::link::Payload;
use crate::mirror::PeerStateMirror;
use crate::runtime::{ManualCommand, NodeView};
use crate::time::Timestamp;

/// Source of monotonic time
///
/// Implementations return a wrapping millisecond counter (see
/// [`crate::time`]). `now()` must never block.
pub trait TimeSource {
    fn now(&self) -> Timestamp;
}

/// A non-blocking sensor
///
/// Reads that take longer than a tick are two-phase: the first call starts
/// the conversion and returns `WouldBlock`, later calls keep returning
/// `WouldBlock` until the result is ready. The runtime polls an in-flight
/// sensor on every tick, so implementations must not wait internally beyond
/// a short, bounded bus timeout.
///
/// `Ok(None)` means the device answered but has no measurement (e.g. no
/// finger on the oximeter); `Err(Other(_))` is a transient failure. Both are
/// handled by the channel's reading policy.
pub trait Sensor {
    fn poll_read(&mut self, now: Timestamp) -> nb::Result<Option<Reading>, SensorError>;
}

/// Output side of a node
///
/// Called once per tick after the alarm engine and the link have run.
pub trait Actuator {
    /// Payload published by the remote node and mirrored locally
    type Peer: Payload;

    /// React to the current system-wide alarm
    fn apply(&mut self, alarm: &SystemAlarm, now: Timestamp) -> Result<(), ActuatorError>;

    /// React to the mirrored peer state; check `is_stale` before trusting it
    fn apply_peer_snapshot(
        &mut self,
        mirror: &PeerStateMirror<Self::Peer>,
        now: Timestamp,
    ) -> Result<(), ActuatorError>;

    /// Manual command captured by an input device since the last tick
    fn poll_command(&mut self) -> Option<ManualCommand> {
        None
    }
}

/// Builds the payload this node publishes over the link
pub trait SnapshotSource {
    type Payload: Payload;

    fn snapshot(&mut self, view: &NodeView<'_>) -> Self::Payload;
}
