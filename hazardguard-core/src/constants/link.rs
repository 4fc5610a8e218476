//! Link Protocol Timing
//!
//! Defaults for the datagram link between the sensing node (initiator) and
//! the actuating node (responder).

// ===== CADENCE =====

/// Periodic snapshot cadence of the initiator (milliseconds).
pub const SEND_INTERVAL_MS: u32 = 200;

/// Fixed retry interval for transport re-initialisation (milliseconds).
///
/// Recovery is deliberately linear; there is no backoff.
pub const REINIT_INTERVAL_MS: u32 = 5000;

// ===== ACKNOWLEDGEMENT =====

/// Time an event waits for its acknowledgement before retransmission (milliseconds).
pub const ACK_TIMEOUT_MS: u32 = 3000;

/// Retransmissions of an unacknowledged event before it is reported failed.
pub const MAX_RETRIES: u8 = 1;

// ===== FRESHNESS =====

/// Silence after which the peer mirror is flagged stale (milliseconds).
///
/// Must stay well above [`ACK_TIMEOUT_MS`].
pub const STALE_TIMEOUT_MS: u32 = 15_000;
