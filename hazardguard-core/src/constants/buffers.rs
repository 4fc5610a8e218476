//! Buffer Sizes and Memory Constraints
//!
//! Fixed capacities for the heapless containers used by the core. Map
//! capacities must be powers of two (`heapless::FnvIndexMap` requirement).

// ===== SCHEDULER =====

/// Maximum number of distinct timer names.
pub const MAX_TIMERS: usize = 32;

// ===== ALARM =====

/// Maximum number of configured alarm channels.
pub const MAX_CHANNELS: usize = 8;

// ===== LINK =====

/// Urgent events that may wait for transmission.
///
/// A push into a full queue supersedes the oldest entry.
pub const EVENT_QUEUE_DEPTH: usize = 4;

/// Maximum encoded frame length (bytes).
///
/// Matches the payload limit of the radio link; shorter frames may be NUL
/// padded by the transport.
pub const MAX_DATAGRAM_LEN: usize = 250;

/// Datagrams drained from the transport per poll.
pub const MAX_DRAIN_PER_POLL: usize = 10;

// ===== SENSORS =====

/// Samples kept by the vitals estimator window.
pub const VITALS_WINDOW_LEN: usize = 64;
