//! Constants for HazardGuard Core
//!
//! Every default the node presets draw from lives here. The values come from
//! the deployed sensing and actuating boards; they are read once when a
//! configuration is built and never consulted from the hot path.
//!
//! ## Organization
//!
//! - **Time**: run-loop cadences
//! - **Link**: lossy-link protocol timing and framing limits
//! - **Buffers**: fixed capacities of the heapless containers
//! - **Alarm**: per-channel thresholds and hysteresis durations
//! - **Timers**: well-known scheduler timer names

/// Run-loop cadences.
pub mod time;

/// Link protocol timing and framing limits.
pub mod link;

/// Capacities of fixed-size containers.
pub mod buffers;

/// Default alarm thresholds and hysteresis timings per channel.
pub mod alarm;

/// Well-known scheduler timer names.
pub mod timers;

pub use buffers::{EVENT_QUEUE_DEPTH, MAX_CHANNELS, MAX_DATAGRAM_LEN, MAX_DRAIN_PER_POLL, MAX_TIMERS};
pub use link::{ACK_TIMEOUT_MS, MAX_RETRIES, REINIT_INTERVAL_MS, SEND_INTERVAL_MS, STALE_TIMEOUT_MS};
pub use time::{DIAGNOSTICS_INTERVAL_MS, LOGIC_INTERVAL_MS};
