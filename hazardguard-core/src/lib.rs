//! Core runtime for HazardGuard nodes
//!
//! A HazardGuard installation is two microcontroller nodes: one reads
//! hazard sensors (CO, temperature, heart rate/SpO2, obstacle distance), the
//! other drives LEDs, a buzzer, a servo and a display. This crate holds
//! everything the two share:
//!
//! - [`scheduler`]: named, non-blocking timers with manual-override windows
//! - [`alarm`]: per-channel hysteresis (Normal → Warning → Danger) and
//!   system-level aggregation
//! - [`link`]: sequencing, acknowledgement, burst drain and staleness over
//!   an unreliable datagram transport
//! - [`mirror`]: the last state received from the peer node
//! - [`runtime`]: the single-threaded run-loop tick that ties them together
//!
//! Key constraints:
//! - Runs on a single logical thread; a tick never blocks
//! - Fixed-capacity containers in the hot path
//! - `no_std` + `alloc` capable (disable the default `std` feature)
//!
//! ```no_run
//! use hazardguard_core::{config::NodeConfig, time::MonotonicClock, traits::TimeSource};
//!
//! let config = NodeConfig::sensing_node().validate().unwrap();
//! let clock = MonotonicClock::new();
//! # let _ = (config, clock.now());
//! // let mut node = Node::new(config, transport, peer, app)?;
//! // loop { node.tick(clock.now()); }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod alarm;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod link;
pub mod mirror;
pub mod runtime;
pub mod scheduler;
pub mod sensors;
pub mod time;
pub mod traits;

// Public API
pub use alarm::{AlarmEngine, AlarmLevel, AlarmSource, ChannelId, LevelChange, Reading, SystemAlarm};
pub use config::{NodeConfig, RuntimeConfig};
pub use errors::{ActuatorError, CodecError, ConfigError, SensorError, TaskError, TransportError};
pub use link::{LinkEndpoint, MemoryTransport, Payload, Role, Transport};
pub use mirror::PeerStateMirror;
pub use runtime::{ManualCommand, Node, NodeView, TickReport};
pub use scheduler::Scheduler;
pub use time::Timestamp;
pub use traits::{Actuator, Sensor, SnapshotSource, TimeSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
