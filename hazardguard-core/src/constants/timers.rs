//! Scheduler Timer Names
//!
//! Timers are keyed by `&'static str`; every name used by the runtime is
//! declared here so collaborators can share cadences with it.

pub const LOGIC: &str = "logic";
pub const LINK_SEND: &str = "link.send";
pub const LINK_REINIT: &str = "link.reinit";
pub const DIAGNOSTICS: &str = "diagnostics";

pub const READ_GAS: &str = "read.co";
pub const READ_TEMPERATURE: &str = "read.temp";
pub const READ_VITALS: &str = "read.heart";
pub const READ_PRESENCE: &str = "read.ultrasonic";
