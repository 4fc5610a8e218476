//! Run-Loop Cadences
//!
//! Intervals used by the scheduler to gate periodic work on both node kinds.

// ===== EVALUATION =====

/// Alarm evaluation cadence (milliseconds).
///
/// Both boards run their logic step five times a second.
pub const LOGIC_INTERVAL_MS: u32 = 200;

// ===== SENSOR READS =====

/// Gas sensor read cadence (milliseconds).
pub const GAS_READ_INTERVAL_MS: u32 = 1000;

/// Temperature read cadence (milliseconds).
///
/// Conversions take up to 750 ms, so reads are started at most every 2 s.
pub const TEMPERATURE_READ_INTERVAL_MS: u32 = 2000;

/// Pulse oximeter read cadence (milliseconds).
pub const VITALS_READ_INTERVAL_MS: u32 = 1000;

/// Ultrasonic ranging cadence (milliseconds).
pub const PRESENCE_READ_INTERVAL_MS: u32 = 500;

// ===== DIAGNOSTICS =====

/// Diagnostics summary cadence (milliseconds).
pub const DIAGNOSTICS_INTERVAL_MS: u32 = 10_000;

/// Default override window for an injected reading (milliseconds).
pub const MANUAL_OVERRIDE_WINDOW_MS: u32 = 10_000;
