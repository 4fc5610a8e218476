//! Alarm Defaults
//!
//! Thresholds and hysteresis durations per channel, as tuned on the deployed
//! sensing board.

// ===== GAS (CO) =====

/// Carbon monoxide concentration considered critical (ppm).
pub const CO_CRITICAL_PPM: f32 = 50.0;

/// Critical CO must persist this long before Warning (milliseconds).
pub const CO_WARNING_MS: u32 = 5_000;

/// Critical CO must persist this long before Danger (milliseconds).
pub const CO_DANGER_MS: u32 = 30_000;

/// Continuous normal CO needed to recover (milliseconds).
pub const CO_RECOVERY_MS: u32 = 10_000;

// ===== TEMPERATURE =====

/// Lowest comfortable ambient temperature (°C).
pub const TEMP_MIN_C: f32 = 10.0;

/// Highest comfortable ambient temperature (°C).
pub const TEMP_MAX_C: f32 = 35.0;

pub const TEMP_WARNING_MS: u32 = 10_000;
pub const TEMP_DANGER_MS: u32 = 60_000;
pub const TEMP_RECOVERY_MS: u32 = 15_000;

// ===== VITALS =====

/// Lower heart rate bound (beats per minute).
pub const HR_MIN_BPM: f32 = 50.0;

/// Upper heart rate bound (beats per minute).
pub const HR_MAX_BPM: f32 = 120.0;

/// Oxygen saturation below which vitals are critical (%).
pub const SPO2_MIN_PCT: f32 = 90.0;

pub const VITALS_WARNING_MS: u32 = 10_000;
pub const VITALS_DANGER_MS: u32 = 60_000;
pub const VITALS_RECOVERY_MS: u32 = 15_000;

// ===== PRESENCE =====

/// Obstacle distance considered critical (centimetres).
pub const PRESENCE_CRITICAL_CM: f32 = 50.0;

pub const PRESENCE_WARNING_MS: u32 = 2_000;
pub const PRESENCE_DANGER_MS: u32 = 10_000;
pub const PRESENCE_RECOVERY_MS: u32 = 5_000;
