use crate::topology::CpuTopology;

/// Converts between raw kHz and the 0-100% user-facing scale.
///
/// Both min and max convert relative to `cpuinfo_max_freq`. The kernel's
/// percentage files behave this way, so the minimum is deliberately not
/// scaled against `cpuinfo_min_freq`.
#[derive(Debug, Clone, Copy)]
pub struct ValueNormalizer {
    info_max_khz: u64,
}

impl ValueNormalizer {
    pub const fn new(topology: &CpuTopology) -> Self {
        Self {
            info_max_khz: topology.info_max_frequency_khz,
        }
    }

    pub const fn percent_to_khz(&self, percent: u32) -> u64 {
        self.info_max_khz * percent as u64 / 100
    }

    pub fn khz_to_percent(&self, khz: u64) -> u32 {
        (khz as f64 / self.info_max_khz as f64 * 100.0).round() as u32
    }
}

/// Resolve a requested (min%, max%) pair against the previously observed
/// values. Explicit values clamp to [0, 100]; omitted values keep the
/// previous ones. Min always yields to max.
///
/// Must run before any write is issued.
pub fn sanitize_range(
    requested_min: Option<u32>,
    requested_max: Option<u32>,
    previous_min: u32,
    previous_max: u32,
) -> (u32, u32) {
    let max = requested_max.map_or(previous_max, |v| v.min(100));
    let mut min = requested_min.map_or(previous_min, |v| v.min(100));
    if min >= max {
        min = max.saturating_sub(1);
    }
    (min, max)
}

/// On-wire value for the normalized "turbo enabled" boolean.
///
/// intel_pstate exposes `no_turbo` (1 = turbo disabled); the legacy driver
/// exposes `boost` (1 = turbo enabled). Higher layers only ever see the
/// normalized boolean.
pub const fn turbo_to_wire(turbo_enabled: bool, has_performance_state_driver: bool) -> &'static str {
    if has_performance_state_driver {
        if turbo_enabled { "0" } else { "1" }
    } else if turbo_enabled {
        "1"
    } else {
        "0"
    }
}

/// Normalized turbo state from a raw attribute value, or `None` when the
/// kernel reports something unexpected.
pub fn turbo_from_wire(raw: &str, has_performance_state_driver: bool) -> Option<bool> {
    match raw.trim() {
        "0" => Some(has_performance_state_driver),
        "1" => Some(!has_performance_state_driver),
        _ => None,
    }
}
