use crate::util::error::ControlError;
use crate::util::sysfs::SysfsAccessor;
use std::path::{Path, PathBuf};

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

pub const CPU_BASE: &str = "/sys/devices/system/cpu";
pub const PROC_CPUINFO: &str = "/proc/cpuinfo";

/// Name the kernel reports for the performance-percentage driver.
pub const INTEL_PSTATE_DRIVER: &str = "intel_pstate";

/// Discovered machine state. Built once at startup by probing sysfs and
/// `/proc/cpuinfo`, immutable afterwards; everything downstream borrows it.
#[derive(Debug, Clone)]
pub struct CpuTopology {
    pub driver_name: String,
    pub has_performance_state_driver: bool,
    pub core_count: u32,
    pub info_min_frequency_khz: u64,
    pub info_max_frequency_khz: u64,
    pub per_core_min_freq_paths: Vec<PathBuf>,
    pub per_core_max_freq_paths: Vec<PathBuf>,
    pub per_core_governor_paths: Vec<PathBuf>,
}

/// Path of a per-core cpufreq attribute, e.g. `cpu3/cpufreq/scaling_governor`.
pub fn cpufreq_attr(core_id: u32, attr: &str) -> PathBuf {
    Path::new(CPU_BASE)
        .join(format!("cpu{core_id}"))
        .join("cpufreq")
        .join(attr)
}

/// Count `processor` entries in `/proc/cpuinfo` content.
pub fn count_processors(cpuinfo: &str) -> u32 {
    cpuinfo
        .lines()
        .filter(|line| {
            line.split(':')
                .next()
                .is_some_and(|key| key.trim() == "processor")
        })
        .count() as u32
}

impl CpuTopology {
    /// Probe the running system. Any unreadable attribute here means the
    /// machine cannot be controlled at all, so discovery fails before any
    /// other operation is attempted.
    pub fn discover<S: SysfsAccessor>(sysfs: &S) -> Result<Self> {
        let cpuinfo = sysfs
            .read_all(Path::new(PROC_CPUINFO))
            .map_err(|e| ControlError::Discovery(format!("cannot read {PROC_CPUINFO}: {e}")))?;

        let core_count = count_processors(&cpuinfo);
        if core_count == 0 {
            return Err(ControlError::Discovery(format!(
                "no processors listed in {PROC_CPUINFO}"
            )));
        }

        let driver_name = sysfs
            .read(&cpufreq_attr(0, "scaling_driver"))
            .map_err(|e| ControlError::Discovery(format!("cannot read scaling driver: {e}")))?;

        let info_min_frequency_khz = read_info_khz(sysfs, "cpuinfo_min_freq")?;
        let info_max_frequency_khz = read_info_khz(sysfs, "cpuinfo_max_freq")?;
        if info_min_frequency_khz >= info_max_frequency_khz {
            return Err(ControlError::Discovery(format!(
                "hardware frequency bounds are inconsistent: min {info_min_frequency_khz} kHz, \
                 max {info_max_frequency_khz} kHz"
            )));
        }

        let per_core = |attr: &str| -> Vec<PathBuf> {
            (0..core_count).map(|id| cpufreq_attr(id, attr)).collect()
        };

        Ok(Self {
            has_performance_state_driver: driver_name == INTEL_PSTATE_DRIVER,
            driver_name,
            core_count,
            info_min_frequency_khz,
            info_max_frequency_khz,
            per_core_min_freq_paths: per_core("scaling_min_freq"),
            per_core_max_freq_paths: per_core("scaling_max_freq"),
            per_core_governor_paths: per_core("scaling_governor"),
        })
    }
}

fn read_info_khz<S: SysfsAccessor>(sysfs: &S, attr: &str) -> Result<u64> {
    let raw = sysfs
        .read(&cpufreq_attr(0, attr))
        .map_err(|e| ControlError::Discovery(format!("cannot read {attr}: {e}")))?;
    raw.parse::<u64>()
        .map_err(|_| ControlError::Discovery(format!("cannot parse {attr} value '{raw}'")))
}
