use crate::core::CpuSnapshot;
use crate::normalize::{self, ValueNormalizer};
use crate::topology::{CPU_BASE, CpuTopology, PROC_CPUINFO};
use crate::util::error::ControlError;
use crate::util::sysfs::SysfsAccessor;
use std::path::Path;

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

/// Extract the realtime "cpu MHz" values from `/proc/cpuinfo` content.
pub fn parse_core_mhz(cpuinfo: &str) -> Vec<f32> {
    cpuinfo
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim() != "cpu MHz" {
                return None;
            }
            value.trim().parse::<f32>().ok()
        })
        .collect()
}

/// Build a normalized read-only view of the current scaling state.
///
/// The min/max pair must be readable; governor, turbo, and the realtime
/// frequency list degrade to empty/unknown rather than failing the whole
/// snapshot.
pub fn read_snapshot<S: SysfsAccessor>(sysfs: &S, topology: &CpuTopology) -> Result<CpuSnapshot> {
    let normalizer = ValueNormalizer::new(topology);
    let pstate = topology.has_performance_state_driver;

    let (min_percent, max_percent, min_khz, max_khz) = if pstate {
        let base = Path::new(CPU_BASE).join("intel_pstate");
        let min_percent = read_u64(sysfs, &base.join("min_perf_pct"))? as u32;
        let max_percent = read_u64(sysfs, &base.join("max_perf_pct"))? as u32;
        (
            min_percent,
            max_percent,
            normalizer.percent_to_khz(min_percent),
            normalizer.percent_to_khz(max_percent),
        )
    } else {
        let min_khz = read_u64(sysfs, &topology.per_core_min_freq_paths[0])?;
        let max_khz = read_u64(sysfs, &topology.per_core_max_freq_paths[0])?;
        (
            normalizer.khz_to_percent(min_khz),
            normalizer.khz_to_percent(max_khz),
            min_khz,
            max_khz,
        )
    };

    let governor = sysfs.read(&topology.per_core_governor_paths[0]).ok();

    let turbo_path = if pstate {
        Path::new(CPU_BASE).join("intel_pstate").join("no_turbo")
    } else {
        Path::new(CPU_BASE).join("cpufreq").join("boost")
    };
    let turbo_enabled = sysfs
        .read(&turbo_path)
        .ok()
        .and_then(|raw| normalize::turbo_from_wire(&raw, pstate));

    let per_core_mhz = sysfs
        .read_all(Path::new(PROC_CPUINFO))
        .map(|content| parse_core_mhz(&content))
        .unwrap_or_default();

    Ok(CpuSnapshot {
        governor,
        min_percent,
        max_percent,
        min_khz,
        max_khz,
        turbo_enabled,
        per_core_mhz,
    })
}

fn read_u64<S: SysfsAccessor>(sysfs: &S, path: &Path) -> Result<u64> {
    let raw = sysfs.read(path)?;
    raw.parse::<u64>().map_err(|_| {
        ControlError::ReadError(format!(
            "could not parse '{}' from {}",
            raw,
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::cpufreq_attr;
    use crate::util::sysfs::mock::MockSysfs;
    use std::path::PathBuf;

    fn pstate_topology() -> CpuTopology {
        CpuTopology {
            driver_name: "intel_pstate".to_string(),
            has_performance_state_driver: true,
            core_count: 2,
            info_min_frequency_khz: 400_000,
            info_max_frequency_khz: 4_000_000,
            per_core_min_freq_paths: vec![
                cpufreq_attr(0, "scaling_min_freq"),
                cpufreq_attr(1, "scaling_min_freq"),
            ],
            per_core_max_freq_paths: vec![
                cpufreq_attr(0, "scaling_max_freq"),
                cpufreq_attr(1, "scaling_max_freq"),
            ],
            per_core_governor_paths: vec![
                cpufreq_attr(0, "scaling_governor"),
                cpufreq_attr(1, "scaling_governor"),
            ],
        }
    }

    fn pstate_attr(attr: &str) -> PathBuf {
        Path::new(CPU_BASE).join("intel_pstate").join(attr)
    }

    #[test]
    fn parse_core_mhz_reads_all_cores() {
        let cpuinfo = "\
processor\t: 0
cpu MHz\t\t: 1992.004
processor\t: 1
cpu MHz\t\t: 2104.773
";
        assert_eq!(parse_core_mhz(cpuinfo), vec![1992.004, 2104.773]);
        assert!(parse_core_mhz("no frequencies here").is_empty());
    }

    #[test]
    fn snapshot_on_pstate_reads_percent_files() {
        let sysfs = MockSysfs::new()
            .with_file(pstate_attr("min_perf_pct"), "25")
            .with_file(pstate_attr("max_perf_pct"), "100")
            .with_file(pstate_attr("no_turbo"), "0")
            .with_file(cpufreq_attr(0, "scaling_governor"), "powersave");

        let snapshot = read_snapshot(&sysfs, &pstate_topology()).unwrap();
        assert_eq!(snapshot.min_percent, 25);
        assert_eq!(snapshot.max_percent, 100);
        assert_eq!(snapshot.min_khz, 1_000_000);
        assert_eq!(snapshot.max_khz, 4_000_000);
        assert_eq!(snapshot.turbo_enabled, Some(true));
        assert_eq!(snapshot.governor.as_deref(), Some("powersave"));
        // /proc/cpuinfo missing in the fixture; informational list degrades.
        assert!(snapshot.per_core_mhz.is_empty());
    }

    #[test]
    fn snapshot_on_legacy_normalizes_khz() {
        let topology = CpuTopology {
            driver_name: "acpi-cpufreq".to_string(),
            has_performance_state_driver: false,
            ..pstate_topology()
        };
        let sysfs = MockSysfs::new()
            .with_file(cpufreq_attr(0, "scaling_min_freq"), "400000")
            .with_file(cpufreq_attr(0, "scaling_max_freq"), "2000000")
            .with_file(Path::new(CPU_BASE).join("cpufreq").join("boost"), "1")
            .with_file(cpufreq_attr(0, "scaling_governor"), "ondemand");

        let snapshot = read_snapshot(&sysfs, &topology).unwrap();
        assert_eq!(snapshot.min_percent, 10);
        assert_eq!(snapshot.max_percent, 50);
        assert_eq!(snapshot.turbo_enabled, Some(true));
        assert_eq!(snapshot.governor.as_deref(), Some("ondemand"));
    }

    #[test]
    fn snapshot_surfaces_garbage_bounds_as_read_errors() {
        let sysfs = MockSysfs::new()
            .with_file(pstate_attr("min_perf_pct"), "not-a-number")
            .with_file(pstate_attr("max_perf_pct"), "100");

        let err = read_snapshot(&sysfs, &pstate_topology()).unwrap_err();
        assert!(matches!(err, ControlError::ReadError(_)));
    }

    #[test]
    fn snapshot_requires_readable_bounds() {
        let sysfs = MockSysfs::new().with_file(cpufreq_attr(0, "scaling_governor"), "powersave");
        assert!(read_snapshot(&sysfs, &pstate_topology()).is_err());
    }
}
