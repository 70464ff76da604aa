use crate::core::{CpuSnapshot, PowerPlanTarget, Request};
use crate::normalize::{self, ValueNormalizer};
use crate::topology::{CPU_BASE, CpuTopology};
use crate::util::error::ControlError;
use crate::util::sysfs::SysfsAccessor;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

/// Pause between the reset and the real write. Some performance-state
/// drivers were observed to need a moment before re-reading their tables.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Result of an apply run. Individual write failures do not abort the
/// sequence; they are counted and surfaced here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOutcome {
    pub failed_writes: u32,
}

/// Merge plan values and explicit overrides into the final target.
///
/// Explicit CLI values win over the plan; anything still unspecified keeps
/// what the kernel currently reports. The min/max pair is sanitized here,
/// before any write is issued.
pub fn resolve_target(
    request: &Request,
    plan_target: Option<&PowerPlanTarget>,
    snapshot: &CpuSnapshot,
) -> PowerPlanTarget {
    let requested_max = request
        .max_percent
        .or(plan_target.map(|t| t.max_percent));
    let requested_min = request
        .min_percent
        .or(plan_target.map(|t| t.min_percent));
    let (min_percent, max_percent) = normalize::sanitize_range(
        requested_min,
        requested_max,
        snapshot.min_percent,
        snapshot.max_percent,
    );

    let turbo_enabled = request
        .turbo
        .or(plan_target.map(|t| t.turbo_enabled))
        .or(snapshot.turbo_enabled)
        .unwrap_or(false);

    let governor = request
        .governor
        .clone()
        .or_else(|| plan_target.map(|t| t.governor.clone()))
        .or_else(|| snapshot.governor.clone())
        .unwrap_or_else(|| "powersave".to_string());

    PowerPlanTarget {
        max_percent,
        min_percent,
        turbo_enabled,
        governor,
    }
}

/// Executes the safe, ordered write sequence against the kernel.
///
/// Two phases: reset to a known-sane state, then apply the real target.
/// The reset forces a state transition so drivers that only re-read their
/// internal tables on change pick up the values written afterwards.
pub struct ApplyEngine<'a, S: SysfsAccessor> {
    sysfs: &'a S,
    topology: &'a CpuTopology,
    normalizer: ValueNormalizer,
    privileged: bool,
}

impl<'a, S: SysfsAccessor> ApplyEngine<'a, S> {
    pub fn new(sysfs: &'a S, topology: &'a CpuTopology, privileged: bool) -> Self {
        Self {
            sysfs,
            topology,
            normalizer: ValueNormalizer::new(topology),
            privileged,
        }
    }

    pub fn apply(&self, target: &PowerPlanTarget, no_sleep: bool) -> Result<ApplyOutcome> {
        if !self.privileged {
            return Err(ControlError::Privilege(
                "applying frequency-scaling values requires an effective uid of 0".to_string(),
            ));
        }

        let mut outcome = ApplyOutcome::default();

        // Reset phase: max wide open, min at the floor, powersave governor,
        // turbo off. Unconditional on every set.
        debug!("resetting to sane intermediate state");
        self.write_max(100, &mut outcome);
        self.write_min(0, &mut outcome);
        self.write_governor("powersave", &mut outcome);
        self.write_turbo(false, &mut outcome);

        if no_sleep {
            debug!("settle delay disabled by request");
        } else {
            thread::sleep(SETTLE_DELAY);
        }

        // Apply phase: turbo first, then the min/max pair in whichever order
        // keeps the kernel's view consistent at every intermediate step,
        // governor last.
        debug!(
            "applying target: max {}%, min {}%, turbo {}, governor {}",
            target.max_percent, target.min_percent, target.turbo_enabled, target.governor
        );
        self.write_turbo(target.turbo_enabled, &mut outcome);

        if target.max_percent < self.current_min_percent() {
            // Writing the new max first would leave max below the min the
            // kernel still holds, which it rejects outright.
            self.write_min(target.min_percent, &mut outcome);
            self.write_max(target.max_percent, &mut outcome);
        } else {
            self.write_max(target.max_percent, &mut outcome);
            self.write_min(target.min_percent, &mut outcome);
        }

        self.write_governor(&target.governor, &mut outcome);

        Ok(outcome)
    }

    /// Min percentage the kernel currently holds, consulted to pick the safe
    /// write order. Unreadable means no ordering hazard, so treat as 0.
    fn current_min_percent(&self) -> u32 {
        if self.topology.has_performance_state_driver {
            self.sysfs
                .read(&pstate_attr("min_perf_pct"))
                .ok()
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(0)
        } else {
            self.topology
                .per_core_min_freq_paths
                .first()
                .and_then(|path| self.sysfs.read(path).ok())
                .and_then(|raw| raw.parse::<u64>().ok())
                .map_or(0, |khz| self.normalizer.khz_to_percent(khz))
        }
    }

    fn write_max(&self, percent: u32, outcome: &mut ApplyOutcome) {
        if self.topology.has_performance_state_driver {
            self.write_one(&pstate_attr("max_perf_pct"), &percent.to_string(), outcome);
        } else {
            let khz = self.normalizer.percent_to_khz(percent).to_string();
            for path in &self.topology.per_core_max_freq_paths {
                self.write_one(path, &khz, outcome);
            }
        }
    }

    fn write_min(&self, percent: u32, outcome: &mut ApplyOutcome) {
        if self.topology.has_performance_state_driver {
            self.write_one(&pstate_attr("min_perf_pct"), &percent.to_string(), outcome);
        } else {
            let khz = self.normalizer.percent_to_khz(percent).to_string();
            for path in &self.topology.per_core_min_freq_paths {
                self.write_one(path, &khz, outcome);
            }
        }
    }

    fn write_turbo(&self, enabled: bool, outcome: &mut ApplyOutcome) {
        let pstate = self.topology.has_performance_state_driver;
        let value = normalize::turbo_to_wire(enabled, pstate);
        let path = if pstate {
            pstate_attr("no_turbo")
        } else {
            Path::new(CPU_BASE).join("cpufreq").join("boost")
        };
        self.write_one(&path, value, outcome);
    }

    fn write_governor(&self, governor: &str, outcome: &mut ApplyOutcome) {
        for path in &self.topology.per_core_governor_paths {
            self.write_one(path, governor, outcome);
        }
    }

    // Best effort: a rejected attribute is logged and counted, the rest of
    // the sequence still runs.
    fn write_one(&self, path: &Path, value: &str, outcome: &mut ApplyOutcome) {
        match self.sysfs.write(path, value) {
            Ok(()) => debug!("wrote '{}' to {}", value, path.display()),
            Err(e) => {
                warn!("{e}");
                outcome.failed_writes += 1;
            }
        }
    }
}

fn pstate_attr(attr: &str) -> PathBuf {
    Path::new(CPU_BASE).join("intel_pstate").join(attr)
}
