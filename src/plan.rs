use crate::core::{PowerPlan, PowerPlanTarget};
use crate::util::error::ControlError;
use crate::util::sysfs::SysfsAccessor;
use log::{debug, info};
use std::path::Path;

pub type Result<T, E = ControlError> = std::result::Result<T, E>;

pub const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Maps a plan identifier to the concrete values the apply engine writes.
/// Resolution is a single terminal step; only `Auto` consults the system,
/// by probing the power-supply tree for a mains adapter.
pub struct PowerPlanResolver<'a, S: SysfsAccessor> {
    sysfs: &'a S,
    has_performance_state_driver: bool,
}

impl<'a, S: SysfsAccessor> PowerPlanResolver<'a, S> {
    pub const fn new(sysfs: &'a S, has_performance_state_driver: bool) -> Self {
        Self {
            sysfs,
            has_performance_state_driver,
        }
    }

    pub fn resolve(&self, plan: PowerPlan) -> Result<PowerPlanTarget> {
        let target = match plan {
            PowerPlan::Powersave => PowerPlanTarget {
                max_percent: 0,
                min_percent: 0,
                turbo_enabled: false,
                governor: "powersave".to_string(),
            },
            // Balanced and Performance are the same tuple; the governor that
            // expresses "scale on demand" differs per driver.
            PowerPlan::Balanced | PowerPlan::Performance => PowerPlanTarget {
                max_percent: 100,
                min_percent: 0,
                turbo_enabled: false,
                governor: if self.has_performance_state_driver {
                    "powersave".to_string()
                } else {
                    "ondemand".to_string()
                },
            },
            PowerPlan::MaxPerformance => PowerPlanTarget {
                max_percent: 100,
                min_percent: 100,
                turbo_enabled: true,
                governor: "performance".to_string(),
            },
            PowerPlan::Auto => {
                let plan = if self.on_ac_power()? {
                    info!("Mains adapter online, auto plan resolves to performance");
                    PowerPlan::Performance
                } else {
                    info!("On battery, auto plan resolves to powersave");
                    PowerPlan::Powersave
                };
                return self.resolve(plan);
            }
        };
        Ok(target)
    }

    /// Whether the first mains-type power supply reports itself online.
    ///
    /// Fails when the power-supply tree cannot be listed or holds no
    /// mains-type entry; the auto plan never silently defaults.
    fn on_ac_power(&self) -> Result<bool> {
        let base = Path::new(POWER_SUPPLY_DIR);
        let entries = self.sysfs.list_dir(base).map_err(|e| {
            ControlError::PlanResolution(format!("cannot scan {POWER_SUPPLY_DIR}: {e}"))
        })?;

        for name in entries {
            if name == "." || name == ".." {
                continue;
            }
            let supply = base.join(&name);
            let Ok(kind) = self.sysfs.read(&supply.join("type")) else {
                debug!("power supply '{name}' has no readable type attribute, skipping");
                continue;
            };
            if kind != "Mains" {
                continue;
            }
            let online = self.sysfs.read(&supply.join("online")).map_err(|e| {
                ControlError::PlanResolution(format!(
                    "cannot read online state of mains supply '{name}': {e}"
                ))
            })?;
            return Ok(online == "1");
        }

        Err(ControlError::PlanResolution(format!(
            "no mains-type power supply found under {POWER_SUPPLY_DIR}"
        )))
    }
}
