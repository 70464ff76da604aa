use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Set,
}

/// Named bundle of (max, min, turbo, governor) values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerPlan {
    Powersave,
    Balanced,
    Performance,
    MaxPerformance,
    /// Pick Performance or Powersave from the detected power source.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TurboSetting {
    On,
    Off,
}

impl TurboSetting {
    pub const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Concrete values the apply engine will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerPlanTarget {
    pub max_percent: u32,
    pub min_percent: u32,
    pub turbo_enabled: bool,
    pub governor: String,
}

/// Validated user intent, produced by the CLI layer and consumed once.
#[derive(Debug, Clone)]
pub struct Request {
    pub action: Action,
    pub max_percent: Option<u32>,
    pub min_percent: Option<u32>,
    pub turbo: Option<bool>,
    pub governor: Option<String>,
    pub plan: Option<PowerPlan>,
    pub no_sleep: bool,
}

/// Read-only normalized view of the current scaling state.
#[derive(Debug, Clone)]
pub struct CpuSnapshot {
    pub governor: Option<String>,
    pub min_percent: u32,
    pub max_percent: u32,
    pub min_khz: u64,
    pub max_khz: u64,
    pub turbo_enabled: Option<bool>,
    // Realtime per-core frequencies from /proc/cpuinfo, informational only.
    pub per_core_mhz: Vec<f32>,
}
