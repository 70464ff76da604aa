mod core;
mod engine;
mod monitor;
mod normalize;
mod plan;
mod topology;
mod util;

use crate::core::{Action, CpuSnapshot, PowerPlan, Request, TurboSetting};
use crate::engine::ApplyEngine;
use crate::plan::PowerPlanResolver;
use crate::topology::CpuTopology;
use crate::util::error::ControlError;
use crate::util::sysfs::DevSysfs;
use clap::{ArgGroup, Parser};
use log::{LevelFilter, info};
use nix::unistd::Uid;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(group(ArgGroup::new("action").required(true).args(["get", "set"])))]
struct Cli {
    /// Print the current frequency-scaling state
    #[clap(long)]
    get: bool,

    /// Apply new frequency-scaling values (requires root)
    #[clap(long)]
    set: bool,

    /// Maximum performance as a percentage of the hardware maximum
    #[clap(long, value_name = "PERCENT")]
    max: Option<u32>,

    /// Minimum performance as a percentage of the hardware maximum
    #[clap(long, value_name = "PERCENT")]
    min: Option<u32>,

    /// Turbo boost state
    #[clap(long, value_enum)]
    turbo: Option<TurboSetting>,

    /// Scaling governor to apply on every core
    #[clap(long, value_name = "NAME")]
    governor: Option<String>,

    /// Named power plan supplying max/min/turbo/governor at once
    #[clap(long, value_enum)]
    plan: Option<PowerPlan>,

    /// Skip the settle delay between the reset and the final write
    #[clap(long)]
    no_sleep: bool,

    /// Enable debug logging
    #[clap(long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors map to exit code 1; --help and --version exit 0.
            if e.use_stderr() {
                let _ = e.print();
                std::process::exit(1);
            }
            e.exit();
        }
    };

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        if matches!(
            e,
            ControlError::PermissionDenied(_) | ControlError::Privilege(_)
        ) {
            eprintln!("Hint: this operation requires administrator privileges (e.g. run with sudo).");
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), ControlError> {
    let sysfs = DevSysfs;
    let topology = CpuTopology::discover(&sysfs)?;

    let request = Request {
        action: if cli.set { Action::Set } else { Action::Get },
        max_percent: cli.max,
        min_percent: cli.min,
        turbo: cli.turbo.map(TurboSetting::enabled),
        governor: cli.governor.clone(),
        plan: cli.plan,
        no_sleep: cli.no_sleep,
    };

    match request.action {
        Action::Get => {
            let snapshot = monitor::read_snapshot(&sysfs, &topology)?;
            print_snapshot(&topology, &snapshot);
        }
        Action::Set => {
            let snapshot = monitor::read_snapshot(&sysfs, &topology)?;
            let resolver = PowerPlanResolver::new(&sysfs, topology.has_performance_state_driver);
            let plan_target = request.plan.map(|plan| resolver.resolve(plan)).transpose()?;
            let target = engine::resolve_target(&request, plan_target.as_ref(), &snapshot);

            info!(
                "applying: max {}%, min {}%, turbo {}, governor {}",
                target.max_percent, target.min_percent, target.turbo_enabled, target.governor
            );
            let apply_engine = ApplyEngine::new(&sysfs, &topology, Uid::effective().is_root());
            let outcome = apply_engine.apply(&target, request.no_sleep)?;
            if outcome.failed_writes > 0 {
                eprintln!(
                    "Warning: {} write(s) were rejected by the kernel; state may be partially applied.",
                    outcome.failed_writes
                );
            }

            // Show whatever final state can be read back.
            let snapshot = monitor::read_snapshot(&sysfs, &topology)?;
            print_snapshot(&topology, &snapshot);
        }
    }

    Ok(())
}

fn print_snapshot(topology: &CpuTopology, snapshot: &CpuSnapshot) {
    println!("--- CPU Frequency Scaling ---");
    println!("Driver: {}", topology.driver_name);
    println!("Cores: {}", topology.core_count);
    println!(
        "Hardware range: {} - {} MHz",
        topology.info_min_frequency_khz / 1000,
        topology.info_max_frequency_khz / 1000
    );
    println!(
        "Governor: {}",
        snapshot.governor.as_deref().unwrap_or("N/A")
    );
    println!(
        "Min: {}% ({} MHz)",
        snapshot.min_percent,
        snapshot.min_khz / 1000
    );
    println!(
        "Max: {}% ({} MHz)",
        snapshot.max_percent,
        snapshot.max_khz / 1000
    );
    println!(
        "Turbo: {}",
        match snapshot.turbo_enabled {
            Some(true) => "enabled",
            Some(false) => "disabled",
            None => "N/A",
        }
    );

    if !snapshot.per_core_mhz.is_empty() {
        println!("\n--- Realtime Core Frequencies ---");
        for (core_id, mhz) in snapshot.per_core_mhz.iter().enumerate() {
            println!("  Core {core_id}: {mhz:.3} MHz");
        }
    }
}
