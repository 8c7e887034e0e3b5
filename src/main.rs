//! Command-line entry point: load a scenario, run the dispatcher, report.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

use storage_dispatch::config::{ControllerKind, ScenarioConfig};
use storage_dispatch::io::export::export_csv;
use storage_dispatch::runner::run_scenario;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Load the scenario from a TOML file.
    #[arg(long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, flexible_demand, load_following).
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, help = "Override the scenario's random seed")]
    seed: Option<u64>,

    #[arg(long, help = "Override the scenario's controller")]
    controller: Option<ControllerKind>,

    /// Export per-period results to CSV.
    #[arg(long)]
    telemetry_out: Option<PathBuf>,

    /// Print one line per period before the KPI report.
    #[arg(long, default_value_t = false)]
    steps: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_scenario(args: &Args) -> Result<ScenarioConfig> {
    let mut scenario = if let Some(path) = &args.scenario {
        ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?
    } else if let Some(name) = &args.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(controller) = args.controller {
        scenario.simulation.controller = controller;
    }
    Ok(scenario)
}

fn run(args: Args) -> Result<()> {
    let scenario = load_scenario(&args)?;

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario has {} configuration error(s)", errors.len());
    }

    let out = run_scenario(&scenario).context("running scenario")?;

    if args.steps {
        for (t, r) in out.result.records().iter().enumerate() {
            println!("t={t:>5} | {r}");
        }
    }
    println!("{}", out.kpi);

    if let Some(path) = &args.telemetry_out {
        export_csv(&out.result, &out.commodity, path)
            .with_context(|| format!("writing CSV to {}", path.display()))?;
        info!(path = %path.display(), rows = out.result.len(), "telemetry written");
        eprintln!("Telemetry written to {}", path.display());
    }
    Ok(())
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
