//! Subcommand implementations for `gait-batch`

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use gait_processing::{
    BatchReport, ConfigProfile, CsvSink, Orchestrator, PhaseConfig, UnitStatus, WriteMode,
};
use gait_simulation::{simulate_batch, NoiseConfig, TrialSimulatorConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a batch of walking trials and phase-normalize it
    Run(RunArgs),
    /// Print or export a configuration preset as JSON
    Config(ConfigArgs),
}

/// Configuration presets selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Profile {
    Standard,
    StrictCleaning,
    Exploratory,
    BodyWeight,
}

impl From<Profile> for ConfigProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Standard => ConfigProfile::Standard,
            Profile::StrictCleaning => ConfigProfile::StrictCleaning,
            Profile::Exploratory => ConfigProfile::Exploratory,
            Profile::BodyWeight => ConfigProfile::BodyWeightNormalized,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of simulated subjects
    #[arg(long, default_value_t = 3)]
    pub subjects: usize,

    /// Gait cycles per trial
    #[arg(long, default_value_t = 5)]
    pub cycles: usize,

    /// 1-based subject whose force plate reads zero
    #[arg(long)]
    pub corrupt_subject: Option<usize>,

    /// JSON configuration file; overrides --profile
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Preset used when no configuration file is given
    #[arg(long, value_enum, default_value = "standard")]
    pub profile: Profile,

    /// CSV file for the phase-indexed output
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Append to an existing output file instead of replacing it
    #[arg(long)]
    pub append: bool,

    /// Process trials on the blocking thread pool
    #[arg(long)]
    pub concurrent: bool,

    /// Gaussian joint-angle noise in radians
    #[arg(long, default_value_t = 0.0)]
    pub angle_noise: f64,

    /// Print batch metrics as JSON after the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[arg(long, value_enum, default_value = "standard")]
    pub profile: Profile,

    /// Write the JSON to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn load_config(args: &RunArgs) -> anyhow::Result<PhaseConfig> {
    let mut config = match &args.config {
        Some(path) => PhaseConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PhaseConfig::for_profile(args.profile.into()),
    };
    if args.append {
        config.write_mode = WriteMode::Append;
    }
    Ok(config)
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let simulation = TrialSimulatorConfig {
        cycles: args.cycles,
        noise: NoiseConfig {
            angle_std: args.angle_noise,
            grf_std: 0.0,
        },
        ..TrialSimulatorConfig::default()
    };
    let trials = simulate_batch(&simulation, args.subjects, args.corrupt_subject)
        .context("Failed to simulate trials")?;
    info!(trials = trials.len(), cycles = args.cycles, "Simulated batch");

    let mut builder = Orchestrator::builder().config(config).retain_output(false);
    if let Some(path) = &args.output {
        builder = builder.sink(Box::new(CsvSink::new(path)));
    }
    let mut orchestrator = builder.build().context("Invalid configuration")?;

    let report = if args.concurrent {
        orchestrator.run_concurrent(trials).await
    } else {
        orchestrator.run(trials.into_iter().map(Ok))
    };

    print_report(&report);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.metrics)?);
    }
    if let Some(path) = &args.output {
        println!("Phase-indexed output: {}", path.display());
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("{}", report.summary());

    for unit in &report.units {
        let status = match &unit.status {
            UnitStatus::Processed { cycles } => format!("{} cycles", cycles),
            UnitStatus::Skipped(reason) => format!("skipped ({})", reason),
            UnitStatus::Failed(error) => format!("failed ({})", error),
        };
        println!("  {}/{}/{}: {}", unit.subject, unit.task, unit.leg, status);
    }

    for failure in &report.failures {
        println!("  {}/{}: trial failed ({})", failure.subject, failure.task, failure.reason);
    }

    let skipped = report.skipped_subjects();
    if !skipped.is_empty() {
        println!("Skipped subjects: {}", skipped.join(", "));
    }
}

pub fn config(args: ConfigArgs) -> anyhow::Result<()> {
    let json = PhaseConfig::for_profile(args.profile.into()).to_json()?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
