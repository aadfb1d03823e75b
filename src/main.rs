//! Command-line entry point for the excess-mortality analysis.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use excess_mortality::utils::logging::console::{print_dataset_summary, print_section};
use excess_mortality::{
    AnalysisConfig, MortalityAnalysis, SurveyDataset, SyntheticConfig, generate_synthetic_dataset,
};
use log::info;

#[derive(Parser)]
#[command(name = "excess-mortality")]
#[command(version)]
#[command(about = "Estimate post-disaster excess mortality from a household survey")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis on a data directory
    Analyze {
        /// Directory with one parquet file or folder per table
        #[arg(short, long, env = "MORTALITY_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the sensitivity report as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Hide the loading progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a synthetic dataset to a directory
    Synthesize {
        /// Output directory
        #[arg(short, long, default_value = "data")]
        out: PathBuf,

        /// Number of sampled households
        #[arg(long, default_value = "3300")]
        households: usize,

        /// Random seed for reproducibility
        #[arg(long, default_value = "2017")]
        seed: u64,
    },
}

fn analyze(
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    csv: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    info!("{config}");

    let start = Instant::now();
    let dataset = SurveyDataset::load(&config.data_dir, !quiet)
        .with_context(|| format!("Failed to load tables from {}", config.data_dir.display()))?;
    print_dataset_summary(&dataset);

    let analysis = MortalityAnalysis::new(config);
    let results = analysis.run(&dataset).context("Analysis failed")?;
    print_section("Mortality estimates", &results.to_string());

    if let Some(path) = csv {
        results
            .report
            .write_to_csv(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    info!("Done in {:?}", start.elapsed());
    Ok(())
}

fn synthesize(out: PathBuf, households: usize, seed: u64) -> Result<()> {
    let config = SyntheticConfig {
        households,
        seed,
        ..SyntheticConfig::default()
    };
    let dataset = generate_synthetic_dataset(&config).context("Failed to generate dataset")?;
    std::fs::create_dir_all(&out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    dataset
        .write(&out)
        .with_context(|| format!("Failed to write dataset to {}", out.display()))?;
    info!("Synthetic dataset written to {}", out.display());
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Analyze {
            data_dir,
            config,
            csv,
            quiet,
        } => analyze(data_dir, config, csv, quiet),
        Commands::Synthesize {
            out,
            households,
            seed,
        } => synthesize(out, households, seed),
    }
}
