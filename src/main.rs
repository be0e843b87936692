mod config;
mod input;
mod logging;
mod model;
mod pipeline;
mod raters;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::config::{ConfigError, RatingConfig};
use crate::input::InputError;
use crate::input::candidates::load_candidates;
use crate::model::ProducerRegistry;
use crate::pipeline::{Parallelism, RatingPipeline};
use crate::raters::{CatalogSource, RaterRegistry, RegistryError};
use crate::report::{RatingsReport, write_reports};

#[derive(Debug, Parser)]
#[command(name = "psr-ratings", version, about = "Rate pulsar candidates against known pulsars")]
struct Cli {
    /// Default log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rate every candidate with every selected rater.
    Rate(RateArgs),
    /// Print the built-in raters and their versions.
    ListRaters,
}

#[derive(Debug, Clone, Args)]
struct RateArgs {
    /// Known-pulsar catalog (NUM;NAME;RAJD;DECJD;P0;DM), optionally .gz.
    #[arg(long)]
    catalog: PathBuf,
    /// Candidate JSON document, optionally .gz.
    #[arg(long)]
    candidates: PathBuf,
    /// Output directory for ratings.json and report.txt.
    #[arg(long)]
    out: PathBuf,
    /// JSON file overriding survey constants.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Restrict to these raters (repeatable).
    #[arg(long = "rater", value_name = "SHORT_NAME")]
    raters: Vec<String>,
    #[arg(long)]
    beam_fwhm_arcmin: Option<f64>,
    #[arg(long)]
    band_low_mhz: Option<f64>,
    #[arg(long)]
    band_high_mhz: Option<f64>,
    /// Evaluate candidates and raters on the rayon thread pool.
    #[arg(long)]
    parallel: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to write reports: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    if let Err(err) = run(cli.command) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Rate(args) => run_rate(&args),
        Command::ListRaters => {
            let registry = RaterRegistry::builtin(
                &RatingConfig::default(),
                CatalogSource::Loaded(Arc::default()),
            );
            for name in registry.short_names() {
                let Some(rater) = registry.get(name) else {
                    continue;
                };
                let meta = rater.meta();
                println!(
                    "{}\tv{}\t{}\t{}",
                    meta.short_name, meta.version, meta.long_name, meta.description
                );
            }
            Ok(())
        }
    }
}

fn run_rate(args: &RateArgs) -> Result<(), AppError> {
    let config = resolve_config(args)?;

    let mut registry = RaterRegistry::builtin(&config, CatalogSource::Path(args.catalog.clone()));
    if !args.raters.is_empty() {
        registry = registry.select(args.raters.as_slice())?;
    }
    registry.validate(&ProducerRegistry::builtin())?;

    let candidates = load_candidates(&args.candidates)?;
    let pipeline = RatingPipeline::new(registry);
    let parallelism = if args.parallel {
        Parallelism::Parallel
    } else {
        Parallelism::Sequential
    };
    let table = pipeline.rate_all(&candidates, parallelism);

    let report = RatingsReport::new(&config, pipeline.statuses(), &table);
    write_reports(&report, &args.out)?;
    Ok(())
}

fn resolve_config(args: &RateArgs) -> Result<RatingConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => RatingConfig::from_json_file(path)?,
        None => RatingConfig::default(),
    };
    if let Some(v) = args.beam_fwhm_arcmin {
        config.beam_fwhm_arcmin = v;
    }
    if let Some(v) = args.band_low_mhz {
        config.band_low_mhz = v;
    }
    if let Some(v) = args.band_high_mhz {
        config.band_high_mhz = v;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
