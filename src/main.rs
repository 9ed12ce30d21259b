//! CLI entry point for the data-preparation pipeline.

use anyhow::{anyhow, Result};
use clap::Parser;
use dotenv::dotenv;
use immo_prep::{DataPrep, PipelineResult, PrepConfig, UnmappedCategory};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Batch data preparation for real-estate listings",
    long_about = "Ingests scraped property listings, enriches them with municipality and\n\
                  population-density reference data, cleans and normalizes every field,\n\
                  and removes per-group price outliers to produce a modeling-ready table.\n\n\
                  EXAMPLES:\n  \
                  # Re-run on the cached snapshot\n  \
                  immo-prep\n\n  \
                  # Fetch a fresh copy of the listings first\n  \
                  immo-prep --refresh\n\n  \
                  # Fail on categorical values without an ordinal mapping\n  \
                  immo-prep --strict-categories"
)]
struct Args {
    /// Fetch the remote dataset and refresh the local cache before running
    #[arg(long)]
    refresh: bool,

    /// Directory holding the cached listings and the reference files
    #[arg(long, default_value = "./data/external_data")]
    data_dir: String,

    /// Directory receiving the per-stage CSV snapshots
    #[arg(short, long, default_value = "./data")]
    output_dir: String,

    /// Override the remote listings URL
    #[arg(long)]
    source_url: Option<String>,

    /// Municipality boundary file (GeoJSON); defaults to
    /// <data-dir>/REFNIS_CODES.geojson
    #[arg(long)]
    municipalities: Option<String>,

    /// Population density workbook; defaults to <data-dir>/PopDensity.xlsx
    #[arg(long)]
    density: Option<String>,

    /// Fail the run when a categorical value has no ordinal mapping
    /// (default: encode it as null)
    #[arg(long)]
    strict_categories: bool,

    /// Skip writing the per-stage CSV snapshots
    #[arg(long)]
    no_save: bool,

    /// IQR multiplier for the outlier bounds
    #[arg(long, default_value = "1.5")]
    iqr_multiplier: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    let mut builder = PrepConfig::builder()
        .data_dir(&args.data_dir)
        .output_dir(&args.output_dir)
        .refresh(args.refresh)
        .save_outputs(!args.no_save)
        .iqr_multiplier(args.iqr_multiplier);

    if let Some(ref url) = args.source_url {
        builder = builder.source_url(url);
    }
    if let Some(ref path) = args.municipalities {
        builder = builder.municipality_file(path);
    }
    if let Some(ref path) = args.density {
        builder = builder.density_file(path);
    }
    if args.strict_categories {
        builder = builder.unmapped_categories(UnmappedCategory::Fail);
    }

    let config = builder.build()?;

    info!("{}", "=".repeat(80));
    info!("Starting data preparation...");
    info!("{}", "=".repeat(80));

    let result = DataPrep::new(config)
        .run()
        .map_err(|e| anyhow!("data preparation failed: {e}"))?;

    print_summary(&result, &args);
    Ok(())
}

/// Print a human-readable run summary.
///
/// Uses `println!` intentionally: this is the primary output of the run and
/// should be visible regardless of log level.
fn print_summary(result: &PipelineResult, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!("DATA PREPARATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Stages:");
    for (stage, rows) in result.stage_rows() {
        println!("  {stage:<8} {rows} rows");
    }
    println!();

    println!("Duration: {:.2}s", result.elapsed.as_secs_f64());
    println!();

    if args.no_save {
        println!("Snapshots: skipped (--no-save)");
    } else {
        println!("Snapshots:");
        println!("  {}/raw_data.csv (cache)", args.data_dir);
        for name in ["join_data.csv", "clean_data.csv", "model_data.csv"] {
            println!("  {}/{name}", args.output_dir);
        }
    }
    println!("{}", "=".repeat(80));
}
