//! Pipeline orchestration: the four stages run in order, each consuming the
//! previous stage's table. Tables travel as explicit values — no stage reads
//! ahead, loops back, or shares mutable state.

use crate::cleaner::DataCleaner;
use crate::config::PrepConfig;
use crate::error::Result;
use crate::geojoin::GeoJoiner;
use crate::ingest;
use crate::outliers::OutlierFilter;
use crate::utils::write_csv_snapshot;
use polars::prelude::*;
use std::time::{Duration, Instant};
use tracing::info;

/// All four stage outputs plus the run timing.
pub struct PipelineResult {
    /// Raw listings as ingested (also persisted as the cache).
    pub raw: DataFrame,
    /// Listings with administrative and density columns attached.
    pub joined: DataFrame,
    /// Post-normalization table.
    pub cleaned: DataFrame,
    /// Modeling-ready table after per-group outlier removal.
    pub model: DataFrame,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

impl PipelineResult {
    /// Row counts per stage, in pipeline order.
    pub fn stage_rows(&self) -> [(&'static str, usize); 4] {
        [
            ("raw", self.raw.height()),
            ("joined", self.joined.height()),
            ("cleaned", self.cleaned.height()),
            ("model", self.model.height()),
        ]
    }
}

/// The batch data-preparation pipeline.
pub struct DataPrep {
    config: PrepConfig,
}

impl DataPrep {
    pub fn new(config: PrepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Execute ingest -> geo-join -> clean -> outlier filter.
    ///
    /// Each stage fully materializes its output before the next begins; a
    /// CSV snapshot of every intermediate table lands in the output
    /// directory unless snapshots are disabled.
    pub fn run(&self) -> Result<PipelineResult> {
        let started = Instant::now();
        info!("Data preparation started");

        let raw = ingest::fetch_listings(&self.config)?;

        let joiner = GeoJoiner::load(&self.config)?;
        let joined = joiner.join(raw.clone())?;
        self.snapshot(&joined, "join_data.csv")?;

        let cleaned = DataCleaner.clean(joined.clone(), &self.config)?;
        self.snapshot(&cleaned, "clean_data.csv")?;

        let model = OutlierFilter::from_config(&self.config).filter(cleaned.clone())?;
        self.snapshot(&model, "model_data.csv")?;

        let elapsed = started.elapsed();
        info!(
            "Data preparation completed in {:.2}s ({} raw -> {} model rows)",
            elapsed.as_secs_f64(),
            raw.height(),
            model.height()
        );

        Ok(PipelineResult {
            raw,
            joined,
            cleaned,
            model,
            elapsed,
        })
    }

    fn snapshot(&self, df: &DataFrame, name: &str) -> Result<()> {
        if !self.config.save_outputs {
            return Ok(());
        }
        write_csv_snapshot(df, &self.config.output_dir.join(name))
    }
}
