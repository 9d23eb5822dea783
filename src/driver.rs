// src/driver.rs
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{fs, path::PathBuf, time::Instant};
use tracing::{debug, error, info, instrument};

use crate::{
    config::PipelineConfig,
    logging::LogHandle,
    process::{self, FailureKind, PreprocessError},
};

/// What happened to one ticker.
#[derive(Debug)]
pub struct TickerOutcome {
    pub ticker: String,
    pub result: Result<PathBuf, PreprocessError>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// One entry per ticker, in the configured order.
    pub outcomes: Vec<TickerOutcome>,
}

impl RunSummary {
    pub fn saved(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|p| (o.ticker.as_str(), p)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, FailureKind)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.ticker.as_str(), e.kind())))
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Preprocess one ticker and persist its cleaned table.
/// Nothing is written when preprocessing fails.
#[instrument(level = "debug", skip(config))]
pub fn process_and_save(ticker: &str, config: &PipelineConfig) -> Result<PathBuf, PreprocessError> {
    let input = config.input_path(ticker);
    let table = process::preprocess(&input)?;

    let output = config.output_path(ticker);
    match table.save(&output) {
        Ok(bytes) => {
            info!("Saved cleaned data for {} to {}", ticker, output.display());
            debug!(bytes, rows = table.num_rows(), "wrote cleaned csv");
            Ok(output)
        }
        Err(e) => {
            error!("Error saving {} to {}: {}", ticker, e.path().display(), e);
            Err(e)
        }
    }
}

/// Fan `process_and_save` out over a fixed-size pool and block until every ticker is done.
///
/// Per-ticker failures are collected in the summary; only setup failures
/// (output directory, thread pool) abort the run.
pub fn run(config: &PipelineConfig, log: &LogHandle) -> Result<RunSummary> {
    let start = Instant::now();

    fs::create_dir_all(&config.processed_dir).with_context(|| {
        format!(
            "creating processed directory {}",
            config.processed_dir.display()
        )
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .thread_name(|i| format!("prep-worker-{}", i))
        .build()
        .context("building worker pool")?;

    log.scope(|| {
        debug!(
            workers = pool.current_num_threads(),
            tickers = config.tickers.len(),
            "dispatching"
        )
    });

    let outcomes: Vec<TickerOutcome> = pool.install(|| {
        config
            .tickers
            .par_iter()
            .map(|ticker| TickerOutcome {
                ticker: ticker.clone(),
                result: log.scope(|| process_and_save(ticker, config)),
            })
            .collect()
    });
    let summary = RunSummary { outcomes };

    log.scope(|| {
        info!("Data preprocessing completed.");
        debug!(
            saved = summary.saved().count(),
            failed = summary.failed().count(),
            elapsed = ?start.elapsed(),
            "run summary"
        );
    });
    Ok(summary)
}
