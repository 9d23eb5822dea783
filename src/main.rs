use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use ticker_prep::{config, driver, LogHandle, PipelineConfig};
use tracing::warn;

#[derive(Parser)]
#[command(name = "ticker-prep")]
#[command(about = "Clean per-ticker daily CSVs: forward-fill gaps, parse dates, add Year/Month/Day")]
struct Args {
    /// Tickers to process (default: the built-in list)
    tickers: Vec<String>,

    /// Directory holding <TICKER>.csv inputs
    #[arg(long, default_value = config::DEFAULT_RAW_DIR)]
    raw_dir: PathBuf,

    /// Directory receiving <TICKER>_clean.csv outputs
    #[arg(long, default_value = config::DEFAULT_PROCESSED_DIR)]
    processed_dir: PathBuf,

    /// Append-mode log file
    #[arg(long, default_value = config::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Worker threads (default: number of CPUs)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    workers: Option<u16>,

    /// Exit with status 1 if any ticker failed
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig {
            raw_dir: self.raw_dir,
            processed_dir: self.processed_dir,
            log_file: self.log_file,
            strict: self.strict,
            ..PipelineConfig::default()
        };
        if !self.tickers.is_empty() {
            cfg = cfg.with_tickers(self.tickers);
        }
        if let Some(n) = self.workers {
            cfg = cfg.with_workers(n as usize);
        }
        cfg
    }
}

fn main() -> Result<()> {
    let cfg = Args::parse().into_config();
    let log = LogHandle::open(&cfg.log_file)?;

    let summary = driver::run(&cfg, &log)?;

    if cfg.strict && summary.has_failures() {
        log.scope(|| {
            for (ticker, kind) in summary.failed() {
                warn!(ticker, %kind, "ticker failed");
            }
        });
        drop(log);
        std::process::exit(1);
    }
    Ok(())
}
