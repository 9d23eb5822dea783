use std::path::{Path, PathBuf};

use crate::process::utils::clean_file_name;

/// Instruments processed when no tickers are given.
pub const DEFAULT_TICKERS: [&str; 13] = [
    "AAPL", "MSFT", "GOOGL", "BRK-B", "TSLA", "CVX", "NKE", "NVDA", "AMD", "ADBE", "QCOM", "META",
    "AMZN",
];

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_PROCESSED_DIR: &str = "data/processed";
pub const DEFAULT_LOG_FILE: &str = "data_preprocessing.log";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding `<TICKER>.csv` inputs.
    pub raw_dir: PathBuf,
    /// Directory receiving `<TICKER>_clean.csv` outputs.
    pub processed_dir: PathBuf,
    /// Append-mode log file.
    pub log_file: PathBuf,
    /// Worker pool size.
    pub workers: usize,
    pub tickers: Vec<String>,
    /// Exit non-zero when any ticker fails.
    pub strict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            workers: num_cpus::get(),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            strict: false,
        }
    }
}

impl PipelineConfig {
    /// Same layout rooted at `base` (`base/data/raw`, `base/data/processed`, `base/data_preprocessing.log`).
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            raw_dir: base.join(DEFAULT_RAW_DIR),
            processed_dir: base.join(DEFAULT_PROCESSED_DIR),
            log_file: base.join(DEFAULT_LOG_FILE),
            ..Self::default()
        }
    }

    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn input_path(&self, ticker: &str) -> PathBuf {
        self.raw_dir.join(format!("{}.csv", ticker))
    }

    pub fn output_path(&self, ticker: &str) -> PathBuf {
        self.processed_dir.join(clean_file_name(ticker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.tickers.len(), 13);
        assert_eq!(cfg.tickers[3], "BRK-B");
        assert!(cfg.workers >= 1);
        assert!(!cfg.strict);
        assert_eq!(cfg.input_path("AAPL"), PathBuf::from("data/raw/AAPL.csv"));
        assert_eq!(
            cfg.output_path("BRK-B"),
            PathBuf::from("data/processed/BRK-B_clean.csv")
        );
    }

    #[test]
    fn rooted_layout_and_overrides() {
        let cfg = PipelineConfig::rooted_at(Path::new("/tmp/run"))
            .with_tickers(["AAPL", "MSFT"])
            .with_workers(0);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(
            cfg.input_path("MSFT"),
            PathBuf::from("/tmp/run/data/raw/MSFT.csv")
        );
        assert_eq!(cfg.log_file, PathBuf::from("/tmp/run/data_preprocessing.log"));
    }
}
