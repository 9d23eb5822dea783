pub mod config;
pub mod driver;
pub mod logging;
pub mod process;

pub use config::PipelineConfig;
pub use driver::{process_and_save, run, RunSummary, TickerOutcome};
pub use logging::LogHandle;
pub use process::{preprocess, CleanedTable, FailureKind, PreprocessError};
