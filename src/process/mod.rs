// src/process/mod.rs
pub mod date_parser;
pub mod error;
pub mod features;
pub mod fill;
pub mod load;
pub mod utils;
pub mod write;

use anyhow::Context;
use arrow::{
    array::{Array, Date32Array, Int32Array},
    record_batch::RecordBatch,
};
use std::path::Path;
use tracing::{debug, error, info};

pub use error::{FailureKind, PreprocessError};
use features::{DATE_COLUMN, DAY_COLUMN, MONTH_COLUMN, YEAR_COLUMN};

/// A date-keyed table: `Date` first, the input columns, then `Year`, `Month`, `Day`.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    batch: RecordBatch,
    /// Rows removed because their `Date` did not parse.
    pub dropped_rows: usize,
}

impl CleanedTable {
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn dates(&self) -> &Date32Array {
        self.batch
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .expect("first column of a cleaned table is Date32")
    }

    pub fn years(&self) -> &Int32Array {
        self.int_column(YEAR_COLUMN)
    }

    pub fn months(&self) -> &Int32Array {
        self.int_column(MONTH_COLUMN)
    }

    pub fn days(&self) -> &Int32Array {
        self.int_column(DAY_COLUMN)
    }

    fn int_column(&self, name: &str) -> &Int32Array {
        self.batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .expect("calendar columns of a cleaned table are Int32")
    }

    /// Serialize to `output_path`, returning bytes written.
    pub fn save(&self, output_path: &Path) -> Result<u64, PreprocessError> {
        write::write_csv(&self.batch, output_path).map_err(|source| PreprocessError::Write {
            path: output_path.to_path_buf(),
            source,
        })
    }
}

/// Load, forward-fill, date-convert and calendar-annotate one input file.
///
/// Every failure is logged here once and handed back as a typed error; the
/// caller only decides whether to write output.
pub fn preprocess(path: &Path) -> Result<CleanedTable, PreprocessError> {
    let result = try_preprocess(path);
    if let Err(e) = &result {
        error!("Error processing {}: {}", path.display(), e);
    }
    result
}

fn try_preprocess(path: &Path) -> Result<CleanedTable, PreprocessError> {
    let transform_err = |source: anyhow::Error| PreprocessError::Transform {
        path: path.to_path_buf(),
        source,
    };

    // 1) load
    let raw = load::load_csv(path).map_err(|source| PreprocessError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Successfully loaded {}", path.display());

    // 2) forward-fill gaps, Date included
    let mut table = raw;
    let missing = fill::missing_cells(&table);
    if missing > 0 {
        info!("Handling missing values for {}", path.display());
        debug!(missing, "forward-filling");
        table = fill::apply_forward_fill(&table).map_err(transform_err)?;
    }

    // 3) parse dates
    if table.schema().column_with_name(DATE_COLUMN).is_none() {
        return Err(PreprocessError::MissingDateColumn {
            path: path.to_path_buf(),
        });
    }
    let table = features::convert_date_column(&table)
        .context("converting Date column")
        .map_err(transform_err)?;
    info!("Converted Date column to datetime for {}", path.display());

    // 4) drop unparseable dates
    let (table, dropped_rows) = features::drop_missing_dates(&table).map_err(transform_err)?;
    if dropped_rows > 0 {
        debug!(dropped_rows, "dropped rows without a valid date");
    }

    // 5-6) key by Date, derive Year/Month/Day
    let batch = features::index_by_date(&table).map_err(transform_err)?;

    info!("Completed preprocessing for {}", path.display());
    Ok(CleanedTable {
        batch,
        dropped_rows,
    })
}
