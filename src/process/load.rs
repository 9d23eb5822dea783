use anyhow::{anyhow, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs, io::Cursor, path::Path, sync::Arc};
use tracing::{debug, instrument};

const BATCH_SIZE: usize = 8192;

/// Cells matching this are read as missing.
static NA_VALUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:|NA|N/A|n/a|NaN|nan|-NaN|-nan|null|NULL|None|<NA>|#N/A|#NA|#N/A N/A|1\.#IND|-1\.#IND|1\.#QNAN|-1\.#QNAN)$",
    )
    .expect("NA pattern is valid")
});

/// Read a header-first CSV into one batch where every column is nullable Utf8.
///
/// Missing cells (empty or an NA token) become nulls; rows shorter than the
/// header are padded with nulls, rows longer than the header are an error.
#[instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub fn load_csv(path: &Path) -> Result<RecordBatch> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    std::str::from_utf8(&bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

    let schema = string_schema(&bytes)?;
    if schema.fields().is_empty() {
        return Err(anyhow!("no columns to parse from {}", path.display()));
    }

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_quote(b'"')
        .with_delimiter(b',')
        .with_truncated_rows(true)
        .with_null_regex(NA_VALUES.clone())
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(&bytes))
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {}", path.display()))?;
    let batch = concat_batches(&schema, &batches).context("concatenating CSV batches")?;

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "loaded csv"
    );
    Ok(batch)
}

/// Header names from the first line, every field typed as nullable Utf8.
fn string_schema(bytes: &[u8]) -> Result<SchemaRef> {
    let (inferred, _) = Format::default()
        .with_header(true)
        .with_quote(b'"')
        .with_delimiter(b',')
        .infer_schema(Cursor::new(bytes), Some(0))
        .context("reading CSV header")?;

    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name().trim_start_matches('\u{feff}').trim(), DataType::Utf8, true))
        .collect();
    Ok(Arc::new(Schema::new(fields)))
}
