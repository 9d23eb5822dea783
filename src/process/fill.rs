use anyhow::{anyhow, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Total number of missing cells across all columns.
pub fn missing_cells(batch: &RecordBatch) -> usize {
    batch.columns().iter().map(|c| c.null_count()).sum()
}

/// Replace each missing cell with the nearest preceding non-missing value of its column.
/// Leading gaps have nothing to inherit and stay missing.
pub fn forward_fill(arr: &StringArray) -> StringArray {
    let mut last: Option<&str> = None;
    arr.iter()
        .map(|cell| {
            if cell.is_some() {
                last = cell;
            }
            last
        })
        .collect()
}

/// Forward-fill every column of a string batch; columns without gaps are reused as-is.
pub fn apply_forward_fill(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for (i, field) in batch.schema().fields().iter().enumerate() {
        let arr = batch.column(i);
        if arr.null_count() == 0 {
            cols.push(arr.clone());
            continue;
        }
        let sarr = arr
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("column {} is not a string column", field.name()))?;
        cols.push(Arc::new(forward_fill(sarr)) as ArrayRef);
    }

    RecordBatch::try_new(batch.schema(), cols).map_err(Into::into)
}
