use crate::process::date_parser;
use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Date32Array, Date32Builder, Int32Array, StringArray},
    compute::{filter_record_batch, is_not_null},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

pub const DATE_COLUMN: &str = "Date";
pub const YEAR_COLUMN: &str = "Year";
pub const MONTH_COLUMN: &str = "Month";
pub const DAY_COLUMN: &str = "Day";

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn days_since_epoch(d: NaiveDate) -> i32 {
    d.signed_duration_since(unix_epoch()).num_days() as i32
}

/// Parse a string column into dates; cells that do not parse become null.
pub fn coerce_dates(arr: &StringArray) -> Date32Array {
    let mut b = Date32Builder::with_capacity(arr.len());
    for opt in arr.iter() {
        b.append_option(opt.and_then(date_parser::parse_date).map(days_since_epoch));
    }
    b.finish()
}

/// Replace the string `Date` column with parsed dates. Column position is unchanged.
pub fn convert_date_column(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let (idx, _) = schema
        .column_with_name(DATE_COLUMN)
        .ok_or_else(|| anyhow!("missing {} column", DATE_COLUMN))?;
    let sarr = batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("{} column is not a string column", DATE_COLUMN))?;

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[idx] = Field::new(DATE_COLUMN, DataType::Date32, true);
    let mut cols: Vec<ArrayRef> = batch.columns().to_vec();
    cols[idx] = Arc::new(coerce_dates(sarr));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).context("rebuilding batch with dates")
}

/// Keep only rows whose `Date` is present. Returns the filtered batch and the number dropped.
pub fn drop_missing_dates(batch: &RecordBatch) -> Result<(RecordBatch, usize)> {
    let dates = batch
        .column_by_name(DATE_COLUMN)
        .ok_or_else(|| anyhow!("missing {} column", DATE_COLUMN))?;
    let dropped = dates.null_count();
    if dropped == 0 {
        return Ok((batch.clone(), 0));
    }
    let keep = is_not_null(dates.as_ref())?;
    let filtered = filter_record_batch(batch, &keep).context("dropping rows without a date")?;
    Ok((filtered, dropped))
}

/// Move `Date` to the front as the non-null row key and add `Year`, `Month`, `Day`.
///
/// A calendar column already present in the input is overwritten in place;
/// missing ones are appended. Row order is left as read; duplicate dates are kept.
pub fn index_by_date(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let (idx, _) = schema
        .column_with_name(DATE_COLUMN)
        .ok_or_else(|| anyhow!("missing {} column", DATE_COLUMN))?;
    let dates = batch
        .column(idx)
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| anyhow!("{} column has not been converted to dates", DATE_COLUMN))?;
    if dates.null_count() > 0 {
        return Err(anyhow!("{} column still has missing values", DATE_COLUMN));
    }

    let (years, months, days) = calendar_parts(dates)?;
    let mut derived: Vec<(&str, Option<ArrayRef>)> = vec![
        (YEAR_COLUMN, Some(Arc::new(years) as ArrayRef)),
        (MONTH_COLUMN, Some(Arc::new(months) as ArrayRef)),
        (DAY_COLUMN, Some(Arc::new(days) as ArrayRef)),
    ];

    let mut fields = Vec::with_capacity(batch.num_columns() + 3);
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns() + 3);

    fields.push(Field::new(DATE_COLUMN, DataType::Date32, false));
    cols.push(batch.column(idx).clone());

    for (i, field) in schema.fields().iter().enumerate() {
        if i == idx {
            continue;
        }
        match derived.iter_mut().find(|(name, _)| *name == field.name().as_str()) {
            // a repeated calendar header has nothing left to take; drop it
            Some((name, slot)) => {
                if let Some(arr) = slot.take() {
                    fields.push(Field::new(*name, DataType::Int32, false));
                    cols.push(arr);
                }
            }
            None => {
                fields.push(field.as_ref().clone());
                cols.push(batch.column(i).clone());
            }
        }
    }

    for (name, slot) in derived {
        if let Some(arr) = slot {
            fields.push(Field::new(name, DataType::Int32, false));
            cols.push(arr);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols)
        .context("building date-indexed batch")
}

/// Proleptic Gregorian year, 1-based month and 1-based day for every date.
fn calendar_parts(dates: &Date32Array) -> Result<(Int32Array, Int32Array, Int32Array)> {
    let mut years = Vec::with_capacity(dates.len());
    let mut months = Vec::with_capacity(dates.len());
    let mut days = Vec::with_capacity(dates.len());
    for i in 0..dates.len() {
        let d = dates
            .value_as_date(i)
            .ok_or_else(|| anyhow!("date at row {} is out of range", i))?;
        years.push(d.year());
        months.push(d.month() as i32);
        days.push(d.day() as i32);
    }
    Ok((
        Int32Array::from(years),
        Int32Array::from(months),
        Int32Array::from(days),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_batch(columns: Vec<(&str, Vec<Option<&str>>)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(n, _)| Field::new(*n, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .into_iter()
            .map(|(_, v)| Arc::new(StringArray::from(v)) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn int_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Int32Array {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap()
    }

    #[test]
    fn coerces_unparseable_dates_to_null() {
        let arr = StringArray::from(vec![Some("2024-03-01"), Some("bogus"), None]);
        let dates = coerce_dates(&arr);
        assert_eq!(dates.value_as_date(0), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(dates.is_null(1));
        assert!(dates.is_null(2));
    }

    #[test]
    fn epoch_is_day_zero() {
        assert_eq!(days_since_epoch(unix_epoch()), 0);
        assert_eq!(
            days_since_epoch(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()),
            -1
        );
    }

    #[test]
    fn drops_rows_with_bad_dates_and_moves_date_first() -> Result<()> {
        let batch = string_batch(vec![
            ("Close", vec![Some("1.0"), Some("2.0"), Some("3.0")]),
            ("Date", vec![Some("2023-12-29"), Some("garbage"), Some("2024-01-02")]),
        ]);

        let converted = convert_date_column(&batch)?;
        let (kept, dropped) = drop_missing_dates(&converted)?;
        assert_eq!(dropped, 1);
        assert_eq!(kept.num_rows(), 2);

        let indexed = index_by_date(&kept)?;
        let names: Vec<_> = indexed
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["Date", "Close", "Year", "Month", "Day"]);

        assert_eq!(int_col(&indexed, YEAR_COLUMN).values().to_vec(), vec![2023, 2024]);
        assert_eq!(int_col(&indexed, MONTH_COLUMN).values().to_vec(), vec![12, 1]);
        assert_eq!(int_col(&indexed, DAY_COLUMN).values().to_vec(), vec![29, 2]);
        Ok(())
    }

    #[test]
    fn keeps_row_order_and_duplicate_dates() -> Result<()> {
        let batch = string_batch(vec![
            ("Date", vec![Some("2024-02-01"), Some("2024-01-01"), Some("2024-02-01")]),
            ("Close", vec![Some("a"), Some("b"), Some("c")]),
        ]);
        let converted = convert_date_column(&batch)?;
        let (kept, _) = drop_missing_dates(&converted)?;
        let indexed = index_by_date(&kept)?;

        assert_eq!(indexed.num_rows(), 3);
        assert_eq!(int_col(&indexed, MONTH_COLUMN).values().to_vec(), vec![2, 1, 2]);
        Ok(())
    }

    #[test]
    fn existing_calendar_columns_are_overwritten_in_place() -> Result<()> {
        let batch = string_batch(vec![
            ("Date", vec![Some("2024-01-02"), Some("2024-03-15")]),
            ("Month", vec![Some("stale"), Some("stale")]),
            ("Close", vec![Some("1.0"), Some("2.0")]),
            ("Year", vec![Some("1999"), Some("1999")]),
        ]);
        let converted = convert_date_column(&batch)?;
        let indexed = index_by_date(&converted)?;

        let names: Vec<_> = indexed
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["Date", "Month", "Close", "Year", "Day"]);
        assert_eq!(int_col(&indexed, YEAR_COLUMN).values().to_vec(), vec![2024, 2024]);
        assert_eq!(int_col(&indexed, MONTH_COLUMN).values().to_vec(), vec![1, 3]);
        assert_eq!(int_col(&indexed, DAY_COLUMN).values().to_vec(), vec![2, 15]);
        Ok(())
    }

    #[test]
    fn convert_requires_date_column() {
        let batch = string_batch(vec![("Close", vec![Some("1.0")])]);
        assert!(convert_date_column(&batch).is_err());
    }
}
