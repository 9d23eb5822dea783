use anyhow::{Context, Result};
use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Write `batch` as a header-first CSV at `output_path`.
///
/// The file is staged next to its destination and renamed into place, so a
/// failed write never leaves a partial file behind. Returns bytes written.
pub fn write_csv(batch: &RecordBatch, output_path: &Path) -> Result<u64> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    {
        let mut buf = BufWriter::new(tmp.as_file());
        {
            let mut writer = WriterBuilder::new().with_header(true).build(&mut buf);
            writer.write(batch).context("writing batch to csv")?;
        }
        buf.flush().context("flushing csv")?;
    }

    tmp.persist(output_path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming into {}", output_path.display()))?;

    let metadata = fs::metadata(output_path).context("getting file metadata")?;
    Ok(metadata.len())
}
