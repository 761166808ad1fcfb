// 📄 Flat-file sink - EnrichedBankRows ⇄ CSV
// Full overwrite on every write; header line included, no index column.

use crate::db::{EnrichedBankRow, COLUMNS};
use crate::error::{EtlError, EtlResult};
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn write_csv(rows: &[EnrichedBankRow], path: &Path) -> EtlResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EtlError::sink_write("csv", e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| EtlError::sink_write("csv", e))?;

    // serialize() only emits the header alongside the first record
    if rows.is_empty() {
        writer
            .write_record(COLUMNS.iter().map(|(name, _)| *name))
            .map_err(|e| EtlError::sink_write("csv", e))?;
    }

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| EtlError::sink_write("csv", e))?;
    }

    writer.flush().map_err(|e| EtlError::sink_write("csv", e))?;

    info!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

/// Read a file produced by `write_csv`
pub fn read_csv(path: &Path) -> anyhow::Result<Vec<EnrichedBankRow>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: EnrichedBankRow = result.context("Failed to deserialize bank row")?;
        rows.push(row);
    }

    Ok(rows)
}
