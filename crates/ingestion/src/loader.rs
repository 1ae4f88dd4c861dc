//! CSV loading into typed records.

use crate::source::InputSource;
use adl_core::config::SourceConfig;
use adl_core::{Column, Error, RawRecord, Result, Scalar};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

/// Read a headed CSV into records. Unknown columns are ignored.
pub fn load_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::csv(format!("failed to read header row: {e}")))?
        .clone();

    // Header position -> known column. First occurrence of a duplicated header wins.
    let mut mapping: Vec<(usize, Column)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if let Some(column) = Column::from_name(name.trim()) {
            if mapping.iter().all(|(_, c)| *c != column) {
                mapping.push((idx, column));
            }
        }
    }
    debug!(
        columns = headers.len(),
        known = mapping.len(),
        "mapped CSV header"
    );

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let string_record =
            result.map_err(|e| Error::csv(format!("row {row}: {e}")))?;
        let mut record = RawRecord::default();
        for &(idx, column) in &mapping {
            let value = string_record.get(idx).and_then(Scalar::parse);
            record.set(column, value);
        }
        records.push(record);
    }

    info!(count = records.len(), "Loaded ADL events");
    Ok(records)
}

/// Parse records from an in-memory payload.
pub fn load_records_from_bytes(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    load_records(bytes)
}

/// Resolve the configured source, read it fully and parse it.
pub fn load_from_config(config: &SourceConfig) -> Result<Vec<RawRecord>> {
    let source = InputSource::resolve(config)?;
    let bytes = source.read_bytes(Duration::from_secs(config.fetch_timeout_secs))?;
    load_records_from_bytes(&bytes)
}
