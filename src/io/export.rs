//! Write scoring results and generated datasets.
//!
//! JSON goes to a file or stdout (logs go to stderr, so stdout stays parseable).
//! CSV export is used for synthetic datasets and keeps a fixed column order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::domain::RawRecord;
use crate::error::AppError;

/// Pretty-print `value` as JSON to `path`, or to stdout when `path` is `None`.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<(), AppError> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .map_err(|e| AppError::new(2, format!("Failed to create output '{}': {e}", p.display())))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, value)
                .map_err(|e| AppError::new(4, format!("Failed to write JSON output: {e}")))?;
            w.flush()
                .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", p.display())))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)
                .map_err(|e| AppError::new(4, format!("Failed to write JSON output: {e}")))?;
            writeln!(lock).map_err(|e| AppError::new(4, format!("Failed to write to stdout: {e}")))?;
        }
    }
    Ok(())
}

/// Write records as CSV with the given header. Missing/null values become empty cells.
pub fn write_records_csv(path: &Path, columns: &[&str], records: &[RawRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;

    writer
        .write_record(columns)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|c| match record.get(c) {
                None => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::load_records;

    #[test]
    fn csv_export_reads_back() {
        let path = std::env::temp_dir().join(format!("credit_risk_export_{}.csv", std::process::id()));
        let records = vec![
            RawRecord::new().with("age", 30).with("city", "Pune, MH"),
            RawRecord::new().with("age", 41),
        ];
        write_records_csv(&path, &["age", "city"], &records).unwrap();

        let back = load_records(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].get("city"), Some(&Value::from("Pune, MH")));
        assert!(!back[1].has("city"));
        let _ = std::fs::remove_file(&path);
    }
}
