//! Read/write model bundle JSON files.
//!
//! The format version is checked before the rest of the document is decoded, so an
//! old or future bundle fails with a version message instead of a field error.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::bundle::{BUNDLE_FORMAT_VERSION, ModelBundle};
use crate::error::AppError;

/// Write a bundle as JSON.
pub fn write_bundle_json(path: &Path, bundle: &ModelBundle) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create bundle '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer(&mut w, bundle).map_err(|e| AppError::new(4, format!("Failed to write bundle JSON: {e}")))?;
    w.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush bundle '{}': {e}", path.display())))?;
    Ok(())
}

/// Read and check a bundle JSON file.
pub fn read_bundle_json(path: &Path) -> Result<ModelBundle, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open bundle '{}': {e}", path.display())))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid bundle JSON: {e}")))?;

    match value.get("format_version").and_then(Value::as_u64) {
        Some(v) if v == u64::from(BUNDLE_FORMAT_VERSION) => {}
        Some(v) => {
            return Err(AppError::new(
                2,
                format!("Unsupported bundle format version {v} (this build reads {BUNDLE_FORMAT_VERSION})."),
            ));
        }
        None => return Err(AppError::new(2, "Bundle JSON has no format_version field.")),
    }

    let bundle: ModelBundle =
        serde_json::from_value(value).map_err(|e| AppError::new(2, format!("Invalid bundle JSON: {e}")))?;
    bundle
        .check()
        .map_err(|e| AppError::new(2, format!("Inconsistent bundle: {e}")))?;
    Ok(bundle)
}
