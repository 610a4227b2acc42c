//! Applicant file ingest.
//!
//! Turns an uploaded/batch file into `RawRecord`s. The format is chosen from the
//! file extension only, never sniffed from content.
//!
//! Design goals:
//! - **Loss-free**: every input column survives (legacy output echoes them all)
//! - **Typed cells**: empty -> null, numeric text -> number, anything else -> string
//! - **All-or-nothing**: a decode failure rejects the whole batch
//! - **Separation of concerns**: no defaulting or validation of model inputs here

use std::path::Path;

use csv::StringRecord;
use serde_json::{Map, Number, Value};

use crate::domain::columns as col;
use crate::domain::{RawRecord, RiskCategory};
use crate::error::{ScoringError, Stage};
use crate::features::input::numeric_field;

/// Every extension accepted at the boundary, sorted (used in error messages).
pub const SUPPORTED_EXTENSIONS: [&str; 8] = [".csv", ".json", ".ods", ".txt", ".xls", ".xlsb", ".xlsm", ".xlsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `.csv` and `.txt`.
    Delimited,
    /// `.json`: array of objects, or JSON lines.
    Json,
    /// `.xlsx/.xls/.xlsm/.xlsb/.ods`. Recognized but not decodable in this build.
    Spreadsheet,
}

impl InputFormat {
    /// Pick the decoder from a file name. Extension matching is case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, ScoringError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        match ext.as_str() {
            ".csv" | ".txt" => Ok(InputFormat::Delimited),
            ".json" => Ok(InputFormat::Json),
            ".xlsx" | ".xls" | ".xlsm" | ".xlsb" | ".ods" => Ok(InputFormat::Spreadsheet),
            _ => Err(ScoringError::UnsupportedInputFormat {
                extension: ext,
                supported: SUPPORTED_EXTENSIONS.join(", "),
            }),
        }
    }
}

/// Read a file from disk and decode it.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, ScoringError> {
    let name = path.to_string_lossy();
    // Check the extension before touching the file.
    InputFormat::from_name(&name)?;
    let bytes = std::fs::read(path).map_err(|e| ScoringError::UnclassifiedProcessingError {
        stage: Stage::Ingest,
        detail: format!("failed to read '{}': {e}", path.display()),
    })?;
    records_from_bytes(&name, &bytes)
}

/// Decode an in-memory upload. `file_name` only selects the format.
pub fn records_from_bytes(file_name: &str, bytes: &[u8]) -> Result<Vec<RawRecord>, ScoringError> {
    let records = match InputFormat::from_name(file_name)? {
        InputFormat::Delimited => records_from_csv(bytes)?,
        InputFormat::Json => records_from_json(bytes)?,
        InputFormat::Spreadsheet => {
            let ext = Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            let decoder = if ext == "ods" { "odf" } else { "excel" };
            return Err(ScoringError::OptionalDependencyMissing {
                format: format!(".{ext}"),
                detail: format!("no {decoder} decoder is compiled into this build; convert the file to CSV or JSON"),
            });
        }
    };

    if records.is_empty() {
        return Err(ScoringError::EmptyInput);
    }
    Ok(records)
}

/// Decode delimited text with a header row.
pub fn records_from_csv(bytes: &[u8]) -> Result<Vec<RawRecord>, ScoringError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ingest_error(format!("failed to read CSV headers: {e}")))?
        .clone();
    if headers.iter().all(|h| normalize_header_name(h).is_empty()) {
        return Err(ScoringError::EmptyInput);
    }
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();

    let mut out = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) => return Err(ingest_error(format!("malformed CSV row: {e}"))),
        }
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut map = Map::new();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            map.insert(name.clone(), parse_cell(record.get(i).unwrap_or("")));
        }
        out.push(RawRecord::from_map(map));
    }

    Ok(out)
}

/// Decode a JSON array of objects (or a single object), falling back to JSON lines.
pub fn records_from_json(bytes: &[u8]) -> Result<Vec<RawRecord>, ScoringError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ingest_error(format!("input is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(ScoringError::EmptyInput);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items.into_iter().map(object_record).collect(),
        Ok(obj @ Value::Object(_)) => Ok(vec![object_record(obj)?]),
        Ok(other) => Err(ingest_error(format!("expected JSON array of objects, got {}", kind_of(&other)))),
        Err(_) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, line)| {
                let value: Value = serde_json::from_str(line)
                    .map_err(|e| ingest_error(format!("invalid JSON on line {}: {e}", i + 1)))?;
                object_record(value)
            })
            .collect(),
    }
}

/// Targets read from a labeled (training) record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub pd: Vec<f64>,
    pub categories: Vec<RiskCategory>,
}

/// Read `probability_of_default` and `risk_category` from every record.
pub fn parse_labels(records: &[RawRecord]) -> Result<Labels, ScoringError> {
    let mut pd = Vec::with_capacity(records.len());
    let mut categories = Vec::with_capacity(records.len());

    for (row, r) in records.iter().enumerate() {
        let value = numeric_field(r, col::PROBABILITY_OF_DEFAULT, row)?.ok_or_else(|| {
            ScoringError::MissingRequiredColumns {
                missing: vec![col::PROBABILITY_OF_DEFAULT.to_string()],
                available: r.columns().cloned().collect(),
            }
        })?;
        pd.push(value);

        let category = match r.get(col::RISK_CATEGORY) {
            Some(Value::String(s)) => RiskCategory::from_label(s.trim()).ok_or_else(|| ScoringError::InvalidLabel {
                row,
                label: s.clone(),
            })?,
            Some(other) => {
                return Err(ScoringError::InvalidLabel {
                    row,
                    label: other.to_string(),
                });
            }
            None => {
                return Err(ScoringError::MissingRequiredColumns {
                    missing: vec![col::RISK_CATEGORY.to_string()],
                    available: r.columns().cloned().collect(),
                });
            }
        };
        categories.push(category);
    }

    Ok(Labels { pd, categories })
}

fn object_record(value: Value) -> Result<RawRecord, ScoringError> {
    match value {
        Value::Object(map) => Ok(RawRecord::from_map(map)),
        other => Err(ingest_error(format!("expected a JSON object per record, got {}", kind_of(&other)))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn ingest_error(detail: String) -> ScoringError {
    ScoringError::UnclassifiedProcessingError {
        stage: Stage::Ingest,
        detail,
    }
}

/// Typed cell value: empty -> null, integer/float text -> number, otherwise string.
pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(s.to_string())
}

/// Trim and drop a leading UTF-8 BOM. Case is kept, so `Age` is not `age`.
fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_sniffing() {
        assert_eq!(InputFormat::from_name("batch.CSV").unwrap(), InputFormat::Delimited);
        assert_eq!(InputFormat::from_name("batch.txt").unwrap(), InputFormat::Delimited);
        assert_eq!(InputFormat::from_name("batch.json").unwrap(), InputFormat::Json);
        assert_eq!(InputFormat::from_name("batch.xlsb").unwrap(), InputFormat::Spreadsheet);

        let err = InputFormat::from_name("batch.parquet").unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains(".parquet"));
        assert!(err.to_string().contains(".csv, .json"));
    }

    #[test]
    fn csv_cells_are_typed_and_headers_cleaned() {
        let data = "\u{feff}age, monthly_income_inr ,City,loan_type\n35,50000.5,Pune,\n";
        let records = records_from_bytes("x.csv", data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.get("age"), Some(&Value::from(35)));
        // Header case is preserved.
        assert_eq!(r.get("City"), Some(&Value::from("Pune")));
        assert!(r.get("city").is_none());
        assert_eq!(r.get("monthly_income_inr"), Some(&Value::from(50000.5)));
        assert!(!r.has("loan_type"));
        assert!(r.as_map().contains_key("loan_type"));
    }

    #[test]
    fn header_only_csv_is_empty_input() {
        let err = records_from_bytes("x.csv", b"age,monthly_income_inr\n").unwrap_err();
        assert_eq!(err, ScoringError::EmptyInput);
        assert_eq!(records_from_bytes("x.csv", b"").unwrap_err(), ScoringError::EmptyInput);
    }

    #[test]
    fn json_array_and_lines() {
        let arr = br#"[{"age": 30, "monthly_income_inr": 40000}, {"age": 41}]"#;
        assert_eq!(records_from_bytes("x.json", arr).unwrap().len(), 2);

        let lines = b"{\"age\": 30}\n\n{\"age\": 31}\n";
        let records = records_from_bytes("x.json", lines).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("age"), Some(&Value::from(31)));

        assert_eq!(records_from_bytes("x.json", b"[]").unwrap_err(), ScoringError::EmptyInput);
        assert!(records_from_bytes("x.json", b"[1, 2]").is_err());
    }

    #[test]
    fn spreadsheets_report_missing_decoder() {
        let err = records_from_bytes("book.xlsx", b"PK").unwrap_err();
        assert!(matches!(err, ScoringError::OptionalDependencyMissing { ref format, .. } if format == ".xlsx"));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn labels_parse_and_reject_unknown_category() {
        let good = vec![
            RawRecord::new()
                .with(col::PROBABILITY_OF_DEFAULT, 0.12)
                .with(col::RISK_CATEGORY, "Low Risk"),
            RawRecord::new()
                .with(col::PROBABILITY_OF_DEFAULT, "0.9")
                .with(col::RISK_CATEGORY, "Very High Risk"),
        ];
        let labels = parse_labels(&good).unwrap();
        assert_eq!(labels.pd, vec![0.12, 0.9]);
        assert_eq!(labels.categories, vec![RiskCategory::Low, RiskCategory::VeryHigh]);

        let bad = vec![RawRecord::new()
            .with(col::PROBABILITY_OF_DEFAULT, 0.5)
            .with(col::RISK_CATEGORY, "Moderate")];
        assert_eq!(
            parse_labels(&bad).unwrap_err(),
            ScoringError::InvalidLabel {
                row: 0,
                label: "Moderate".to_string(),
            }
        );
    }

    #[test]
    fn parse_cell_types() {
        assert_eq!(parse_cell(""), Value::Null);
        assert_eq!(parse_cell(" 7 "), Value::from(7));
        assert_eq!(parse_cell("1e3"), Value::from(1000.0));
        assert_eq!(parse_cell("APP-001"), Value::from("APP-001"));
    }
}
