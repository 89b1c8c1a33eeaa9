pub mod crosswalk_reader;
pub mod region_reader;
pub mod table_reader;
pub mod zip_reader;

pub use crosswalk_reader::CrosswalkReader;
pub use region_reader::{RegionData, RegionReader};
pub use table_reader::TableReader;
pub use zip_reader::{ZipDataReader, ZipDataset};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One source row keyed by upper-cased column name.
pub type RawRow = BTreeMap<String, Value>;

/// Rows and optional metadata block of a JSON data document.
#[derive(Debug, Default)]
pub struct JsonDocument {
    pub rows: Vec<Value>,
    pub metadata: Option<Value>,
}

/// Read `{"metadata": {...}, "data": [...]}` or a bare array of rows.
pub fn read_json_document(path: &Path) -> Result<JsonDocument> {
    ProcessingError::ensure_exists(path)?;

    let file = File::open(path)?;
    let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
    let value: Value = serde_json::from_reader(reader)?;

    match value {
        Value::Array(rows) => Ok(JsonDocument {
            rows,
            metadata: None,
        }),
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(rows)) => Ok(JsonDocument {
                rows,
                metadata: object.remove("metadata"),
            }),
            _ => Err(ProcessingError::InvalidFormat(format!(
                "{}: expected a \"data\" array",
                path.display()
            ))),
        },
        _ => Err(ProcessingError::InvalidFormat(format!(
            "{}: expected a JSON object or array",
            path.display()
        ))),
    }
}

/// Convert a JSON row into a `RawRow`; non-objects are malformed.
pub fn row_from_value(value: Value) -> Option<RawRow> {
    match value {
        Value::Object(object) => Some(upper_case_keys(object)),
        _ => None,
    }
}

fn upper_case_keys(object: Map<String, Value>) -> RawRow {
    object
        .into_iter()
        .map(|(key, value)| (key.trim().to_uppercase(), value))
        .collect()
}

/// Numeric reading of a cell: numbers, numeric strings, otherwise `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim().trim_end_matches('%');
            if is_null_token(trimmed) {
                None
            } else {
                trimmed.replace(',', "").parse::<f64>().ok()
            }
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Text reading of a cell (strings as-is, numbers formatted).
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_null_token(s.trim()) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Typed JSON value for a delimited-text cell.
///
/// Blank and NA tokens become null, plain decimal numbers become numbers and
/// everything else stays text. Codes with leading zeros (`02134`) stay text.
pub fn infer_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return Value::Null;
    }

    let digits = trimmed.trim_start_matches('-');
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if !leading_zero {
        if let Ok(number) = trimmed.parse::<f64>() {
            if number.is_finite() {
                if let Ok(int) = trimmed.parse::<i64>() {
                    return Value::from(int);
                }
                return Value::from(number);
            }
        }
    }

    Value::String(trimmed.to_string())
}

fn is_null_token(value: &str) -> bool {
    matches!(
        value,
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None"
    )
}
