use crate::error::Result;
use crate::readers::{coerce_f64, read_json_document, row_from_value, RawRow, TableReader};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Rows of a Redfin region file (state, county, metro...).
#[derive(Debug, Default)]
pub struct RegionData {
    pub rows: Vec<RawRow>,
    /// `metadata` block of a JSON input, passed through to the output
    pub metadata: Option<Value>,
    pub source_rows: usize,
    pub skipped_rows: usize,
}

/// Reads a region file as JSON (`{"metadata", "data"}` or an array) or as a
/// CSV/TSV extract, upper-casing column names and coercing numeric columns.
pub struct RegionReader {
    numeric_columns: BTreeSet<String>,
    use_mmap: bool,
}

impl RegionReader {
    pub fn new(numeric_columns: BTreeSet<String>) -> Self {
        Self {
            numeric_columns,
            use_mmap: false,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn read(&self, path: &Path) -> Result<RegionData> {
        let mut data = if is_json(path) {
            let document = read_json_document(path)?;
            let source_rows = document.rows.len();
            let mut skipped_rows = 0;
            let rows = document
                .rows
                .into_iter()
                .filter_map(|value| {
                    let row = row_from_value(value);
                    if row.is_none() {
                        skipped_rows += 1;
                    }
                    row
                })
                .collect();

            RegionData {
                rows,
                metadata: document.metadata,
                source_rows,
                skipped_rows,
            }
        } else {
            let table = TableReader::with_mmap(self.use_mmap).read(path)?;
            RegionData {
                source_rows: table.rows.len() + table.skipped_rows,
                skipped_rows: table.skipped_rows,
                rows: table.rows,
                metadata: None,
            }
        };

        let converted = self.coerce_numeric_columns(&mut data.rows);

        if data.skipped_rows > 0 {
            warn!("Skipped {} malformed region rows", data.skipped_rows);
        }
        info!(
            "Loaded {} region rows from {} ({} numeric columns converted)",
            data.rows.len(),
            path.display(),
            converted
        );

        Ok(data)
    }

    /// Replace string cells in numeric columns by numbers (or null).
    /// Returns how many distinct columns were touched.
    fn coerce_numeric_columns(&self, rows: &mut [RawRow]) -> usize {
        let mut touched = BTreeSet::new();

        for row in rows.iter_mut() {
            for (column, value) in row.iter_mut() {
                if !self.numeric_columns.contains(column) || value.is_number() {
                    continue;
                }
                *value = coerce_f64(value).map(Value::from).unwrap_or(Value::Null);
                touched.insert(column.clone());
            }
        }

        touched.len()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"))
}
