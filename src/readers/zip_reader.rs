use crate::error::Result;
use crate::models::{InputReport, ZipRecord};
use crate::readers::{coerce_f64, coerce_string, read_json_document, row_from_value, RawRow};
use crate::utils::constants::{PERIOD_END_FIELD, REGION_FIELD, ZIP_FIELD};
use crate::utils::normalize_zip;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// ZIP records plus counts of what was skipped while reading them.
#[derive(Debug, Default)]
pub struct ZipDataset {
    pub records: Vec<ZipRecord>,
    pub report: InputReport,
    pub metadata: Option<Value>,
}

/// Reads ZIP-level market data.
///
/// Columns named in `metrics` are coerced to numbers (unparseable cells become
/// null); every other column is kept verbatim as an attribute.
pub struct ZipDataReader {
    metrics: BTreeSet<String>,
}

impl ZipDataReader {
    pub fn new(metrics: BTreeSet<String>) -> Self {
        Self { metrics }
    }

    /// Read a JSON document of ZIP rows.
    pub fn read(&self, path: &Path) -> Result<ZipDataset> {
        let document = read_json_document(path)?;
        let rows = document.rows.into_iter().map(row_from_value);

        let mut dataset = self.records_from_rows(rows);
        dataset.metadata = document.metadata;

        info!(
            "Loaded {} ZIP records from {} ({} skipped)",
            dataset.records.len(),
            path.display(),
            dataset.report.skipped_rows
        );
        Ok(dataset)
    }

    /// Build records from already-parsed rows; `None` rows count as skipped.
    pub fn records_from_rows<I>(&self, rows: I) -> ZipDataset
    where
        I: IntoIterator<Item = Option<RawRow>>,
    {
        let mut dataset = ZipDataset::default();

        for (index, row) in rows.into_iter().enumerate() {
            dataset.report.source_rows += 1;

            match row.and_then(|row| self.parse_row(row)) {
                Some(record) => dataset.records.push(record),
                None => {
                    debug!("Skipping ZIP row {}: no usable ZIP code", index);
                    dataset.report.skipped_rows += 1;
                }
            }
        }

        if dataset.report.skipped_rows > 0 {
            warn!(
                "Skipped {} of {} ZIP rows without a usable ZIP code",
                dataset.report.skipped_rows, dataset.report.source_rows
            );
        }

        dataset
    }

    /// Convert one row; `None` when it has no parseable ZIP code.
    pub fn parse_row(&self, mut row: RawRow) -> Option<ZipRecord> {
        let zip = [ZIP_FIELD, REGION_FIELD]
            .iter()
            .filter_map(|field| row.get(*field))
            .filter_map(coerce_string)
            .find_map(|raw| normalize_zip(&raw))?;

        row.remove(ZIP_FIELD);
        row.remove(REGION_FIELD);

        let mut record = ZipRecord::new(zip);
        if let Some(period) = row.remove(PERIOD_END_FIELD).as_ref().and_then(coerce_string) {
            record = record.with_period(period);
        }

        for (column, value) in row {
            if self.metrics.contains(&column) {
                record.metrics.insert(column, coerce_f64(&value));
            } else {
                record.attributes.insert(column, value);
            }
        }

        Some(record)
    }
}
