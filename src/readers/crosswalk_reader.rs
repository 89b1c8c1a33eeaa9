use crate::error::{ProcessingError, Result};
use crate::models::{Crosswalk, CrosswalkEntry, InputReport};
use crate::readers::table_reader::delimiter_for;
use crate::utils::{decode_text, normalize_cbsa, normalize_county_fips, normalize_zip, state_fips_from_county};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use validator::Validate;

/// A `uszips.csv`-style row. Only the columns below are read.
#[derive(Debug, Default, Deserialize)]
struct CrosswalkRow {
    #[serde(default, alias = "ZIP", alias = "zip_code")]
    zip: Option<String>,

    #[serde(default, alias = "COUNTY_FIPS")]
    county_fips: Option<String>,

    #[serde(default, alias = "STATE_FIPS")]
    state_fips: Option<String>,

    #[serde(default, alias = "state_id", alias = "STATE")]
    state_abbrev: Option<String>,

    #[serde(default, alias = "STATE_NAME")]
    state_name: Option<String>,

    #[serde(default, alias = "COUNTY_NAME")]
    county_name: Option<String>,

    #[serde(default, alias = "cbsa", alias = "cbsa_fips", alias = "CBSA_CODE", alias = "CBSA")]
    cbsa_code: Option<String>,

    #[serde(default, alias = "POPULATION")]
    population: Option<String>,
}

/// Reads the ZIP → state/county/CBSA crosswalk from a CSV file, or a
/// tab-separated one when the extension is `.tsv`/`.tab`.
pub struct CrosswalkReader;

impl CrosswalkReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the crosswalk and the counts of rows that could not be used.
    ///
    /// Rows without a valid ZIP or county FIPS code are skipped. An
    /// unparseable population is treated as unknown (weight 1).
    pub fn read(&self, path: &Path) -> Result<(Crosswalk, InputReport)> {
        ProcessingError::ensure_exists(path)?;

        let bytes = fs::read(path)?;
        let text = decode_text(&bytes, &path.display().to_string());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_for(path))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut crosswalk = Crosswalk::new();
        let mut report = InputReport::default();

        for (line, result) in reader.deserialize::<CrosswalkRow>().enumerate() {
            report.source_rows += 1;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping crosswalk line {}: {}", line + 2, e);
                    report.skipped_rows += 1;
                    continue;
                }
            };

            match Self::entry_from_row(row) {
                Some(entry) => {
                    if !crosswalk.insert(entry) {
                        report.duplicate_rows += 1;
                    }
                }
                None => report.skipped_rows += 1,
            }
        }

        if crosswalk.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No usable crosswalk rows in {}",
                path.display()
            )));
        }

        if report.skipped_rows > 0 {
            warn!(
                "Skipped {} crosswalk rows without a valid ZIP or county FIPS code",
                report.skipped_rows
            );
        }
        info!(
            "Loaded crosswalk with {} ZIP codes from {}",
            crosswalk.len(),
            path.display()
        );

        Ok((crosswalk, report))
    }

    fn entry_from_row(row: CrosswalkRow) -> Option<CrosswalkEntry> {
        let zip = row.zip.as_deref().and_then(normalize_zip)?;
        let county_fips = row.county_fips.as_deref().and_then(normalize_county_fips)?;
        let state_fips = row
            .state_fips
            .as_deref()
            .and_then(|raw| normalize_fips_width(raw, 2))
            .or_else(|| state_fips_from_county(&county_fips))?;

        let entry = CrosswalkEntry {
            zip,
            state_fips,
            county_fips,
            state_abbrev: non_empty(row.state_abbrev),
            state_name: non_empty(row.state_name),
            county_name: non_empty(row.county_name),
            cbsa_code: row.cbsa_code.as_deref().and_then(normalize_cbsa),
            population: row
                .population
                .as_deref()
                .and_then(|raw| raw.replace(',', "").parse::<f64>().ok())
                .filter(|p| p.is_finite() && *p >= 0.0),
        };

        match entry.validate() {
            Ok(()) => Some(entry),
            Err(e) => {
                debug!("Invalid crosswalk entry for ZIP {}: {}", entry.zip, e);
                None
            }
        }
    }
}

impl Default for CrosswalkReader {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_fips_width(raw: &str, width: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > width || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>width$}", trimmed, width = width))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
