use crate::error::{ProcessingError, Result};
use crate::readers::{infer_cell, RawRow};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use crate::utils::decode_text;
use memmap2::Mmap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Rows of a delimited text file.
#[derive(Debug, Default)]
pub struct TableData {
    /// Upper-cased header names in file order
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub skipped_rows: usize,
}

/// Reads Redfin CSV/TSV extracts into loosely typed rows.
///
/// The delimiter follows the file extension (`.tsv`/`.tab` → tab, otherwise
/// comma). Headers are upper-cased and cells typed with [`infer_cell`].
pub struct TableReader {
    use_mmap: bool,
    columns: Option<BTreeSet<String>>,
}

impl TableReader {
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            columns: None,
        }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self {
            use_mmap,
            columns: None,
        }
    }

    /// Keep only the named (upper-case) columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.columns = Some(columns.into_iter().map(|c| c.to_uppercase()).collect());
        self
    }

    pub fn read(&self, path: &Path) -> Result<TableData> {
        ProcessingError::ensure_exists(path)?;

        let table = if self.use_mmap {
            self.read_mmap(path)?
        } else {
            self.read_buffered(path)?
        };

        info!(
            "Read {} rows ({} columns) from {}",
            table.rows.len(),
            table.columns.len(),
            path.display()
        );
        Ok(table)
    }

    fn read_buffered(&self, path: &Path) -> Result<TableData> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        self.parse(&bytes, path)
    }

    fn read_mmap(&self, path: &Path) -> Result<TableData> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        self.parse(&mmap, path)
    }

    fn parse(&self, bytes: &[u8], path: &Path) -> Result<TableData> {
        let text = decode_text(bytes, &path.display().to_string());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_for(path))
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "{} has no header row",
                path.display()
            )));
        }

        let wanted: Vec<bool> = headers
            .iter()
            .map(|h| {
                !h.is_empty()
                    && self
                        .columns
                        .as_ref()
                        .map_or(true, |columns| columns.contains(h))
            })
            .collect();

        let mut table = TableData {
            columns: headers
                .iter()
                .zip(&wanted)
                .filter(|(_, keep)| **keep)
                .map(|(h, _)| h.clone())
                .collect(),
            ..Default::default()
        };

        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping line {} of {}: {}", line + 2, path.display(), e);
                    table.skipped_rows += 1;
                    continue;
                }
            };

            let row: RawRow = headers
                .iter()
                .zip(&wanted)
                .zip(record.iter())
                .filter(|((_, keep), _)| **keep)
                .map(|((header, _), cell)| (header.clone(), infer_cell(cell)))
                .collect();
            table.rows.push(row);
        }

        Ok(table)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_read_tsv_with_column_filter() -> Result<()> {
        let mut file = Builder::new().suffix(".tsv").tempfile()?;
        writeln!(file, "region\tperiod_end\tmedian_sale_price\tnotes")?;
        writeln!(file, "Zip Code: 02134\t2024-06-30\t810000\tkeep out")?;
        writeln!(file, "Zip Code: 10001\t2024-06-30\tNA\t")?;

        let table = TableReader::new()
            .with_columns(vec!["REGION".to_string(), "median_sale_price".to_string()])
            .read(file.path())?;

        assert_eq!(table.columns, vec!["REGION", "MEDIAN_SALE_PRICE"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["MEDIAN_SALE_PRICE"], json!(810000));
        assert_eq!(table.rows[1]["MEDIAN_SALE_PRICE"], Value::Null);
        assert!(!table.rows[0].contains_key("NOTES"));
        Ok(())
    }

    #[test]
    fn test_mmap_matches_buffered() -> Result<()> {
        let mut file = Builder::new().suffix(".csv").tempfile()?;
        writeln!(file, "zip,city_name,latitude")?;
        writeln!(file, "02134,Boston,42.35")?;
        writeln!(file, "short,row")?;

        let buffered = TableReader::new().read(file.path())?;
        let mapped = TableReader::with_mmap(true).read(file.path())?;

        assert_eq!(buffered.rows, mapped.rows);
        assert_eq!(buffered.rows[0]["ZIP"], json!("02134"));
        assert_eq!(buffered.rows[0]["LATITUDE"], json!(42.35));
        // Short rows keep the cells they have
        assert_eq!(buffered.rows[1].len(), 2);
        Ok(())
    }

    #[test]
    fn test_delimiter_for_extension() {
        assert_eq!(delimiter_for(Path::new("zip_code_market_tracker.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("a.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("uszips.csv")), b',');
    }
}
