use crate::error::Result;
use crate::processors::ProcessedDataset;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes `{"metadata": {...}, "data": [...]}` documents.
pub struct JsonWriter {
    pretty: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Write `dataset` to `path`, creating parent directories.
    ///
    /// The document goes to a temporary file next to `path` first and is
    /// renamed into place, so readers never see a partial file.
    pub fn write(&self, dataset: &ProcessedDataset, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        self.write_to(dataset, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        let size = fs::metadata(path)?.len();
        info!(
            "Wrote {} records to {} ({:.1} KB)",
            dataset.records.len(),
            path.display(),
            size as f64 / 1024.0
        );
        Ok(())
    }

    /// Serialize `dataset` into any writer.
    pub fn write_to<W: Write>(&self, dataset: &ProcessedDataset, writer: W) -> Result<()> {
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, writer);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::{AggregatedRecord, InputReport};
    use crate::processors::{DatasetContext, GeoPipeline};
    use serde_json::Value;
    use tempfile::TempDir;

    fn dataset() -> Result<ProcessedDataset> {
        let records = vec![
            AggregatedRecord::new("STATE_FIPS", "06")
                .with_metric("MEDIAN_SALE_PRICE", Some(790_000.0))
                .with_metric("INVENTORY", Some(f64::NAN)),
            AggregatedRecord::new("STATE_FIPS", "48").with_metric("MEDIAN_SALE_PRICE", None),
        ];
        let mut config = PipelineConfig::default();
        config.log_transform_metrics.clear();

        GeoPipeline::new(config).finalize(
            records,
            DatasetContext {
                level: "state".to_string(),
                source: "test".to_string(),
                aggregation_method: None,
                latest_period: None,
                input: InputReport::default(),
                original_metadata: None,
            },
        )
    }

    #[test]
    fn test_write_creates_parent_dirs() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/out/redfin_state_aggregated.json");

        JsonWriter::new().write(&dataset()?, &path)?;

        let document: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(document["metadata"]["record_count"], 2);
        assert_eq!(document["data"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[test]
    fn test_nulls_never_strings_or_nan() -> Result<()> {
        let mut buffer = Vec::new();
        JsonWriter::with_pretty(false).write_to(&dataset()?, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();

        assert!(!text.contains("NaN"));
        assert!(!text.contains("\"null\""));

        let document: Value = serde_json::from_str(&text)?;
        assert_eq!(document["data"][0]["INVENTORY"], Value::Null);
        assert_eq!(document["data"][1]["MEDIAN_SALE_PRICE"], Value::Null);
        assert!(document["data"][1].get("MEDIAN_SALE_PRICE_RANK").is_none());
        Ok(())
    }

    #[test]
    fn test_overwrites_existing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.json");
        fs::write(&path, "stale")?;

        JsonWriter::new().write(&dataset()?, &path)?;
        assert!(fs::read_to_string(&path)?.starts_with('{'));
        Ok(())
    }
}
