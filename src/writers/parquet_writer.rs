use crate::error::{ProcessingError, Result};
use crate::models::AggregatedRecord;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, LOG_SUFFIX, PERIOD_END_FIELD, RANK_SUFFIX, TOTAL_POPULATION_FIELD,
    ZIP_COUNT_FIELD,
};
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Columnar export of output records.
///
/// Column order follows the JSON records: id, counts, period, attributes,
/// then each metric with its `_LOG` and `_RANK` companions. Metrics are
/// nullable Float64; attributes are Float64 when every value is numeric and
/// Utf8 otherwise.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

enum Column<'a> {
    Id,
    ZipCount,
    TotalPopulation,
    Period,
    Attribute { name: &'a str, numeric: bool },
    Metric(&'a str),
    Log(&'a str),
    Rank(&'a str),
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write `records` to `path`. Nothing is written for an empty slice.
    pub fn write_records(&self, records: &[AggregatedRecord], path: &Path) -> Result<()> {
        if records.is_empty() {
            warn!("No records to write to {}", path.display());
            return Ok(());
        }

        let columns = plan_columns(records);
        let schema = schema_for(records, &columns);
        let batch = records_to_batch(records, &columns, schema.clone())?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        info!(
            "Wrote {} records ({} columns) to {}",
            records.len(),
            columns.len(),
            path.display()
        );
        Ok(())
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        ProcessingError::ensure_exists(path)?;

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();
        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            column_count: file_metadata.schema_descr().num_columns(),
            file_size,
            compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn plan_columns(records: &[AggregatedRecord]) -> Vec<Column<'_>> {
    let mut columns = vec![Column::Id];
    if records.iter().any(|r| r.zip_count.is_some()) {
        columns.push(Column::ZipCount);
    }
    if records.iter().any(|r| r.total_population.is_some()) {
        columns.push(Column::TotalPopulation);
    }
    if records.iter().any(|r| r.period_end.is_some()) {
        columns.push(Column::Period);
    }

    let metrics: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.metrics.keys().map(String::as_str))
        .collect();

    let mut taken: BTreeSet<String> = metrics.iter().map(|m| m.to_string()).collect();
    for metric in &metrics {
        taken.insert(format!("{}{}", metric, LOG_SUFFIX));
        taken.insert(format!("{}{}", metric, RANK_SUFFIX));
    }

    let attributes: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.attributes.keys().map(String::as_str))
        .collect();
    for name in attributes {
        if taken.contains(name) {
            continue;
        }
        let numeric = records
            .iter()
            .filter_map(|r| r.attributes.get(name))
            .filter(|v| !v.is_null())
            .all(Value::is_number);
        columns.push(Column::Attribute { name, numeric });
    }

    for metric in metrics {
        columns.push(Column::Metric(metric));
        if records.iter().any(|r| r.log_values.contains_key(metric)) {
            columns.push(Column::Log(metric));
        }
        if records.iter().any(|r| r.ranks.contains_key(metric)) {
            columns.push(Column::Rank(metric));
        }
    }

    columns
}

fn schema_for(records: &[AggregatedRecord], columns: &[Column<'_>]) -> Arc<Schema> {
    let id_field = records
        .first()
        .map(|r| r.id_field.clone())
        .unwrap_or_default();

    let fields: Vec<Field> = columns
        .iter()
        .map(|column| match column {
            Column::Id => Field::new(id_field.as_str(), DataType::Utf8, false),
            Column::ZipCount => Field::new(ZIP_COUNT_FIELD, DataType::UInt64, true),
            Column::TotalPopulation => Field::new(TOTAL_POPULATION_FIELD, DataType::UInt64, true),
            Column::Period => Field::new(PERIOD_END_FIELD, DataType::Utf8, true),
            Column::Attribute { name, numeric: true } => Field::new(*name, DataType::Float64, true),
            Column::Attribute { name, numeric: false } => Field::new(*name, DataType::Utf8, true),
            Column::Metric(m) => Field::new(*m, DataType::Float64, true),
            Column::Log(m) => Field::new(format!("{}{}", m, LOG_SUFFIX), DataType::Float64, true),
            Column::Rank(m) => Field::new(format!("{}{}", m, RANK_SUFFIX), DataType::Float64, true),
        })
        .collect();

    Arc::new(Schema::new(fields))
}

fn records_to_batch(
    records: &[AggregatedRecord],
    columns: &[Column<'_>],
    schema: Arc<Schema>,
) -> Result<RecordBatch> {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|column| -> ArrayRef {
            match column {
                Column::Id => Arc::new(StringArray::from(
                    records.iter().map(|r| r.geo_id.clone()).collect::<Vec<_>>(),
                )),
                Column::ZipCount => Arc::new(UInt64Array::from(
                    records
                        .iter()
                        .map(|r| r.zip_count.map(|c| c as u64))
                        .collect::<Vec<_>>(),
                )),
                Column::TotalPopulation => Arc::new(UInt64Array::from(
                    records.iter().map(|r| r.total_population).collect::<Vec<_>>(),
                )),
                Column::Period => Arc::new(StringArray::from(
                    records.iter().map(|r| r.period_end.clone()).collect::<Vec<_>>(),
                )),
                Column::Attribute { name, numeric: true } => Arc::new(Float64Array::from(
                    records
                        .iter()
                        .map(|r| finite(r.attributes.get(*name).and_then(Value::as_f64)))
                        .collect::<Vec<_>>(),
                )),
                Column::Attribute { name, numeric: false } => Arc::new(StringArray::from(
                    records
                        .iter()
                        .map(|r| r.attributes.get(*name).and_then(attribute_text))
                        .collect::<Vec<_>>(),
                )),
                Column::Metric(m) => Arc::new(Float64Array::from(
                    records.iter().map(|r| finite(r.metric(m))).collect::<Vec<_>>(),
                )),
                Column::Log(m) => Arc::new(Float64Array::from(
                    records.iter().map(|r| finite(r.log_value(m))).collect::<Vec<_>>(),
                )),
                Column::Rank(m) => Arc::new(Float64Array::from(
                    records.iter().map(|r| finite(r.rank(m))).collect::<Vec<_>>(),
                )),
            }
        })
        .collect();

    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub column_count: usize,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.column_count,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}
