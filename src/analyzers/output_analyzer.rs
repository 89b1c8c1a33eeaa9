use crate::error::{ProcessingError, Result};
use crate::models::GeographyLevel;
use crate::readers::read_json_document;
use crate::utils::constants::{LOG_SUFFIX, RANK_SUFFIX, REGION_FIELD};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Candidate identifier fields, most specific first.
const ID_FIELDS: [&str; 5] = ["ZIP", "COUNTY_FIPS", "CBSA_CODE", "STATE_FIPS", REGION_FIELD];

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCoverage {
    pub non_null: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricCoverage {
    pub fn coverage_percentage(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.non_null as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingId { index: usize },
    DuplicateId { id: String },
    RankOutOfRange { id: String, field: String, value: f64 },
    NonNumericValue { id: String, field: String },
    RecordCountMismatch { declared: usize, actual: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingId { index } => write!(f, "record {} has no identifier", index),
            Violation::DuplicateId { id } => write!(f, "duplicate identifier {}", id),
            Violation::RankOutOfRange { id, field, value } => {
                write!(f, "{} of {} is {} (outside 0..=1)", field, id, value)
            }
            Violation::NonNumericValue { id, field } => {
                write!(f, "{} of {} is not a number or null", field, id)
            }
            Violation::RecordCountMismatch { declared, actual } => write!(
                f,
                "metadata declares {} records but data has {}",
                declared, actual
            ),
        }
    }
}

/// What `info` and `validate` report about an output document.
#[derive(Debug)]
pub struct OutputSummary {
    pub geography_level: Option<String>,
    pub generated_at: Option<String>,
    pub id_field: Option<String>,
    pub record_count: usize,
    pub metrics: BTreeMap<String, MetricCoverage>,
    pub ranks: BTreeMap<String, MetricCoverage>,
    pub removed: Option<u64>,
    pub nullified: Option<u64>,
    pub violations: Vec<Violation>,
    pub sample: Vec<Value>,
}

impl OutputSummary {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Geography Level: {}\n\
            Generated At: {}\n\
            Identifier: {}\n\
            Records: {}\n\
            Domain Rules: {} removed, {} nullified\n",
            self.geography_level.as_deref().unwrap_or("unknown"),
            self.generated_at.as_deref().unwrap_or("unknown"),
            self.id_field.as_deref().unwrap_or("unknown"),
            self.record_count,
            self.removed.map_or("?".to_string(), |n| n.to_string()),
            self.nullified.map_or("?".to_string(), |n| n.to_string()),
        );

        if !self.metrics.is_empty() {
            out.push_str("\nMetric Coverage:\n");
            for (name, coverage) in &self.metrics {
                let range = match (coverage.min, coverage.max) {
                    (Some(min), Some(max)) => format!("{:.2} to {:.2}", min, max),
                    _ => "no values".to_string(),
                };
                let ranked = if self.ranks.contains_key(name) { " [ranked]" } else { "" };
                out.push_str(&format!(
                    "  {:<32} {:>5.1}%  {}{}\n",
                    name,
                    coverage.coverage_percentage(self.record_count),
                    range,
                    ranked
                ));
            }
        }

        if self.violations.is_empty() {
            out.push_str("\nNo invariant violations found");
        } else {
            out.push_str(&format!("\n{} invariant violations:", self.violations.len()));
            for violation in self.violations.iter().take(20) {
                out.push_str(&format!("\n  - {}", violation));
            }
            if self.violations.len() > 20 {
                out.push_str(&format!("\n  ... and {} more", self.violations.len() - 20));
            }
        }

        out
    }
}

/// Inspects written output documents.
pub struct OutputAnalyzer {
    sample_size: usize,
}

impl OutputAnalyzer {
    pub fn new() -> Self {
        Self { sample_size: 0 }
    }

    pub fn with_sample_size(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn analyze(&self, path: &Path) -> Result<OutputSummary> {
        let document = read_json_document(path)?;
        let metadata = document.metadata.unwrap_or(Value::Null);

        let records: Vec<&Map<String, Value>> =
            document.rows.iter().filter_map(Value::as_object).collect();
        if records.len() != document.rows.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "{}: data entries must be objects",
                path.display()
            )));
        }

        let id_field = detect_id_field(&metadata, &records);
        let mut summary = OutputSummary {
            geography_level: metadata["geography_level"].as_str().map(String::from),
            generated_at: metadata["generated_at"].as_str().map(String::from),
            id_field: id_field.clone(),
            record_count: records.len(),
            metrics: BTreeMap::new(),
            ranks: BTreeMap::new(),
            removed: metadata["domain_rules"]["removed"].as_u64(),
            nullified: metadata["domain_rules"]["nullified"].as_u64(),
            violations: Vec::new(),
            sample: document.rows.iter().take(self.sample_size).cloned().collect(),
        };

        if let Some(declared) = metadata["record_count"].as_u64() {
            if declared as usize != records.len() {
                summary.violations.push(Violation::RecordCountMismatch {
                    declared: declared as usize,
                    actual: records.len(),
                });
            }
        }

        let tracked = tracked_metrics(&metadata);
        let mut seen_ids = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let id = id_field
                .as_deref()
                .and_then(|field| record.get(field))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
            let label = match id {
                Some(id) => {
                    if !seen_ids.insert(id.clone()) {
                        summary.violations.push(Violation::DuplicateId { id: id.clone() });
                    }
                    id
                }
                None => {
                    summary.violations.push(Violation::MissingId { index });
                    format!("#{}", index)
                }
            };

            for (field, value) in record.iter() {
                if field.ends_with(RANK_SUFFIX) {
                    let coverage = summary.ranks.entry(field.clone()).or_insert_with(empty_coverage);
                    match value {
                        Value::Null => {}
                        Value::Number(n) => {
                            let rank = n.as_f64().unwrap_or(f64::NAN);
                            observe(coverage, rank);
                            if !(0.0..=1.0).contains(&rank) {
                                summary.violations.push(Violation::RankOutOfRange {
                                    id: label.clone(),
                                    field: field.clone(),
                                    value: rank,
                                });
                            }
                        }
                        _ => summary.violations.push(Violation::NonNumericValue {
                            id: label.clone(),
                            field: field.clone(),
                        }),
                    }
                    continue;
                }

                let base = field.strip_suffix(LOG_SUFFIX).unwrap_or(field);
                if !tracked.contains(base) {
                    continue;
                }
                match value {
                    Value::Null => {
                        if field == base {
                            summary.metrics.entry(field.clone()).or_insert_with(empty_coverage);
                        }
                    }
                    Value::Number(n) => {
                        if field == base {
                            let coverage =
                                summary.metrics.entry(field.clone()).or_insert_with(empty_coverage);
                            observe(coverage, n.as_f64().unwrap_or(f64::NAN));
                        }
                    }
                    _ => summary.violations.push(Violation::NonNumericValue {
                        id: label.clone(),
                        field: field.clone(),
                    }),
                }
            }
        }

        Ok(summary)
    }
}

impl Default for OutputAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_coverage() -> MetricCoverage {
    MetricCoverage {
        non_null: 0,
        min: None,
        max: None,
    }
}

fn observe(coverage: &mut MetricCoverage, value: f64) {
    coverage.non_null += 1;
    coverage.min = Some(coverage.min.map_or(value, |m| m.min(value)));
    coverage.max = Some(coverage.max.map_or(value, |m| m.max(value)));
}

/// Metrics listed in the metadata as transformed or ranked.
fn tracked_metrics(metadata: &Value) -> HashSet<String> {
    ["log_transformed_metrics", "percentile_ranked_metrics"]
        .iter()
        .filter_map(|key| metadata[*key].as_array())
        .flatten()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}

fn detect_id_field(metadata: &Value, records: &[&Map<String, Value>]) -> Option<String> {
    let first = records.first()?;

    let declared = metadata["geography_level"]
        .as_str()
        .and_then(|level| level.parse::<GeographyLevel>().ok())
        .map(|level| level.id_field())
        .filter(|field| first.contains_key(*field));

    declared
        .or_else(|| ID_FIELDS.iter().copied().find(|field| first.contains_key(*field)))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_document(document: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", document).unwrap();
        file
    }

    #[test]
    fn test_valid_document() -> Result<()> {
        let file = write_document(&serde_json::json!({
            "metadata": {
                "geography_level": "county",
                "record_count": 2,
                "log_transformed_metrics": ["MEDIAN_SALE_PRICE"],
                "percentile_ranked_metrics": ["MEDIAN_SALE_PRICE"],
                "domain_rules": {"removed": 1, "nullified": 0}
            },
            "data": [
                {"COUNTY_FIPS": "25025", "MEDIAN_SALE_PRICE": 400000.0, "MEDIAN_SALE_PRICE_LOG": 12.9, "MEDIAN_SALE_PRICE_RANK": 1.0},
                {"COUNTY_FIPS": "25017", "MEDIAN_SALE_PRICE": null}
            ]
        }));

        let summary = OutputAnalyzer::with_sample_size(1).analyze(file.path())?;

        assert!(summary.is_valid(), "{}", summary.summary());
        assert_eq!(summary.id_field.as_deref(), Some("COUNTY_FIPS"));
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.removed, Some(1));
        assert_eq!(summary.sample.len(), 1);

        let price = &summary.metrics["MEDIAN_SALE_PRICE"];
        assert_eq!(price.non_null, 1);
        assert_eq!(price.coverage_percentage(2), 50.0);
        assert_eq!(summary.ranks["MEDIAN_SALE_PRICE_RANK"].max, Some(1.0));
        Ok(())
    }

    #[test]
    fn test_flags_violations() -> Result<()> {
        let file = write_document(&serde_json::json!({
            "metadata": {"record_count": 5, "percentile_ranked_metrics": ["HOMES_SOLD"]},
            "data": [
                {"ZIP": "02134", "HOMES_SOLD": 12, "HOMES_SOLD_RANK": 1.5},
                {"ZIP": "02134", "HOMES_SOLD": "NaN"},
                {"CITY_NAME": "Nowhere"}
            ]
        }));

        let summary = OutputAnalyzer::new().analyze(file.path())?;

        assert!(!summary.is_valid());
        assert!(summary.violations.contains(&Violation::RecordCountMismatch {
            declared: 5,
            actual: 3
        }));
        assert!(summary.violations.contains(&Violation::DuplicateId {
            id: "02134".to_string()
        }));
        assert!(summary.violations.contains(&Violation::MissingId { index: 2 }));
        assert!(summary.violations.iter().any(|v| matches!(
            v,
            Violation::RankOutOfRange { value, .. } if *value == 1.5
        )));
        assert!(summary.violations.iter().any(|v| matches!(
            v,
            Violation::NonNumericValue { field, .. } if field == "HOMES_SOLD"
        )));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            OutputAnalyzer::new().analyze(Path::new("no/such/output.json")),
            Err(ProcessingError::MissingInput { .. })
        ));
    }
}
