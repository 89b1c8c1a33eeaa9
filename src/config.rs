//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `REDFIN_GEO__*` environment variables (e.g.
//! `REDFIN_GEO__ZIP_MONTHS_CUTOFF=12`, or comma-separated lists for the metric
//! fields).

use crate::error::{ProcessingError, Result};
use crate::models::DomainRule;
use crate::utils::constants::{
    AGGREGATE_METRICS, DEFAULT_PROPERTY_TYPE, DEFAULT_ROW_GROUP_SIZE, ENV_PREFIX,
    LOG_TRANSFORM_METRICS, MAX_VALID_DOM, MEDIAN_DOM, MEDIAN_SALE_PRICE, MIN_VALID_PRICE,
    NUMERIC_SUFFIXES, RANK_METRICS, REDFIN_SOURCE, REDUNDANT_COLUMNS, REGION_FIELD,
    ZIP_KEEP_COLUMNS, ZIP_MONTHS_CUTOFF,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use validator::Validate;

const LIST_KEYS: &[&str] = &[
    "aggregate_metrics",
    "log_transform_metrics",
    "rank_metrics",
    "zip_keep_columns",
    "redundant_columns",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Metrics rolled up from ZIP codes with weighted medians
    #[validate(length(min = 1))]
    pub aggregate_metrics: Vec<String>,

    /// Metrics that get a `ln(1 + x)` companion
    pub log_transform_metrics: Vec<String>,

    /// Metrics that get a percentile-rank companion
    pub rank_metrics: Vec<String>,

    pub domain_rules: Vec<DomainRule>,

    /// ZIP rows older than this many months before the newest period are dropped
    #[validate(range(min = 1, max = 600))]
    pub zip_months_cutoff: u32,

    #[validate(length(min = 1))]
    pub zip_keep_columns: Vec<String>,

    pub redundant_columns: Vec<String>,

    /// Identifier column of Redfin region files
    #[validate(length(min = 1))]
    pub region_id_field: String,

    /// `PROPERTY_TYPE` kept from region files that carry one row per
    /// property type; empty keeps every type
    #[serde(default)]
    pub region_property_type: String,

    #[validate(range(min = 1))]
    pub parquet_row_group_size: usize,

    /// Indent JSON output; off writes one compact line
    pub pretty_json: bool,

    #[validate(length(min = 1))]
    pub source: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregate_metrics: to_strings(AGGREGATE_METRICS),
            log_transform_metrics: to_strings(LOG_TRANSFORM_METRICS),
            rank_metrics: to_strings(RANK_METRICS),
            domain_rules: vec![
                DomainRule::DropRecordBelow {
                    metric: MEDIAN_SALE_PRICE.to_string(),
                    min: MIN_VALID_PRICE,
                },
                DomainRule::NullifyAbove {
                    metric: MEDIAN_DOM.to_string(),
                    max: MAX_VALID_DOM,
                },
            ],
            zip_months_cutoff: ZIP_MONTHS_CUTOFF,
            zip_keep_columns: to_strings(ZIP_KEEP_COLUMNS),
            redundant_columns: to_strings(REDUNDANT_COLUMNS),
            region_id_field: REGION_FIELD.to_string(),
            region_property_type: DEFAULT_PROPERTY_TYPE.to_string(),
            parquet_row_group_size: DEFAULT_ROW_GROUP_SIZE,
            pretty_json: true,
            source: REDFIN_SOURCE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then `path` (must exist when given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&PipelineConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            ProcessingError::ensure_exists(path)?;
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let mut environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let config: PipelineConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validated()
    }

    /// Structural validation plus the checks derive macros can't express.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;

        for rule in &self.domain_rules {
            let threshold = rule.threshold();
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ProcessingError::Config(format!(
                    "Domain rule threshold must be a non-negative number: {}",
                    rule.describe()
                )));
            }
            if rule.metric().is_empty() {
                return Err(ProcessingError::Config(
                    "Domain rule is missing a metric name".to_string(),
                ));
            }
        }

        if self.region_id_field.trim().is_empty() {
            return Err(ProcessingError::Config(
                "region_id_field must not be blank".to_string(),
            ));
        }

        Ok(self)
    }

    /// Property type to keep from region files, if any.
    pub fn region_property_type(&self) -> Option<&str> {
        Some(self.region_property_type.trim()).filter(|t| !t.is_empty())
    }

    /// Every metric any stage touches, in name order.
    pub fn tracked_metrics(&self) -> BTreeSet<String> {
        self.aggregate_metrics
            .iter()
            .chain(&self.log_transform_metrics)
            .chain(&self.rank_metrics)
            .cloned()
            .chain(self.domain_rules.iter().map(|r| r.metric().to_string()))
            .collect()
    }

    /// Region-file columns coerced to numbers: each tracked metric's base name
    /// with its plain, month-over-month and year-over-year variants.
    pub fn numeric_columns(&self) -> BTreeSet<String> {
        self.tracked_metrics()
            .iter()
            .map(|m| base_metric_name(m).to_string())
            .flat_map(|base| {
                NUMERIC_SUFFIXES
                    .iter()
                    .map(move |suffix| format!("{}{}", base, suffix))
            })
            .collect()
    }
}

fn base_metric_name(metric: &str) -> &str {
    metric
        .strip_suffix("_YOY")
        .or_else(|| metric.strip_suffix("_MOM"))
        .unwrap_or(metric)
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default().validated().unwrap();
        assert_eq!(config.zip_months_cutoff, 24);
        assert_eq!(config.domain_rules.len(), 2);
        assert_eq!(config.region_property_type(), Some("All Residential"));
        assert!(config.tracked_metrics().contains("MEDIAN_SALE_PRICE"));
    }

    #[test]
    fn test_numeric_columns_cover_variants() {
        let columns = PipelineConfig::default().numeric_columns();
        assert!(columns.contains("MEDIAN_DOM"));
        assert!(columns.contains("MEDIAN_DOM_MOM"));
        assert!(columns.contains("MEDIAN_SALE_PRICE_YOY"));
        assert!(!columns.contains("MEDIAN_SALE_PRICE_YOY_YOY"));
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let mut config = PipelineConfig::default();
        config.domain_rules.push(DomainRule::NullifyAbove {
            metric: "INVENTORY".to_string(),
            max: -1.0,
        });
        assert!(matches!(config.validated(), Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_blank_property_type_keeps_all() {
        let config = PipelineConfig {
            region_property_type: "  ".to_string(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.region_property_type(), None);
    }

    #[test]
    fn test_rejects_zero_row_group_size() {
        let config = PipelineConfig {
            parquet_row_group_size: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validated(), Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_rejects_empty_aggregate_metrics() {
        let mut config = PipelineConfig::default();
        config.aggregate_metrics.clear();
        assert!(matches!(config.validated(), Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "zip_months_cutoff = 12")?;
        writeln!(file, "aggregate_metrics = [\"MEDIAN_SALE_PRICE\"]")?;

        let config = PipelineConfig::load(Some(file.path()))?;
        assert_eq!(config.zip_months_cutoff, 12);
        assert_eq!(config.aggregate_metrics, vec!["MEDIAN_SALE_PRICE".to_string()]);
        // Untouched keys keep their defaults
        assert_eq!(config.region_id_field, "REGION");
        assert_eq!(config.domain_rules, PipelineConfig::default().domain_rules);

        Ok(())
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let result = PipelineConfig::load(Some(Path::new("does/not/exist.toml")));
        match result {
            Err(ProcessingError::MissingInput { path }) => {
                assert_eq!(path, Path::new("does/not/exist.toml"));
            }
            other => panic!("expected MissingInput, got {:?}", other),
        }
    }
}
