use crate::models::DomainRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Provenance block written next to the `data` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub source: String,
    pub geography_level: String,
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_period: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_method: Option<String>,

    pub log_transformed_metrics: Vec<String>,
    pub percentile_ranked_metrics: Vec<String>,

    #[serde(default)]
    pub skewness: BTreeMap<String, SkewnessChange>,

    #[serde(default)]
    pub rank_distribution: BTreeMap<String, RankDistribution>,

    pub domain_rules: DomainRuleReport,

    #[serde(default)]
    pub input: InputReport,

    /// Metadata block of a Redfin region file, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_metadata: Option<Value>,

    #[serde(default)]
    pub usage_instructions: UsageInstructions,
}

/// Skewness of a metric before and after `ln(1 + x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewnessChange {
    pub before: Option<f64>,
    pub after: Option<f64>,
    pub improvement: Option<f64>,
}

impl SkewnessChange {
    pub fn new(before: Option<f64>, after: Option<f64>) -> Self {
        let improvement = match (before, after) {
            (Some(b), Some(a)) => Some(b.abs() - a.abs()),
            _ => None,
        };
        Self {
            before,
            after,
            improvement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankDistribution {
    pub min_rank: f64,
    pub max_rank: f64,
    pub median_rank: f64,
    pub unique_ranks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRuleReport {
    pub removed: usize,
    pub nullified: usize,
    #[serde(default)]
    pub rules: Vec<DomainRule>,
}

/// What was skipped or collapsed before the numeric stages ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReport {
    pub source_rows: usize,
    pub skipped_rows: usize,
    pub unmatched_zips: usize,
    pub stale_rows: usize,
    pub duplicate_rows: usize,
    #[serde(default)]
    pub property_type_rows: usize,
    pub empty_groups: usize,
}

impl InputReport {
    /// Fold another report in (e.g. reader counts into pipeline counts).
    pub fn merge(&mut self, other: &InputReport) {
        self.source_rows += other.source_rows;
        self.skipped_rows += other.skipped_rows;
        self.unmatched_zips += other.unmatched_zips;
        self.stale_rows += other.stale_rows;
        self.duplicate_rows += other.duplicate_rows;
        self.property_type_rows += other.property_type_rows;
        self.empty_groups += other.empty_groups;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageInstructions {
    pub for_visualization: String,
    pub for_display: String,
    pub alternative_viz: String,
}

impl Default for UsageInstructions {
    fn default() -> Self {
        Self {
            for_visualization: "Use *_RANK columns for smooth color gradients (0.0-1.0)".to_string(),
            for_display: "Use original columns in tooltips/labels (real values)".to_string(),
            alternative_viz: "Use *_LOG columns for log-scale visualization".to_string(),
        }
    }
}
