//! Stage orchestration for the three output paths.
//!
//! ```text
//! ZIP JSON ──► Aggregator ──┐
//! ZIP rows ──► PeriodFilter ┼─► Transformer ─► Ranker ─► DomainFilter ─► ProcessedDataset
//! regions  ──► PeriodFilter ┘
//! ```

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{
    AggregatedRecord, Crosswalk, GeographyLevel, InputReport, OutputMetadata, UsageInstructions,
    ZipRecord,
};
use crate::processors::{Aggregator, DomainFilter, PeriodFilter, Ranker, Transformer};
use crate::readers::{coerce_f64, coerce_string, RawRow};
use crate::utils::constants::{AGGREGATION_METHOD, PERIOD_END_FIELD};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A finished output document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDataset {
    pub metadata: OutputMetadata,
    #[serde(rename = "data")]
    pub records: Vec<AggregatedRecord>,
}

/// Metadata fields known before the numeric stages run.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    pub level: String,
    pub source: String,
    pub aggregation_method: Option<String>,
    pub latest_period: Option<String>,
    pub input: InputReport,
    pub original_metadata: Option<Value>,
}

pub struct GeoPipeline {
    config: PipelineConfig,
}

impl GeoPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Roll ZIP records up to `level` and run the shared stages.
    pub fn aggregate_level(
        &self,
        zips: &[ZipRecord],
        crosswalk: &Crosswalk,
        level: GeographyLevel,
        input: &InputReport,
    ) -> Result<ProcessedDataset> {
        info!("Aggregating {} ZIP records to {} level", zips.len(), level.display_name());

        let outcome = Aggregator::new(self.config.aggregate_metrics.clone())
            .aggregate(zips, crosswalk, level)?;

        let mut report = input.clone();
        report.merge(&InputReport {
            unmatched_zips: outcome.unmatched_zips,
            empty_groups: outcome.empty_groups,
            ..Default::default()
        });

        let latest_period = outcome
            .records
            .iter()
            .filter_map(|r| r.period_end.as_deref())
            .max()
            .map(|p| p.chars().take(10).collect());

        self.finalize(
            outcome.records,
            DatasetContext {
                level: level.slug().to_string(),
                source: format!("{} (aggregated from ZIP codes)", self.config.source),
                aggregation_method: Some(AGGREGATION_METHOD.to_string()),
                latest_period,
                input: report,
                original_metadata: None,
            },
        )
    }

    /// Reduce a ZIP time series to one current row per ZIP and run the
    /// shared stages. Output is ordered newest period first, then by ZIP.
    pub fn process_zip_level(
        &self,
        records: Vec<ZipRecord>,
        input: &InputReport,
    ) -> Result<ProcessedDataset> {
        let outcome = PeriodFilter::new(self.config.zip_months_cutoff).latest_per_zip(records);

        let mut report = input.clone();
        report.merge(&InputReport {
            duplicate_rows: outcome.duplicate_rows,
            stale_rows: outcome.stale_rows,
            skipped_rows: outcome.skipped_rows,
            ..Default::default()
        });

        let keep: BTreeSet<String> = self
            .config
            .zip_keep_columns
            .iter()
            .map(|c| c.to_uppercase())
            .collect();

        let records = outcome
            .records
            .into_iter()
            .map(|mut record| {
                record.metrics.retain(|name, _| keep.contains(name));
                record.attributes.retain(|name, _| keep.contains(name));
                AggregatedRecord::from_zip_record(record)
            })
            .collect();

        self.finalize(
            records,
            DatasetContext {
                level: GeographyLevel::Zip.slug().to_string(),
                source: self.config.source.clone(),
                aggregation_method: None,
                latest_period: outcome.latest_period.map(|d| d.to_string()),
                input: report,
                original_metadata: None,
            },
        )
    }

    /// Keep the latest period of a Redfin region file, drop redundant
    /// columns and run the shared stages. Output is ordered by region id.
    pub fn process_region_level(
        &self,
        rows: Vec<RawRow>,
        level: GeographyLevel,
        original_metadata: Option<Value>,
        input: &InputReport,
    ) -> Result<ProcessedDataset> {
        let id_field = self.config.region_id_field.to_uppercase();
        let outcome = PeriodFilter::new(self.config.zip_months_cutoff).latest_period_only(
            rows,
            &id_field,
            self.config.region_property_type(),
        );

        let mut report = input.clone();
        report.merge(&InputReport {
            stale_rows: outcome.removed_rows,
            property_type_rows: outcome.property_type_rows,
            duplicate_rows: outcome.duplicate_rows,
            ..Default::default()
        });

        let redundant: BTreeSet<String> = self
            .config
            .redundant_columns
            .iter()
            .map(|c| c.to_uppercase())
            .collect();
        let numeric = self.config.numeric_columns();

        let mut dropped_columns = BTreeSet::new();
        let mut records = Vec::with_capacity(outcome.rows.len());
        for row in outcome.rows {
            let Some(geo_id) = row.get(&id_field).and_then(coerce_string) else {
                report.skipped_rows += 1;
                continue;
            };

            let mut record = AggregatedRecord::new(id_field.clone(), geo_id);
            for (column, value) in row {
                if column == id_field {
                    continue;
                }
                if redundant.contains(&column) {
                    dropped_columns.insert(column);
                    continue;
                }
                if column == PERIOD_END_FIELD {
                    record.period_end = coerce_string(&value);
                } else if numeric.contains(&column) {
                    record.metrics.insert(column, coerce_f64(&value));
                } else {
                    record.attributes.insert(column, value);
                }
            }
            records.push(record);
        }

        if !dropped_columns.is_empty() {
            debug!("Dropped redundant columns: {:?}", dropped_columns);
        }
        if report.skipped_rows > input.skipped_rows {
            warn!(
                "{} region rows had no {} value",
                report.skipped_rows - input.skipped_rows,
                id_field
            );
        }

        records.sort_by(|a, b| a.geo_id.cmp(&b.geo_id));

        self.finalize(
            records,
            DatasetContext {
                level: level.slug().to_string(),
                source: self.config.source.clone(),
                aggregation_method: None,
                latest_period: outcome.latest_period,
                input: report,
                original_metadata,
            },
        )
    }

    /// Transform, rank and filter `records`, then assemble the metadata.
    pub fn finalize(
        &self,
        mut records: Vec<AggregatedRecord>,
        context: DatasetContext,
    ) -> Result<ProcessedDataset> {
        let transform = Transformer::new(self.config.log_transform_metrics.clone())
            .transform(&mut records)?;
        let ranking = Ranker::new(self.config.rank_metrics.clone()).rank(&mut records);
        let domain_rules = DomainFilter::new(self.config.domain_rules.clone()).apply(&mut records);

        info!(
            "{} level: {} records ({} removed, {} values nullified)",
            context.level,
            records.len(),
            domain_rules.removed,
            domain_rules.nullified
        );

        let metadata = OutputMetadata {
            source: context.source,
            geography_level: context.level,
            generated_at: Utc::now(),
            record_count: records.len(),
            latest_period: context.latest_period,
            aggregation_method: context.aggregation_method,
            log_transformed_metrics: transform.metrics,
            percentile_ranked_metrics: ranking.metrics,
            skewness: transform.skewness,
            rank_distribution: ranking.distribution,
            domain_rules,
            input: context.input,
            original_metadata: context.original_metadata,
            usage_instructions: UsageInstructions::default(),
        };

        Ok(ProcessedDataset { metadata, records })
    }
}
