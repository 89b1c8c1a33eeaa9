use crate::error::{ProcessingError, Result};
use crate::models::{AggregatedRecord, SkewnessChange};
use crate::utils::skewness;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Metrics that were transformed and their skewness before and after.
#[derive(Debug, Default)]
pub struct TransformReport {
    pub metrics: Vec<String>,
    pub skewness: BTreeMap<String, SkewnessChange>,
}

/// Adds `<metric>_LOG = ln(1 + value)` companions.
pub struct Transformer {
    metrics: Vec<String>,
}

impl Transformer {
    pub fn new(metrics: Vec<String>) -> Self {
        Self { metrics }
    }

    /// Transform every configured metric with at least one value.
    ///
    /// Fails on the first negative or non-finite input: `ln(1 + x)` is
    /// undefined there and such a value means the upstream data is broken.
    /// Records are left untouched on failure.
    pub fn transform(&self, records: &mut [AggregatedRecord]) -> Result<TransformReport> {
        let mut report = TransformReport::default();

        for metric in &self.metrics {
            let values: Vec<f64> = records.iter().filter_map(|r| r.metric(metric)).collect();
            if values.is_empty() {
                debug!("No values for {}, skipping log transform", metric);
                continue;
            }

            if let Some(bad) = records.iter().find(|r| {
                r.metrics
                    .get(metric)
                    .copied()
                    .flatten()
                    .map_or(false, |v| !v.is_finite() || v < 0.0)
            }) {
                return Err(ProcessingError::NegativeLogInput {
                    metric: metric.clone(),
                    geo_id: bad.geo_id.clone(),
                    value: bad.metric(metric).unwrap_or(f64::NAN),
                });
            }

            let mut transformed = Vec::with_capacity(values.len());
            for record in records.iter_mut() {
                let log_value = record.metric(metric).map(f64::ln_1p);
                if let Some(v) = log_value {
                    transformed.push(v);
                }
                record.log_values.insert(metric.clone(), log_value);
            }

            let change = SkewnessChange::new(skewness(&values), skewness(&transformed));
            debug!(
                "{}: skewness {:?} -> {:?}",
                metric, change.before, change.after
            );
            report.skewness.insert(metric.clone(), change);
            report.metrics.push(metric.clone());
        }

        info!("Log-transformed {} metrics", report.metrics.len());
        Ok(report)
    }
}
