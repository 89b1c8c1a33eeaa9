use crate::error::{ProcessingError, Result};
use crate::models::{parse_period, AggregatedRecord, Crosswalk, CrosswalkEntry, GeographyLevel, ZipRecord};
use crate::utils::constants::{COUNTY_NAME_FIELD, STATE_NAME_FIELD};
use crate::utils::weighted_median;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Aggregated records plus the join bookkeeping.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    /// Sorted by geography id
    pub records: Vec<AggregatedRecord>,
    pub unmatched_zips: usize,
    pub empty_groups: usize,
}

/// Rolls ZIP records up to a larger geography with population-weighted
/// medians.
pub struct Aggregator {
    metrics: Vec<String>,
}

impl Aggregator {
    pub fn new(metrics: Vec<String>) -> Self {
        Self { metrics }
    }

    /// One record per geography id reached through the crosswalk.
    ///
    /// ZIPs missing from the crosswalk, or without an id at `level`, are
    /// counted as unmatched. Groups where every metric ends up null are
    /// not emitted.
    pub fn aggregate(
        &self,
        zips: &[ZipRecord],
        crosswalk: &Crosswalk,
        level: GeographyLevel,
    ) -> Result<AggregationOutcome> {
        if level == GeographyLevel::Zip {
            return Err(ProcessingError::Config(
                "ZIP codes are the aggregation input, not a target level".to_string(),
            ));
        }

        let mut outcome = AggregationOutcome::default();
        let mut groups: BTreeMap<&str, Vec<(&ZipRecord, &CrosswalkEntry)>> = BTreeMap::new();

        for record in zips {
            let matched = crosswalk
                .resolve(&record.zip, level)
                .and_then(|entry| entry.geo_id(level).map(|id| (id, entry)));

            match matched {
                Some((geo_id, entry)) => groups.entry(geo_id).or_default().push((record, entry)),
                None => {
                    debug!("ZIP {} has no {} in the crosswalk", record.zip, level);
                    outcome.unmatched_zips += 1;
                }
            }
        }

        if outcome.unmatched_zips > 0 {
            warn!(
                "{} of {} ZIP records could not be matched to a {}",
                outcome.unmatched_zips,
                zips.len(),
                level.display_name()
            );
        }

        for (geo_id, members) in groups {
            match self.aggregate_group(geo_id, &members, level) {
                Some(record) => outcome.records.push(record),
                None => {
                    debug!("{} {} has no metric values, dropped", level, geo_id);
                    outcome.empty_groups += 1;
                }
            }
        }

        info!(
            "Aggregated {} ZIP records into {} {} records",
            zips.len() - outcome.unmatched_zips,
            outcome.records.len(),
            level.display_name()
        );

        Ok(outcome)
    }

    fn aggregate_group(
        &self,
        geo_id: &str,
        members: &[(&ZipRecord, &CrosswalkEntry)],
        level: GeographyLevel,
    ) -> Option<AggregatedRecord> {
        let weights: Vec<Option<f64>> = members.iter().map(|(_, entry)| Some(entry.weight())).collect();

        let mut record = AggregatedRecord::new(level.id_field(), geo_id);
        for metric in &self.metrics {
            let values: Vec<Option<f64>> = members.iter().map(|(zip, _)| zip.metric(metric)).collect();
            record
                .metrics
                .insert(metric.clone(), weighted_median(&values, &weights));
        }

        if record.metrics.values().all(Option::is_none) {
            return None;
        }

        record.zip_count = Some(members.len());
        record.total_population = Some(weights.iter().flatten().sum::<f64>().trunc().max(0.0) as u64);
        record.period_end = members
            .iter()
            .filter_map(|(zip, _)| zip.period_end.as_deref())
            .filter_map(|raw| parse_period(raw).map(|date| (date, raw)))
            .max_by_key(|(date, _)| *date)
            .map(|(_, raw)| raw.to_string());

        // A CBSA can span states, so it carries no single state name
        if matches!(level, GeographyLevel::State | GeographyLevel::County) {
            if let Some(name) = members.iter().find_map(|(_, e)| e.state_name.as_deref()) {
                record
                    .attributes
                    .insert(STATE_NAME_FIELD.to_string(), Value::from(name));
            }
        }
        if level == GeographyLevel::County {
            if let Some(name) = members.iter().find_map(|(_, e)| e.county_name.as_deref()) {
                record
                    .attributes
                    .insert(COUNTY_NAME_FIELD.to_string(), Value::from(name));
            }
        }

        Some(record)
    }
}
