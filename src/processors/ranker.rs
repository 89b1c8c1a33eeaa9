use crate::models::{AggregatedRecord, RankDistribution};
use crate::utils::{median, percentile_ranks};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct RankReport {
    pub metrics: Vec<String>,
    pub distribution: BTreeMap<String, RankDistribution>,
}

/// Adds `<metric>_RANK` percentile ranks in `(0, 1]`.
///
/// Ties share the average of the ranks they span, and records with a null
/// base value get no rank field at all.
pub struct Ranker {
    metrics: Vec<String>,
}

impl Ranker {
    pub fn new(metrics: Vec<String>) -> Self {
        Self { metrics }
    }

    pub fn rank(&self, records: &mut [AggregatedRecord]) -> RankReport {
        let mut report = RankReport::default();

        for metric in &self.metrics {
            let column: Vec<Option<f64>> = records.iter().map(|r| r.metric(metric)).collect();
            if !column.iter().flatten().any(|v| v.is_finite()) {
                debug!("No values for {}, skipping rank", metric);
                continue;
            }

            let ranks = percentile_ranks(&column);
            for (record, rank) in records.iter_mut().zip(ranks.iter()) {
                match rank {
                    Some(rank) => {
                        record.ranks.insert(metric.clone(), Some(*rank));
                    }
                    None => {
                        record.ranks.remove(metric);
                    }
                }
            }

            let assigned: Vec<f64> = ranks.iter().flatten().copied().collect();
            if let Some(distribution) = distribution_of(&assigned) {
                report.distribution.insert(metric.clone(), distribution);
            }
            report.metrics.push(metric.clone());
        }

        info!("Percentile-ranked {} metrics", report.metrics.len());
        report
    }
}

fn distribution_of(ranks: &[f64]) -> Option<RankDistribution> {
    let min_rank = ranks.iter().copied().min_by(|a, b| a.total_cmp(b))?;
    let max_rank = ranks.iter().copied().max_by(|a, b| a.total_cmp(b))?;
    let unique_ranks = ranks.iter().map(|r| r.to_bits()).collect::<BTreeSet<_>>().len();

    Some(RankDistribution {
        min_rank,
        max_rank,
        median_rank: median(ranks)?,
        unique_ranks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: &[Option<f64>]) -> Vec<AggregatedRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| AggregatedRecord::new("STATE_FIPS", format!("{:02}", i)).with_metric("HOMES_SOLD", *v))
            .collect()
    }

    fn ranker() -> Ranker {
        Ranker::new(vec!["HOMES_SOLD".to_string()])
    }

    #[test]
    fn test_average_rank_for_ties() {
        let mut data = records(&[Some(10.0), Some(20.0), Some(20.0), Some(40.0)]);
        let report = ranker().rank(&mut data);

        let ranks: Vec<Option<f64>> = data.iter().map(|r| r.rank("HOMES_SOLD")).collect();
        assert_eq!(ranks, vec![Some(0.25), Some(0.625), Some(0.625), Some(1.0)]);

        let distribution = report.distribution["HOMES_SOLD"];
        assert_eq!(distribution.min_rank, 0.25);
        assert_eq!(distribution.max_rank, 1.0);
        assert_eq!(distribution.unique_ranks, 3);
    }

    #[test]
    fn test_null_values_get_no_rank_field() {
        let mut data = records(&[Some(5.0), None, Some(1.0)]);
        ranker().rank(&mut data);

        assert!(!data[1].ranks.contains_key("HOMES_SOLD"));
        assert_eq!(data[0].rank("HOMES_SOLD"), Some(1.0));
        assert_eq!(data[2].rank("HOMES_SOLD"), Some(0.5));
    }

    #[test]
    fn test_single_record_ranks_one() {
        let mut data = records(&[Some(400_000.0)]);
        ranker().rank(&mut data);
        assert_eq!(data[0].rank("HOMES_SOLD"), Some(1.0));
    }

    #[test]
    fn test_independent_of_record_order() {
        let values = [Some(3.0), Some(1.0), None, Some(3.0), Some(2.0), Some(9.0)];
        let mut forward = records(&values);
        ranker().rank(&mut forward);

        let mut reversed: Vec<AggregatedRecord> = records(&values).into_iter().rev().collect();
        ranker().rank(&mut reversed);
        reversed.reverse();

        assert_eq!(forward, reversed);
        for record in &forward {
            if let Some(rank) = record.rank("HOMES_SOLD") {
                assert!((0.0..=1.0).contains(&rank));
            }
        }
    }

    #[test]
    fn test_all_null_metric_skipped() {
        let mut data = records(&[None, None]);
        let report = ranker().rank(&mut data);
        assert!(report.metrics.is_empty());
        assert!(!data[0].ranks.contains_key("HOMES_SOLD"));
    }
}
