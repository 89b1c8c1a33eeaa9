use crate::models::{AggregatedRecord, DomainRule, DomainRuleReport};
use tracing::{info, warn};

/// Applies validity rules to ranked records.
pub struct DomainFilter {
    rules: Vec<DomainRule>,
}

impl DomainFilter {
    pub fn new(rules: Vec<DomainRule>) -> Self {
        Self { rules }
    }

    /// Drop or correct implausible values in place.
    ///
    /// `DropRecordBelow` removes the record when the metric is present and
    /// below the floor. `NullifyAbove` nulls the metric and its companions
    /// and keeps the record. A null metric never triggers either rule.
    pub fn apply(&self, records: &mut Vec<AggregatedRecord>) -> DomainRuleReport {
        let mut report = DomainRuleReport {
            rules: self.rules.clone(),
            ..Default::default()
        };

        for rule in &self.rules {
            match rule {
                DomainRule::DropRecordBelow { metric, min } => {
                    let before = records.len();
                    records.retain(|record| record.metric(metric).map_or(true, |v| v >= *min));
                    let removed = before - records.len();
                    if removed > 0 {
                        warn!("Removed {} records with {} < {}", removed, metric, min);
                    }
                    report.removed += removed;
                }
                DomainRule::NullifyAbove { metric, max } => {
                    let mut nullified = 0;
                    for record in records.iter_mut() {
                        if record.metric(metric).map_or(false, |v| v > *max)
                            && record.nullify_metric(metric)
                        {
                            nullified += 1;
                        }
                    }
                    if nullified > 0 {
                        warn!("Nullified {} {} values > {}", nullified, metric, max);
                    }
                    report.nullified += nullified;
                }
            }
        }

        info!(
            "Domain rules: {} records removed, {} values nullified",
            report.removed, report.nullified
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{MAX_VALID_DOM, MEDIAN_DOM, MEDIAN_SALE_PRICE, MIN_VALID_PRICE};

    fn default_rules() -> Vec<DomainRule> {
        vec![
            DomainRule::DropRecordBelow {
                metric: MEDIAN_SALE_PRICE.to_string(),
                min: MIN_VALID_PRICE,
            },
            DomainRule::NullifyAbove {
                metric: MEDIAN_DOM.to_string(),
                max: MAX_VALID_DOM,
            },
        ]
    }

    fn record(id: &str, price: Option<f64>, dom: Option<f64>) -> AggregatedRecord {
        let mut record = AggregatedRecord::new("ZIP", id)
            .with_metric(MEDIAN_SALE_PRICE, price)
            .with_metric(MEDIAN_DOM, dom);
        if let Some(dom) = dom {
            record.log_values.insert(MEDIAN_DOM.to_string(), Some(dom.ln_1p()));
            record.ranks.insert(MEDIAN_DOM.to_string(), Some(1.0));
        }
        record
    }

    #[test]
    fn test_price_floor_drops_record() {
        let mut records = vec![
            record("00001", Some(5_000.0), Some(20.0)),
            record("00002", Some(10_000.0), Some(20.0)),
            record("00003", None, Some(20.0)),
        ];

        let report = DomainFilter::new(default_rules()).apply(&mut records);

        let ids: Vec<&str> = records.iter().map(|r| r.geo_id.as_str()).collect();
        assert_eq!(ids, vec!["00002", "00003"]);
        assert_eq!(report.removed, 1);
        assert_eq!(report.nullified, 0);
        assert_eq!(report.rules.len(), 2);
    }

    #[test]
    fn test_dom_ceiling_nullifies_field_and_companions() {
        let mut records = vec![
            record("00001", Some(250_000.0), Some(1_000.0)),
            record("00002", Some(250_000.0), Some(730.0)),
        ];

        let report = DomainFilter::new(default_rules()).apply(&mut records);

        assert_eq!(records.len(), 2);
        assert_eq!(report.nullified, 1);
        let flagged = &records[0];
        assert_eq!(flagged.metric(MEDIAN_DOM), None);
        assert!(flagged.log_values.contains_key(MEDIAN_DOM));
        assert_eq!(flagged.log_value(MEDIAN_DOM), None);
        assert!(flagged.ranks.contains_key(MEDIAN_DOM));
        assert_eq!(flagged.rank(MEDIAN_DOM), None);
        assert_eq!(records[1].metric(MEDIAN_DOM), Some(730.0));
    }
}
