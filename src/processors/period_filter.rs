use crate::models::{parse_period, ZipRecord};
use crate::readers::{coerce_string, RawRow};
use crate::utils::constants::{PERIOD_END_FIELD, PROPERTY_TYPE_FIELD};
use chrono::{Duration, NaiveDate};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Result of collapsing a ZIP time series to one current row per ZIP.
#[derive(Debug, Default)]
pub struct ZipPeriodOutcome {
    /// Sorted newest period first, then by ZIP
    pub records: Vec<ZipRecord>,
    pub latest_period: Option<NaiveDate>,
    pub duplicate_rows: usize,
    pub stale_rows: usize,
    pub skipped_rows: usize,
}

/// Result of keeping only the newest period of a region file.
#[derive(Debug, Default)]
pub struct RegionPeriodOutcome {
    pub rows: Vec<RawRow>,
    pub latest_period: Option<String>,
    /// Rows from older (or unparseable) periods
    pub removed_rows: usize,
    /// Rows of a property type other than the requested one
    pub property_type_rows: usize,
    pub duplicate_rows: usize,
}

/// Reduces time series inputs to their latest period.
pub struct PeriodFilter {
    months_cutoff: u32,
}

impl PeriodFilter {
    pub fn new(months_cutoff: u32) -> Self {
        Self { months_cutoff }
    }

    /// Keep the latest row per ZIP, then drop ZIPs whose latest row is older
    /// than `months_cutoff` months (30-day months) before the newest period.
    ///
    /// When a ZIP has several rows for its latest period the one that comes
    /// last in the input wins. Rows without a parseable period are skipped.
    pub fn latest_per_zip(&self, records: Vec<ZipRecord>) -> ZipPeriodOutcome {
        let mut outcome = ZipPeriodOutcome::default();
        let mut with_period = 0usize;
        let mut latest: HashMap<String, (NaiveDate, ZipRecord)> = HashMap::new();

        for record in records {
            let Some(date) = record.period_date() else {
                debug!("ZIP {} has no parseable period, skipping", record.zip);
                outcome.skipped_rows += 1;
                continue;
            };
            with_period += 1;

            match latest.get(&record.zip) {
                Some((current, _)) if *current > date => {}
                _ => {
                    latest.insert(record.zip.clone(), (date, record));
                }
            }
        }

        outcome.duplicate_rows = with_period - latest.len();
        outcome.latest_period = latest.values().map(|(date, _)| *date).max();

        let Some(max_period) = outcome.latest_period else {
            warn!("No ZIP rows with a parseable period");
            return outcome;
        };
        let cutoff = max_period - Duration::days(30 * i64::from(self.months_cutoff));

        let mut kept: Vec<(NaiveDate, ZipRecord)> = Vec::with_capacity(latest.len());
        for (_, (date, record)) in latest {
            if date >= cutoff {
                kept.push((date, record));
            } else {
                outcome.stale_rows += 1;
            }
        }

        kept.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.zip.cmp(&b.1.zip)));
        outcome.records = kept.into_iter().map(|(_, record)| record).collect();

        info!(
            "Latest period {}: {} active ZIPs, {} stale (before {}), {} duplicate rows collapsed",
            max_period,
            outcome.records.len(),
            outcome.stale_rows,
            cutoff,
            outcome.duplicate_rows
        );

        outcome
    }

    /// Keep only region rows from the newest period in the file.
    ///
    /// Files without a `PERIOD_END` column keep every period. When
    /// `property_type` is given and the rows carry a `PROPERTY_TYPE` column,
    /// only rows of that type are kept. Ids still repeated after that keep
    /// the row whose serialized content sorts first, so the result does not
    /// depend on input order. Rows come back ordered by id.
    pub fn latest_period_only(
        &self,
        rows: Vec<RawRow>,
        id_field: &str,
        property_type: Option<&str>,
    ) -> RegionPeriodOutcome {
        let mut outcome = RegionPeriodOutcome::default();

        let has_period = rows.iter().any(|row| row.contains_key(PERIOD_END_FIELD));
        let mut candidates = if has_period {
            let dated: Vec<(Option<NaiveDate>, RawRow)> = rows
                .into_iter()
                .map(|row| (row_period(&row), row))
                .collect();

            let Some(latest) = dated.iter().filter_map(|(date, _)| *date).max() else {
                warn!("No parseable {} values; keeping no region rows", PERIOD_END_FIELD);
                outcome.removed_rows = dated.len();
                return outcome;
            };
            outcome.latest_period = Some(latest.to_string());

            let mut kept = Vec::new();
            for (date, row) in dated {
                if date == Some(latest) {
                    kept.push(row);
                } else {
                    outcome.removed_rows += 1;
                }
            }
            kept
        } else {
            debug!("No {} column, keeping all region rows", PERIOD_END_FIELD);
            rows
        };

        if let Some(wanted) = property_type {
            candidates = Self::keep_property_type(candidates, wanted, &mut outcome);
        }

        let mut by_id: BTreeMap<String, (String, RawRow)> = BTreeMap::new();
        let mut without_id = Vec::new();
        for row in candidates {
            let Some(id) = row.get(id_field).and_then(coerce_string) else {
                without_id.push(row);
                continue;
            };
            let content = serde_json::to_string(&row).unwrap_or_default();

            match by_id.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert((content, row));
                }
                Entry::Occupied(mut slot) => {
                    outcome.duplicate_rows += 1;
                    if content < slot.get().0 {
                        slot.insert((content, row));
                    }
                }
            }
        }
        outcome.rows = by_id.into_values().map(|(_, row)| row).collect();
        outcome.rows.extend(without_id);

        info!(
            "Kept {} region rows for period {} ({} older rows removed, {} other property types, {} duplicates)",
            outcome.rows.len(),
            outcome.latest_period.as_deref().unwrap_or("n/a"),
            outcome.removed_rows,
            outcome.property_type_rows,
            outcome.duplicate_rows
        );

        outcome
    }

    fn keep_property_type(
        rows: Vec<RawRow>,
        wanted: &str,
        outcome: &mut RegionPeriodOutcome,
    ) -> Vec<RawRow> {
        let type_of = |row: &RawRow| row.get(PROPERTY_TYPE_FIELD).and_then(coerce_string);

        if !rows.iter().any(|row| type_of(row).is_some()) {
            return rows;
        }
        if !rows
            .iter()
            .any(|row| type_of(row).map_or(false, |t| t.eq_ignore_ascii_case(wanted)))
        {
            warn!(
                "No region rows with {} '{}', keeping every property type",
                PROPERTY_TYPE_FIELD, wanted
            );
            return rows;
        }

        let (kept, other): (Vec<RawRow>, Vec<RawRow>) = rows
            .into_iter()
            .partition(|row| type_of(row).map_or(false, |t| t.eq_ignore_ascii_case(wanted)));
        outcome.property_type_rows = other.len();
        kept
    }
}

fn row_period(row: &RawRow) -> Option<NaiveDate> {
    row.get(PERIOD_END_FIELD)
        .and_then(coerce_string)
        .and_then(|raw| parse_period(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zip(zip: &str, period: &str, price: f64) -> ZipRecord {
        ZipRecord::new(zip)
            .with_period(period)
            .with_metric("MEDIAN_SALE_PRICE", Some(price))
    }

    #[test]
    fn test_latest_per_zip_keeps_newest_row() {
        let records = vec![
            zip("02134", "2024-04-30", 1.0),
            zip("02134", "2024-06-30", 2.0),
            zip("02134", "2024-05-31", 3.0),
            zip("10001", "2024-06-30", 4.0),
        ];

        let outcome = PeriodFilter::new(24).latest_per_zip(records);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.duplicate_rows, 2);
        assert_eq!(outcome.records[0].zip, "02134");
        assert_eq!(outcome.records[0].metric("MEDIAN_SALE_PRICE"), Some(2.0));
        assert_eq!(outcome.latest_period, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_same_period_later_row_wins() {
        let records = vec![
            zip("02134", "2024-06-30", 1.0),
            zip("02134", "2024-06-30", 2.0),
        ];
        let outcome = PeriodFilter::new(24).latest_per_zip(records);
        assert_eq!(outcome.records[0].metric("MEDIAN_SALE_PRICE"), Some(2.0));
    }

    #[test]
    fn test_stale_zips_dropped() {
        let records = vec![
            zip("02134", "2024-06-30", 1.0),
            // 24 × 30 = 720 days before 2024-06-30 is 2022-07-11
            zip("59001", "2022-07-10", 2.0),
            zip("59002", "2022-07-11", 3.0),
            ZipRecord::new("99999"),
        ];

        let outcome = PeriodFilter::new(24).latest_per_zip(records);

        let zips: Vec<&str> = outcome.records.iter().map(|r| r.zip.as_str()).collect();
        assert_eq!(zips, vec!["02134", "59002"]);
        assert_eq!(outcome.stale_rows, 1);
        assert_eq!(outcome.skipped_rows, 1);
    }

    #[test]
    fn test_latest_period_only() {
        let rows: Vec<RawRow> = vec![
            json!({"REGION": "Ohio", "PERIOD_END": "2024-05-31"}),
            json!({"REGION": "Ohio", "PERIOD_END": "2024-06-30"}),
            json!({"REGION": "Utah", "PERIOD_END": "2024-06-30"}),
            json!({"REGION": "Utah", "PERIOD_END": "2024-06-30"}),
            json!({"REGION": "Iowa", "PERIOD_END": "unknown"}),
        ]
        .into_iter()
        .filter_map(crate::readers::row_from_value)
        .collect();

        let outcome = PeriodFilter::new(24).latest_period_only(rows, "REGION", None);

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.latest_period.as_deref(), Some("2024-06-30"));
        assert_eq!(outcome.removed_rows, 2);
        assert_eq!(outcome.duplicate_rows, 1);
    }

    #[test]
    fn test_latest_period_only_without_period_column() {
        let rows: Vec<RawRow> = vec![json!({"REGION": "Ohio"}), json!({"REGION": "Utah"})]
            .into_iter()
            .filter_map(crate::readers::row_from_value)
            .collect();

        let outcome = PeriodFilter::new(24).latest_period_only(rows, "REGION", None);
        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.latest_period.is_none());
    }

    fn ohio_rows(reversed: bool) -> Vec<RawRow> {
        let mut values = vec![
            json!({"REGION": "Ohio", "PERIOD_END": "2024-06-30", "PROPERTY_TYPE": "All Residential", "MEDIAN_SALE_PRICE": 250000}),
            json!({"REGION": "Ohio", "PERIOD_END": "2024-06-30", "PROPERTY_TYPE": "Condo/Co-op", "MEDIAN_SALE_PRICE": 150000}),
        ];
        if reversed {
            values.reverse();
        }
        values
            .into_iter()
            .filter_map(crate::readers::row_from_value)
            .collect()
    }

    #[test]
    fn test_property_type_selected_regardless_of_order() {
        let filter = PeriodFilter::new(24);

        for reversed in [false, true] {
            let outcome =
                filter.latest_period_only(ohio_rows(reversed), "REGION", Some("all residential"));
            assert_eq!(outcome.rows.len(), 1);
            assert_eq!(outcome.rows[0]["MEDIAN_SALE_PRICE"], json!(250000));
            assert_eq!(outcome.property_type_rows, 1);
            assert_eq!(outcome.duplicate_rows, 0);
        }
    }

    #[test]
    fn test_duplicates_resolved_by_content_not_order() {
        let filter = PeriodFilter::new(24);

        let forward = filter.latest_period_only(ohio_rows(false), "REGION", None);
        let backward = filter.latest_period_only(ohio_rows(true), "REGION", None);

        assert_eq!(forward.duplicate_rows, 1);
        assert_eq!(forward.rows, backward.rows);
    }

    #[test]
    fn test_unknown_property_type_keeps_rows() {
        let outcome =
            PeriodFilter::new(24).latest_period_only(ohio_rows(false), "REGION", Some("Townhouse"));
        assert_eq!(outcome.property_type_rows, 0);
        assert_eq!(outcome.duplicate_rows, 1);
        assert_eq!(outcome.rows.len(), 1);
    }
}
