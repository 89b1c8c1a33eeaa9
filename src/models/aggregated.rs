use crate::models::ZipRecord;
use crate::utils::constants::{
    LOG_SUFFIX, PERIOD_END_FIELD, RANK_SUFFIX, TOTAL_POPULATION_FIELD, ZIP_COUNT_FIELD, ZIP_FIELD,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// One output row: a geography and its metric values with derived
/// `_LOG` and `_RANK` companions.
///
/// A key missing from `log_values` or `ranks` means the companion field is
/// absent from the output; a key mapped to `None` serializes as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub id_field: String,
    pub geo_id: String,
    pub zip_count: Option<usize>,
    pub total_population: Option<u64>,
    pub period_end: Option<String>,
    pub attributes: BTreeMap<String, Value>,
    pub metrics: BTreeMap<String, Option<f64>>,
    pub log_values: BTreeMap<String, Option<f64>>,
    pub ranks: BTreeMap<String, Option<f64>>,
}

impl AggregatedRecord {
    pub fn new(id_field: impl Into<String>, geo_id: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            geo_id: geo_id.into(),
            zip_count: None,
            total_population: None,
            period_end: None,
            attributes: BTreeMap::new(),
            metrics: BTreeMap::new(),
            log_values: BTreeMap::new(),
            ranks: BTreeMap::new(),
        }
    }

    /// ZIP-level output row (no roll-up).
    pub fn from_zip_record(record: ZipRecord) -> Self {
        Self {
            id_field: ZIP_FIELD.to_string(),
            geo_id: record.zip,
            zip_count: None,
            total_population: None,
            period_end: record.period_end,
            attributes: record.attributes,
            metrics: record.metrics,
            log_values: BTreeMap::new(),
            ranks: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }

    pub fn log_value(&self, name: &str) -> Option<f64> {
        self.log_values.get(name).copied().flatten()
    }

    pub fn rank(&self, name: &str) -> Option<f64> {
        self.ranks.get(name).copied().flatten()
    }

    /// Set a metric and its present companions to null.
    ///
    /// Returns `true` when a non-null value was removed.
    pub fn nullify_metric(&mut self, name: &str) -> bool {
        let had_value = self.metric(name).is_some();

        if let Some(value) = self.metrics.get_mut(name) {
            *value = None;
        }
        if let Some(value) = self.log_values.get_mut(name) {
            *value = None;
        }
        if let Some(value) = self.ranks.get_mut(name) {
            *value = None;
        }

        had_value
    }

    /// Total number of serialized fields.
    pub fn field_count(&self) -> usize {
        1 + usize::from(self.zip_count.is_some())
            + usize::from(self.total_population.is_some())
            + usize::from(self.period_end.is_some())
            + self.attributes.len()
            + self.metrics.len()
            + self.log_values.len()
            + self.ranks.len()
    }
}

impl Serialize for AggregatedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;

        map.serialize_entry(&self.id_field, &self.geo_id)?;
        if let Some(count) = self.zip_count {
            map.serialize_entry(ZIP_COUNT_FIELD, &count)?;
        }
        if let Some(population) = self.total_population {
            map.serialize_entry(TOTAL_POPULATION_FIELD, &population)?;
        }
        if let Some(ref period) = self.period_end {
            map.serialize_entry(PERIOD_END_FIELD, period)?;
        }
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }

        for (name, value) in &self.metrics {
            map.serialize_entry(name, &finite(*value))?;
            if let Some(log_value) = self.log_values.get(name) {
                map.serialize_entry(&format!("{}{}", name, LOG_SUFFIX), &finite(*log_value))?;
            }
            if let Some(rank) = self.ranks.get(name) {
                map.serialize_entry(&format!("{}{}", name, RANK_SUFFIX), &finite(*rank))?;
            }
        }

        map.end()
    }
}

/// NaN and infinities never reach the output as anything but null.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_serialize_flat_record() {
        let mut record = AggregatedRecord::new("COUNTY_FIPS", "06037")
            .with_attribute("COUNTY_NAME", json!("Los Angeles"))
            .with_metric("MEDIAN_DOM", Some(31.0))
            .with_metric("INVENTORY", None);
        record.zip_count = Some(280);
        record.total_population = Some(9_800_000);
        record.log_values.insert("MEDIAN_DOM".to_string(), Some(32.0_f64.ln()));
        record.ranks.insert("MEDIAN_DOM".to_string(), Some(0.5));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "COUNTY_FIPS": "06037",
                "ZIP_COUNT": 280,
                "TOTAL_POPULATION": 9_800_000,
                "COUNTY_NAME": "Los Angeles",
                "INVENTORY": null,
                "MEDIAN_DOM": 31.0,
                "MEDIAN_DOM_LOG": 32.0_f64.ln(),
                "MEDIAN_DOM_RANK": 0.5,
            })
        );
    }

    #[test]
    fn test_nullify_metric_clears_companions() {
        let mut record = AggregatedRecord::new("STATE_FIPS", "06").with_metric("MEDIAN_DOM", Some(1000.0));
        record.log_values.insert("MEDIAN_DOM".to_string(), Some(1001.0_f64.ln()));
        record.ranks.insert("MEDIAN_DOM".to_string(), Some(1.0));

        assert!(record.nullify_metric("MEDIAN_DOM"));
        assert_eq!(record.metric("MEDIAN_DOM"), None);
        assert_eq!(record.log_value("MEDIAN_DOM"), None);
        assert!(record.ranks.contains_key("MEDIAN_DOM"));
        assert_eq!(record.rank("MEDIAN_DOM"), None);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["MEDIAN_DOM"], Value::Null);
        assert_eq!(value["MEDIAN_DOM_LOG"], Value::Null);
        assert_eq!(value["MEDIAN_DOM_RANK"], Value::Null);

        assert!(!record.nullify_metric("MEDIAN_DOM"));
    }

    #[test]
    fn test_non_finite_serializes_as_null() {
        let record = AggregatedRecord::new("ZIP", "02134").with_metric("HOMES_SOLD", Some(f64::NAN));
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"ZIP":"02134","HOMES_SOLD":null}"#);
    }

    #[test]
    fn test_from_zip_record() {
        let zip = ZipRecord::new("02134")
            .with_period("2024-06-30")
            .with_metric("MEDIAN_SALE_PRICE", Some(810_000.0))
            .with_attribute("CITY_NAME", json!("Boston"));

        let record = AggregatedRecord::from_zip_record(zip);
        assert_eq!(record.id_field, "ZIP");
        assert_eq!(record.geo_id, "02134");
        assert_eq!(record.period_end.as_deref(), Some("2024-06-30"));
        assert_eq!(record.metric("MEDIAN_SALE_PRICE"), Some(810_000.0));
    }
}
