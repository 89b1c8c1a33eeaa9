use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of ZIP-level market data.
#[derive(Debug, Clone, PartialEq)]
pub struct ZipRecord {
    /// 5-digit zero-padded ZIP code
    pub zip: String,
    pub period_end: Option<String>,
    pub metrics: BTreeMap<String, Option<f64>>,
    /// Non-metric columns carried through to ZIP-level output
    pub attributes: BTreeMap<String, Value>,
}

impl ZipRecord {
    pub fn new(zip: impl Into<String>) -> Self {
        Self {
            zip: zip.into(),
            period_end: None,
            metrics: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_period(mut self, period_end: impl Into<String>) -> Self {
        self.period_end = Some(period_end.into());
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Metric value, `None` when missing or null.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }

    pub fn period_date(&self) -> Option<NaiveDate> {
        self.period_end.as_deref().and_then(parse_period)
    }
}

/// Parse a Redfin period string (`2024-06-30`, `2024-06-30 00:00:00`,
/// `2024-06-30T00:00:00`).
pub fn parse_period(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 30);
        assert_eq!(parse_period("2024-06-30"), expected);
        assert_eq!(parse_period("2024-06-30 00:00:00"), expected);
        assert_eq!(parse_period("2024-06-30T00:00:00.000"), expected);
        assert_eq!(parse_period("June 2024"), None);
    }

    #[test]
    fn test_metric_lookup() {
        let record = ZipRecord::new("02134")
            .with_period("2024-06-30")
            .with_metric("MEDIAN_SALE_PRICE", Some(810_000.0))
            .with_metric("MEDIAN_DOM", None);

        assert_eq!(record.metric("MEDIAN_SALE_PRICE"), Some(810_000.0));
        assert_eq!(record.metric("MEDIAN_DOM"), None);
        assert_eq!(record.metric("INVENTORY"), None);
        assert_eq!(record.period_date(), NaiveDate::from_ymd_opt(2024, 6, 30));
    }
}
