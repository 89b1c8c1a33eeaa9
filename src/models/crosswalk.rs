use crate::models::GeographyLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use validator::Validate;

/// Maps one ZIP code to its containing geographies and a population weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CrosswalkEntry {
    #[validate(length(equal = 5))]
    pub zip: String,

    #[validate(length(equal = 2))]
    pub state_fips: String,

    #[validate(length(equal = 5))]
    pub county_fips: String,

    pub state_abbrev: Option<String>,
    pub state_name: Option<String>,
    pub county_name: Option<String>,
    pub cbsa_code: Option<String>,

    #[validate(range(min = 0.0))]
    pub population: Option<f64>,
}

impl CrosswalkEntry {
    /// Identifier of the geography containing this ZIP at `level`.
    pub fn geo_id(&self, level: GeographyLevel) -> Option<&str> {
        match level {
            GeographyLevel::Zip => Some(&self.zip),
            GeographyLevel::State => Some(&self.state_fips),
            GeographyLevel::County => Some(&self.county_fips),
            GeographyLevel::Cbsa => self.cbsa_code.as_deref(),
        }
    }

    /// Aggregation weight; unknown populations count as 1.
    pub fn weight(&self) -> f64 {
        self.population.filter(|p| p.is_finite()).unwrap_or(1.0)
    }
}

/// ZIP → geography lookup table.
#[derive(Debug, Clone, Default)]
pub struct Crosswalk {
    entries: HashMap<String, CrosswalkEntry>,
}

impl Crosswalk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CrosswalkEntry>) -> Self {
        let mut crosswalk = Self::new();
        for entry in entries {
            crosswalk.insert(entry);
        }
        crosswalk
    }

    /// Insert an entry; the first entry seen for a ZIP wins.
    pub fn insert(&mut self, entry: CrosswalkEntry) -> bool {
        if self.entries.contains_key(&entry.zip) {
            debug!("Duplicate crosswalk entry for ZIP {} ignored", entry.zip);
            return false;
        }
        self.entries.insert(entry.zip.clone(), entry);
        true
    }

    pub fn get(&self, zip: &str) -> Option<&CrosswalkEntry> {
        self.entries.get(zip)
    }

    /// Entry for `zip` when it has an identifier at `level`.
    pub fn resolve(&self, zip: &str, level: GeographyLevel) -> Option<&CrosswalkEntry> {
        self.get(zip).filter(|entry| entry.geo_id(level).is_some())
    }

    pub fn has_level(&self, level: GeographyLevel) -> bool {
        self.entries.values().any(|entry| entry.geo_id(level).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_entry(zip: &str, county_fips: &str, population: Option<f64>) -> CrosswalkEntry {
    CrosswalkEntry {
        zip: zip.to_string(),
        state_fips: county_fips[..2].to_string(),
        county_fips: county_fips.to_string(),
        state_abbrev: None,
        state_name: Some("Test State".to_string()),
        county_name: Some("Test County".to_string()),
        cbsa_code: None,
        population,
    }
}
