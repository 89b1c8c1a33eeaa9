use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target geography of an output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeographyLevel {
    Zip,
    State,
    County,
    Cbsa,
}

impl GeographyLevel {
    /// Levels produced by rolling ZIP codes up through the crosswalk.
    pub const AGGREGATED: [GeographyLevel; 3] = [
        GeographyLevel::State,
        GeographyLevel::County,
        GeographyLevel::Cbsa,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            GeographyLevel::Zip => "ZIP Code",
            GeographyLevel::State => "State",
            GeographyLevel::County => "County",
            GeographyLevel::Cbsa => "CBSA",
        }
    }

    /// Name of the identifier field in output records.
    pub fn id_field(&self) -> &'static str {
        match self {
            GeographyLevel::Zip => "ZIP",
            GeographyLevel::State => "STATE_FIPS",
            GeographyLevel::County => "COUNTY_FIPS",
            GeographyLevel::Cbsa => "CBSA_CODE",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            GeographyLevel::Zip => "zip",
            GeographyLevel::State => "state",
            GeographyLevel::County => "county",
            GeographyLevel::Cbsa => "cbsa",
        }
    }
}

impl fmt::Display for GeographyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for GeographyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zip" | "zip code" | "zcta" => Ok(GeographyLevel::Zip),
            "state" => Ok(GeographyLevel::State),
            "county" => Ok(GeographyLevel::County),
            "cbsa" | "metro" => Ok(GeographyLevel::Cbsa),
            other => Err(format!(
                "unknown geography level '{}' (expected zip, state, county or cbsa)",
                other
            )),
        }
    }
}
