pub mod aggregated;
pub mod crosswalk;
pub mod domain_rule;
pub mod geography;
pub mod metadata;
pub mod zip_record;

pub use aggregated::AggregatedRecord;
pub use crosswalk::{Crosswalk, CrosswalkEntry};
pub use domain_rule::DomainRule;
pub use geography::GeographyLevel;
pub use metadata::{
    DomainRuleReport, InputReport, OutputMetadata, RankDistribution, SkewnessChange,
    UsageInstructions,
};
pub use zip_record::{parse_period, ZipRecord};
