pub mod aggregator;
pub mod domain_filter;
pub mod period_filter;
pub mod pipeline;
pub mod ranker;
pub mod transformer;

pub use aggregator::{AggregationOutcome, Aggregator};
pub use domain_filter::DomainFilter;
pub use period_filter::{PeriodFilter, RegionPeriodOutcome, ZipPeriodOutcome};
pub use pipeline::{DatasetContext, GeoPipeline, ProcessedDataset};
pub use ranker::{RankReport, Ranker};
pub use transformer::{TransformReport, Transformer};
