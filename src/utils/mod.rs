pub mod constants;
pub mod encoding;
pub mod filename;
pub mod geo_codes;
pub mod logging;
pub mod progress;
pub mod stats;

pub use constants::*;
pub use encoding::decode_text;
pub use filename::{default_output_path, parquet_path_for};
pub use geo_codes::{normalize_cbsa, normalize_county_fips, normalize_zip, state_fips_from_county};
pub use logging::init_tracing;
pub use progress::ProgressReporter;
pub use stats::{median, percentile_ranks, skewness, weighted_median};
