use crate::models::GeographyLevel;
use std::path::{Path, PathBuf};

/// Default JSON output path for a geography level.
///
/// ZIP-level output is `redfin_latest_optimized.json` (the input of the
/// aggregation step); everything else is `redfin_{level}_aggregated.json`.
pub fn default_output_path(output_dir: &Path, level: GeographyLevel) -> PathBuf {
    let filename = match level {
        GeographyLevel::Zip => "redfin_latest_optimized.json".to_string(),
        other => format!("redfin_{}_aggregated.json", other.slug()),
    };
    output_dir.join(filename)
}

/// Sibling Parquet path for a JSON output path.
pub fn parquet_path_for(json_path: &Path) -> PathBuf {
    json_path.with_extension("parquet")
}
