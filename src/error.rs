use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error(
        "Negative input to log transform: {metric} = {value} for geography {geo_id} \
         (check crosswalk and units upstream)"
    )]
    NegativeLogInput {
        metric: String,
        geo_id: String,
        value: f64,
    },

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("{failed} of {total} geography levels failed")]
    LevelsFailed { failed: usize, total: usize },
}

impl ProcessingError {
    /// Build a `MissingInput` error when `path` does not exist.
    pub fn ensure_exists(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(ProcessingError::MissingInput {
                path: path.to_path_buf(),
            })
        }
    }
}
