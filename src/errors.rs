use thiserror::Error;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to read archive: {0}")]
    ZipError(#[from] ZipError),
    #[error("Failed to parse DEX file: {0}")]
    DexError(#[from] dex::Error),
    #[error("Invalid class pattern: {0}")]
    PatternError(#[from] regex::Error),
    #[error("Failed to start worker pool: {0}")]
    PoolError(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to serialize report: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("No DEX files found in {0}")]
    NoDexFiles(String),
}
