/// Errors raised while loading road features or merging them.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Malformed input feature, e.g. a LineString with fewer than two coordinates.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid merge parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
