use thiserror::Error;

/// Error types for the logmeans-rs library
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The number of clusters k is invalid (must be > 0)
    #[error("Invalid k value: {0}")]
    InvalidK(String),

    /// Not enough data points for the requested number of clusters
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The cluster-count search range is empty or inverted
    #[error("Invalid k range: {0}")]
    InvalidRange(String),

    /// Matrix shape does not agree with its payload
    #[error("Dimension mismatch: {0}")]
    InvalidDimensions(String),

    /// A profiler trace is not a list of `[tag, elapsed, info?]` triples
    #[error("Malformed profiler trace: {0}")]
    MalformedTrace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ClusterError> = std::result::Result<T, E>;
