#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error("Invalid value `{value}` for config key \"{key}\"")]
    InvalidConfig { key: String, value: String },

    #[error(transparent)]
    FeedError(#[from] FeedError),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("No Tokio runtime is available to drive the feed scheduler.")]
    NoRuntime,

    #[error("Invalid tick delay range: min {min_ms}ms must be below max {max_ms}ms.")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },
}
