//! Error types for the filter engine.

use thiserror::Error;

/// Filter pipeline errors.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error(transparent)]
    Core(#[from] rfx_core::Error),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    /// Shader compile or pipeline link failure. Fatal for the chain.
    #[error("Failed to compile shader program '{key}': {message}")]
    ShaderCompilation { key: String, message: String },

    #[error("Image too large: {width}x{height} exceeds GPU limit {limit}")]
    ImageTooLarge { width: u32, height: u32, limit: u32 },

    #[error("Invalid parameter for {filter}: {message}")]
    InvalidParameter { filter: &'static str, message: String },

    #[error("Unknown filter type: {0}")]
    UnknownFilter(String),

    #[error("Invalid filter record: {0}")]
    InvalidRecord(String),

    #[error("Filter '{0}' embeds a loadable resource and must be reconstructed asynchronously")]
    RequiresAsync(String),

    #[error("Failed to load source '{src}': {message}")]
    SourceLoad { src: String, message: String },

    #[error("Filter reconstruction aborted")]
    Aborted,

    #[error("GPU operation failed: {0}")]
    OperationFailed(String),
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::InvalidRecord(err.to_string())
    }
}

/// Result alias for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    pub(crate) fn invalid(filter: &'static str, message: impl Into<String>) -> Self {
        FilterError::InvalidParameter { filter, message: message.into() }
    }
}
