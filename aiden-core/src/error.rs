use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Community API error: {0}")]
    CommunityApi(#[from] CommunityApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by the community endpoint functions. Every variant maps to an
/// HTTP-like status through [`CommunityApiError::status`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommunityApiError {
    /// No response was received, or the body could not be parsed as JSON.
    #[error("Failed to fetch data: {message}")]
    Transport { message: String },

    #[error("API request failed: {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },
}

impl CommunityApiError {
    pub fn status(&self) -> u16 {
        match self {
            CommunityApiError::Transport { .. } => 500,
            CommunityApiError::Http { status, .. } => *status,
            CommunityApiError::InvalidResponse { .. } => 400,
            CommunityApiError::Timeout { .. } => 504,
            CommunityApiError::InvalidParameter { .. } => 400,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CommunityApiError::Http { status: 401, .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage quota exceeded writing {key}: {needed} bytes needed, limit {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to persist store at {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("Corrupt store at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
