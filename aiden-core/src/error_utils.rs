use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::CommunityApi(e) => {
                error!("Community API error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::CommunityApi(e) => e.is_retryable(),
            CoreError::Storage(e) => e.is_retryable(),
            CoreError::Io(_) => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::CommunityApi(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::InvalidInput { message } => {
                format!("Invalid input: {}. Please check your input and try again.", message)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::CommunityApi(_) => "COMMUNITY_API".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for CommunityApiError {
    fn log_error(&self) -> &Self {
        error!("CommunityApiError ({}): {}", self.status(), self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CommunityApiError (warning, {}): {}", self.status(), self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CommunityApiError::Transport { .. } => true,
            CommunityApiError::Timeout { .. } => true,
            CommunityApiError::Http { status, .. } => *status >= 500 || *status == 429,
            CommunityApiError::InvalidResponse { .. } => false,
            CommunityApiError::InvalidParameter { .. } => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CommunityApiError::Transport { .. } => {
                "Could not reach the community API. Please check your connection and retry."
                    .to_string()
            }
            CommunityApiError::Http { status: 401, .. } => {
                "Your session is no longer authorized. Please reconnect and retry.".to_string()
            }
            CommunityApiError::Http { status, status_text } => {
                format!("The community API answered {} {}. Please retry.", status, status_text)
            }
            CommunityApiError::InvalidResponse { .. } => {
                "The community API returned incomplete data.".to_string()
            }
            CommunityApiError::Timeout { .. } => {
                "The community API took too long to respond. Please retry.".to_string()
            }
            CommunityApiError::InvalidParameter { name, value } => {
                format!("'{}' is not a valid {}.", value, name)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            CommunityApiError::Transport { .. } => "API_TRANSPORT".to_string(),
            CommunityApiError::Http { status: 401, .. } => "API_UNAUTHORIZED".to_string(),
            CommunityApiError::Http { .. } => "API_HTTP_ERROR".to_string(),
            CommunityApiError::InvalidResponse { .. } => "API_INVALID_RESPONSE".to_string(),
            CommunityApiError::Timeout { .. } => "API_TIMEOUT".to_string(),
            CommunityApiError::InvalidParameter { .. } => "API_INVALID_PARAMETER".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn log_error(&self) -> &Self {
        error!("StorageError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StorageError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable { .. } | StorageError::PersistFailed { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::QuotaExceeded { .. } => {
                "Local cache is full. Clear the cache to free space.".to_string()
            }
            StorageError::Corrupt { path, .. } => {
                format!("Local cache at {} is corrupt and will be ignored.", path)
            }
            _ => "Local cache is temporarily unavailable.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::QuotaExceeded { .. } => "STORAGE_QUOTA_EXCEEDED".to_string(),
            StorageError::Unavailable { .. } => "STORAGE_UNAVAILABLE".to_string(),
            StorageError::PersistFailed { .. } => "STORAGE_PERSIST_FAILED".to_string(),
            StorageError::Corrupt { .. } => "STORAGE_CORRUPT".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs failures for the CLI. In quiet mode warnings are dropped; errors are
/// always logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter {
    quiet: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("[{}] {}", error.error_code(), error.user_friendly_message());
        if error.is_retryable() {
            info!("This error is usually temporary; try again with --refresh");
        }
    }

    /// Returns whether the warning was logged.
    pub fn report_warning(&self, error: &CoreError) -> bool {
        if self.quiet {
            return false;
        }
        error.log_warn();
        true
    }
}
