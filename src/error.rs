//! Error types for formo-sync.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Failures reported by the external analytics client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Lifecycle failures, absorbed into the controller's published state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Missing {key} credential")]
    MissingCredential { key: &'static str },

    #[error("{0}")]
    Initialization(ClientError),

    #[error("{operation} failed: {source}")]
    Update {
        operation: &'static str,
        source: ClientError,
    },
}

impl LifecycleError {
    /// Stable machine-readable code for log payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "config.missing_credential",
            Self::Initialization(_) => "lifecycle.init_failed",
            Self::Update { .. } => "lifecycle.update_failed",
        }
    }

    /// Terminal errors are not retried until the credential itself changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }
}

/// Per-call tracking errors. Returned to the caller only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    #[error("Formo SDK not initialized")]
    NotInitialized,

    #[error("analytics instance was torn down")]
    Retired,

    #[error("event name must not be empty")]
    InvalidEventName,

    #[error("properties must be a JSON object")]
    InvalidProperties,

    #[error("{0}")]
    Client(#[from] ClientError),
}
