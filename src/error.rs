//! Error types for review workflows

use thiserror::Error;

/// Result type alias for review operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for review workflows
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed workflow schema, detected before any agent call
    #[error("Schema error: {0}")]
    Schema(String),

    /// A round's input column is missing from the dataset at runtime
    #[error("Dataset error in round {round}: column '{column}' does not exist")]
    Dataset {
        /// Round that needed the column
        round: String,
        /// Missing column
        column: String,
    },

    /// The capability failed to produce a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The capability answered with output that does not match the declared shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Auxiliary context could not be resolved
    #[error("Context resolution error: {0}")]
    Context(String),

    /// A single attempt exceeded the agent's timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A workflow hook asked to abandon the run
    #[error("Run abandoned after round {round}: {reason}")]
    HookAborted {
        /// Last completed round
        round: String,
        /// Error returned by the hook
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a dataset error for a missing column
    pub fn missing_column(round: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Dataset {
            round: round.into(),
            column: column.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a context resolution error
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether an agent call failing with this error should be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Validation(_) | Self::Timeout(_) | Self::Context(_)
        )
    }

    /// Whether this error aborts a whole workflow run
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
