//! Error types for the interface consolidation pass.
//!
//! Every failure aborts the pass. The variants only distinguish where the
//! failure came from so the caller can report it meaningfully.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the consolidation pass.
#[derive(Debug, Error)]
pub enum MigrateError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Legacy layout mismatch in table {table}: {message}")]
    Schema { table: String, message: String },

    // Identifier allocation
    #[error("Identifier space exhausted for {entity}")]
    IdExhausted { entity: String },

    // Data integrity
    #[error("Data corruption detected: {message}")]
    Corruption { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for consolidation operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<rusqlite::Error> for MigrateError {
    fn from(err: rusqlite::Error) -> Self {
        MigrateError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MigrateError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap a database error with a description of the step that failed.
    pub fn database(context: &str, err: rusqlite::Error) -> Self {
        MigrateError::Database {
            message: format!("{}: {}", context, err),
            source: Some(err),
        }
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        MigrateError::Corruption {
            message: message.into(),
        }
    }

    /// Exit code used by the command-line front end.
    ///
    /// - 2: configuration or legacy layout problem (nothing was attempted)
    /// - 3: data corruption detected while planning
    /// - 1: everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Config { .. }
            | MigrateError::Schema { .. }
            | MigrateError::Json { .. }
            | MigrateError::Io { .. } => 2,
            MigrateError::Corruption { .. } => 3,
            MigrateError::Database { .. } | MigrateError::IdExhausted { .. } => 1,
        }
    }
}
