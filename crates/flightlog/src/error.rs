//! Error types for flightlog.
//!
//! This module defines all error types used throughout the flightlog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Setup Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// The schema script could not be read or applied to a new database.
    #[error("failed to initialize database schema: {message}")]
    SchemaSetup {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Persistence Errors ===
    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The store was used before `initialize` was called.
    #[error("store is not initialized")]
    StoreNotInitialized,

    /// The store was used after `dispose` was called.
    #[error("store has been disposed")]
    StoreClosed,

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),

    // === Data Errors ===
    /// A duration string was not in `HH:MM` form.
    #[error("invalid duration '{value}': expected HH:MM")]
    InvalidDuration {
        /// The rejected input.
        value: String,
    },

    /// A submitted field could not be converted to its typed value.
    #[error("invalid value for {field}: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for flightlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl Error {
    /// Create a new schema setup error.
    #[must_use]
    pub fn schema_setup(message: impl Into<String>) -> Self {
        Self::SchemaSetup {
            message: message.into(),
        }
    }

    /// Create a new migration error.
    #[must_use]
    pub fn migration(message: impl Into<String>) -> Self {
        Self::DatabaseMigration {
            message: message.into(),
        }
    }

    /// Create an invalid field error.
    #[must_use]
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    /// Check if this error prevents the store from starting.
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaSetup { .. }
                | Self::DatabaseOpen { .. }
                | Self::DatabaseMigration { .. }
                | Self::DirectoryCreate { .. }
        )
    }

    /// Check if this error was caused by bad user input rather than the server.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration { .. } | Self::InvalidField { .. }
        )
    }
}
