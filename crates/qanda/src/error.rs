//! Error types for qanda.
//!
//! This module defines all error types used throughout the qanda crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for qanda operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Validation Errors ===
    /// A submission was rejected before reaching the store.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    // === Store Errors ===
    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {message}")]
    Transport {
        /// Description of what went wrong.
        message: String,
    },

    /// The store answered with an unexpected HTTP status.
    #[error("store returned HTTP {status}: {body}")]
    HttpStatus {
        /// The status code returned.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// An HTTP request to the store failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store sent data that could not be interpreted.
    #[error("malformed store payload: {message}")]
    Payload {
        /// Description of the problem.
        message: String,
    },

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
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

    // === Generic Errors ===
    /// A record with the given id does not exist.
    #[error("no record with id {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The page refused or failed an action; carries the notification text.
    #[error("{title} {description}")]
    Rejected {
        /// Notification headline.
        title: String,
        /// Notification detail.
        description: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a submission is rejected locally.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A record with exactly this question text already exists.
    #[error("question already exists")]
    DuplicateQuestion,

    /// A required field was left empty.
    #[error("{0} is required")]
    EmptyField(Field),

    /// A previous request from the same form is still pending.
    #[error("a save is already in progress")]
    Busy,

    /// The action needs a dialog that is not open.
    #[error("no {0} dialog is open")]
    NoDialog(&'static str),
}

/// The two user-editable fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The question text.
    Question,
    /// The answer text.
    Answer,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Question => write!(f, "question"),
            Self::Answer => write!(f, "answer"),
        }
    }
}

/// A specialized Result type for qanda operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new payload error.
    #[must_use]
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a not-found error for the given id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Check if this error was raised locally, before any store call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from talking to the store.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::HttpStatus { .. }
                | Self::Http(_)
                | Self::DatabaseQuery(_)
        )
    }
}
