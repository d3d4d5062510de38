//! Error types for Diet Coach.

use crate::wizard::state::WizardStep;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Events the wizard refuses outright. Answer validation failures are not
/// errors; they are replied to inside the conversation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("{event} is not accepted while the wizard is at {step}")]
    UnexpectedEvent { step: WizardStep, event: String },

    #[error("Unknown {kind} option: {value}")]
    UnknownOption { kind: String, value: String },

    #[error("Wizard session {0} not found")]
    SessionNotFound(uuid::Uuid),
}

/// Errors from finalizing a profile and handing it to the preferences service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    /// One or more fields are missing; nothing was sent.
    #[error("{message}")]
    Incomplete { message: String },

    /// A field failed its validation rule (direct form path).
    #[error("{message}")]
    Invalid { field: String, message: String },

    /// The service rejected the profile or could not be reached.
    #[error("{message}")]
    Failed { message: String },
}

/// Errors from the recipe recommendation/detail services.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("No usable images were provided")]
    NoImages,

    #[error("Recipe request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response from recipe service: {0}")]
    InvalidResponse(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
