//! Error types for easy-apply.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
///
/// A failed answer upsert surfaces as `Query`; callers treat it as a
/// store-write failure and carry on with the submission.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors. Every variant means "the AI is unavailable for
/// this question"; the resolver maps them to an unknown answer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("AI call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors raised by the application form collaborator.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Failed to open application for job {job_id}: {reason}")]
    OpenApplication { job_id: String, reason: String },

    #[error("Form navigation failed: {reason}")]
    Navigation { reason: String },

    #[error("Form element not found: {what}")]
    ElementNotFound { what: String },

    #[error("Upload of {path} failed: {reason}")]
    Upload { path: String, reason: String },

    #[error("Form state error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormError {
    /// Whether the error happened while opening the application.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::OpenApplication { .. })
    }
}

/// Raw question data that cannot be turned into a question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("Question {id} has no label")]
    MissingLabel { id: String },

    #[error("Choice question '{label}' ({widget}) offers no choices")]
    NoChoices { label: String, widget: String },
}

/// Human UI errors.
#[derive(Debug, thiserror::Error)]
pub enum HumanError {
    #[error("Human input closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cover letter preparation errors.
#[derive(Debug, thiserror::Error)]
pub enum CoverLetterError {
    #[error("Cover letters are skipped by configuration")]
    Skipped,

    #[error("No default cover letter configured")]
    NoDefault,

    #[error("Cover letter generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Failed to write cover letter: {0}")]
    Io(#[from] std::io::Error),
}
