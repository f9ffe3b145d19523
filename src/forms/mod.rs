//! Application form collaborator.
//!
//! A [`FormSession`] is one open application wizard. The driver owns it
//! exclusively for the whole attempt.

pub mod fixture;

pub use fixture::FixtureForm;

use std::path::Path;

use async_trait::async_trait;

use crate::error::FormError;
use crate::model::{Job, RawQuestion};

/// Where an uploaded file goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// A file-upload question on the current page.
    Question(String),
    /// The page's cover letter slot.
    CoverLetter,
}

/// A multi-page application form.
#[async_trait]
pub trait FormSession: Send {
    /// Open the application for a job. Previously saved progress is restored.
    async fn open_application(&mut self, job: &Job) -> Result<(), FormError>;

    /// Next question on the current page that has not been answered yet,
    /// or `None` when the page is done.
    async fn next_question(&mut self) -> Result<Option<RawQuestion>, FormError>;

    async fn submit_answer(&mut self, question_id: &str, value: &str) -> Result<(), FormError>;

    /// Whether the current page asks for a cover letter that is not attached yet.
    async fn requests_cover_letter(&mut self) -> Result<bool, FormError>;

    async fn upload_file(&mut self, target: UploadTarget, path: &Path) -> Result<(), FormError>;

    /// Durably save the application's progress on the remote side.
    async fn save_progress(&mut self) -> Result<(), FormError>;

    /// Move to the next page.
    async fn advance(&mut self) -> Result<(), FormError>;

    /// Whether the current page is the final review page.
    async fn is_complete(&mut self) -> Result<bool, FormError>;

    /// Send the application.
    async fn submit_application(&mut self) -> Result<(), FormError>;
}
