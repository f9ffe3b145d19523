//! Storage traits for the answer store and the jobs database.
//!
//! Both are implemented by [`LibSqlBackend`](super::LibSqlBackend). The
//! answer store is the one resource shared across sessions, so it is always
//! handed around as `Arc<dyn AnswerStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::model::{AnswerRecord, AnswerSource, Job, JobStatus, Signature, StoredAnswer};

/// One historical write for a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRevision {
    pub value: String,
    pub source: AnswerSource,
    pub recorded_at: DateTime<Utc>,
}

/// Durable signature → answer store.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Exact lookup by signature.
    async fn lookup_answer(
        &self,
        signature: &Signature,
    ) -> Result<Option<StoredAnswer>, DatabaseError>;

    /// Insert or update the canonical answer for a signature. Every call is
    /// also appended to the signature's history.
    async fn upsert_answer(&self, record: &AnswerRecord) -> Result<StoredAnswer, DatabaseError>;

    /// Answers whose question text or value contains any of the keywords
    /// (case-insensitive), most recently updated first.
    async fn search_answers(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<StoredAnswer>, DatabaseError>;

    /// All writes for a signature, oldest first.
    async fn answer_history(
        &self,
        signature: &Signature,
    ) -> Result<Vec<AnswerRevision>, DatabaseError>;
}

/// Jobs database.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a newly collected job. Existing jobs keep their status; their
    /// listing details are refreshed. Returns `true` when the job was new.
    async fn upsert_job(&self, job: &Job) -> Result<bool, DatabaseError>;

    async fn get_job(&self, id: &str) -> Result<Option<Job>, DatabaseError>;

    /// Set a job's status. Moving to `submitted` stamps `applied_at`.
    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<(), DatabaseError>;

    /// Jobs in any of the given statuses, oldest collected first.
    async fn list_jobs_by_status(&self, statuses: &[JobStatus])
    -> Result<Vec<Job>, DatabaseError>;
}
