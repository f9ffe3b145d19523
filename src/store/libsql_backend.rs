//! libSQL backend implementing `AnswerStore` and `JobStore`.
//!
//! Supports local file and in-memory databases.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::model::{AnswerRecord, AnswerSource, Job, JobStatus, Signature, StoredAnswer};
use crate::store::migrations;
use crate::store::traits::{AnswerRevision, AnswerStore, JobStore};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a StoredAnswer.
///
/// Column order matches ANSWER_COLUMNS.
fn row_to_answer(row: &libsql::Row) -> Result<StoredAnswer, DatabaseError> {
    let source_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("answer row: {e}")))?;
    let source: AnswerSource = source_str.parse().map_err(DatabaseError::Serialization)?;
    let revision: i64 = row.get(4).unwrap_or(1);
    let created_str: String = row.get(5).unwrap_or_default();
    let updated_str: String = row.get(6).unwrap_or_default();

    Ok(StoredAnswer {
        signature: Signature::from_stored(
            row.get::<String>(0)
                .map_err(|e| DatabaseError::Query(format!("answer row: {e}")))?,
        ),
        question_text: row.get(1).unwrap_or_default(),
        value: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("answer row: {e}")))?,
        source,
        revision: u32::try_from(revision).unwrap_or(u32::MAX),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a Job.
///
/// Column order matches JOB_COLUMNS.
fn row_to_job(row: &libsql::Row) -> Result<Job, DatabaseError> {
    let status_str: String = row
        .get(8)
        .map_err(|e| DatabaseError::Query(format!("job row: {e}")))?;
    let collected_str: String = row.get(9).unwrap_or_default();
    let applied_str: Option<String> = row.get(10).ok();
    let easy_apply: i64 = row.get(7).unwrap_or(1);

    Ok(Job {
        id: row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("job row: {e}")))?,
        title: row.get(1).unwrap_or_default(),
        company: row.get(2).unwrap_or_default(),
        location: row.get(3).ok(),
        url: row.get(4).ok(),
        description: row.get(5).unwrap_or_default(),
        hiring_manager: row.get(6).ok(),
        easy_apply: easy_apply != 0,
        status: status_str.parse().map_err(DatabaseError::Serialization)?,
        collected_at: parse_datetime(&collected_str),
        applied_at: parse_optional_datetime(&applied_str),
    })
}

// ── Trait implementations ───────────────────────────────────────────

const ANSWER_COLUMNS: &str =
    "signature, question_text, value, source, revision, created_at, updated_at";

const JOB_COLUMNS: &str = "id, title, company, location, url, description, hiring_manager, easy_apply, status, collected_at, applied_at";

#[async_trait]
impl AnswerStore for LibSqlBackend {
    async fn lookup_answer(
        &self,
        signature: &Signature,
    ) -> Result<Option<StoredAnswer>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE signature = ?1"),
                params![signature.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("lookup_answer: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_answer(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("lookup_answer: {e}"))),
        }
    }

    async fn upsert_answer(&self, record: &AnswerRecord) -> Result<StoredAnswer, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_answer begin: {e}")))?;

        tx.execute(
            "INSERT INTO answers (signature, question_text, value, source, revision, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
             ON CONFLICT (signature) DO UPDATE SET
                question_text = excluded.question_text,
                value = excluded.value,
                source = excluded.source,
                revision = answers.revision + 1,
                updated_at = excluded.updated_at",
            params![
                record.signature.as_str(),
                record.question_text.as_str(),
                record.value.as_str(),
                record.source.as_str(),
                now.as_str(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_answer: {e}")))?;

        tx.execute(
            "INSERT INTO answer_history (signature, value, source, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.signature.as_str(),
                record.value.as_str(),
                record.source.as_str(),
                now.as_str(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_answer history: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_answer commit: {e}")))?;

        debug!(signature = %record.signature, source = %record.source, "Answer stored");

        self.lookup_answer(&record.signature)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "answer".into(),
                id: record.signature.to_string(),
            })
    }

    async fn search_answers(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<StoredAnswer>, DatabaseError> {
        let conn = self.conn();
        let mut found: HashMap<Signature, StoredAnswer> = HashMap::new();

        for keyword in keywords.iter().filter(|k| !k.trim().is_empty()) {
            let pattern = format!("%{}%", keyword.trim());
            let mut rows = conn
                .query(
                    &format!(
                        "SELECT {ANSWER_COLUMNS} FROM answers \
                         WHERE question_text LIKE ?1 COLLATE NOCASE OR value LIKE ?1 COLLATE NOCASE \
                         ORDER BY updated_at DESC LIMIT ?2"
                    ),
                    params![pattern, limit as i64],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("search_answers: {e}")))?;

            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::Query(format!("search_answers: {e}")))?
            {
                let answer = row_to_answer(&row)?;
                found.entry(answer.signature.clone()).or_insert(answer);
            }
        }

        let mut answers: Vec<StoredAnswer> = found.into_values().collect();
        answers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        answers.truncate(limit);
        Ok(answers)
    }

    async fn answer_history(
        &self,
        signature: &Signature,
    ) -> Result<Vec<AnswerRevision>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value, source, recorded_at FROM answer_history \
                 WHERE signature = ?1 ORDER BY id ASC",
                params![signature.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("answer_history: {e}")))?;

        let mut revisions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("answer_history: {e}")))?
        {
            let value: String = row.get(0).unwrap_or_default();
            let source: String = row.get(1).unwrap_or_default();
            let recorded: String = row.get(2).unwrap_or_default();
            revisions.push(AnswerRevision {
                value,
                source: source.parse().map_err(DatabaseError::Serialization)?,
                recorded_at: parse_datetime(&recorded),
            });
        }
        Ok(revisions)
    }
}

#[async_trait]
impl JobStore for LibSqlBackend {
    async fn upsert_job(&self, job: &Job) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        if self.get_job(&job.id).await?.is_some() {
            conn.execute(
                "UPDATE jobs SET title = ?1, company = ?2, location = ?3, url = ?4, description = ?5,
                    hiring_manager = ?6, easy_apply = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    job.title.as_str(),
                    job.company.as_str(),
                    opt_text(job.location.as_deref()),
                    opt_text(job.url.as_deref()),
                    job.description.as_str(),
                    opt_text(job.hiring_manager.as_deref()),
                    job.easy_apply as i64,
                    now.as_str(),
                    job.id.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_job update: {e}")))?;
            return Ok(false);
        }

        conn.execute(
            &format!(
                "INSERT INTO jobs ({JOB_COLUMNS}, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                job.id.as_str(),
                job.title.as_str(),
                job.company.as_str(),
                opt_text(job.location.as_deref()),
                opt_text(job.url.as_deref()),
                job.description.as_str(),
                opt_text(job.hiring_manager.as_deref()),
                job.easy_apply as i64,
                job.status.as_str(),
                job.collected_at.to_rfc3339(),
                opt_text(job.applied_at.map(|t| t.to_rfc3339()).as_deref()),
                now.as_str(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_job insert: {e}")))?;

        debug!(job_id = %job.id, "Job inserted into DB");
        Ok(true)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_job: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_job: {e}"))),
        }
    }

    async fn update_job_status(&self, id: &str, status: JobStatus) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let count = if status == JobStatus::Submitted {
            conn.execute(
                "UPDATE jobs SET status = ?1, applied_at = ?2, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_str(), id],
            )
            .await
        } else {
            conn.execute(
                "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_str(), id],
            )
            .await
        }
        .map_err(|e| DatabaseError::Query(format!("update_job_status: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "job".into(),
                id: id.to_string(),
            });
        }

        debug!(job_id = id, status = %status, "Job status updated in DB");
        Ok(())
    }

    async fn list_jobs_by_status(
        &self,
        statuses: &[JobStatus],
    ) -> Result<Vec<Job>, DatabaseError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=statuses.len()).map(|i| format!("?{i}")).collect();
        let values: Vec<Value> = statuses
            .iter()
            .map(|s| Value::Text(s.as_str().to_string()))
            .collect();

        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE status IN ({}) \
                     ORDER BY collected_at ASC, id ASC",
                    placeholders.join(", ")
                ),
                Params::Positional(values),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_jobs_by_status: {e}")))?;

        let mut jobs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_jobs_by_status: {e}")))?
        {
            jobs.push(row_to_job(&row)?);
        }
        Ok(jobs)
    }
}
