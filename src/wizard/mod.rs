//! Application wizard driver.
//!
//! Walks each actionable job through its application form: every question
//! goes classifier → resolver → gate, cover letter pages are handled per the
//! configured mode, and the job status is written back after every step.
//! The driver owns the form session for its whole lifetime.

pub mod cover_letter;
pub mod state;

pub use state::{ApplicationAttempt, AttemptOutcome, DeferReason, WizardState};

use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::ai::JobAi;
use crate::classify;
use crate::config::{AppConfig, CoverLetterConfig, RunConfig};
use crate::documents::Documents;
use crate::error::{DatabaseError, FormError};
use crate::forms::{FormSession, UploadTarget};
use crate::gate::{Gate, Settlement};
use crate::human::HumanPrompter;
use crate::model::{Job, JobStatus, QuestionKind, RawQuestion};
use crate::resolver::{AnswerResolver, AnswerResult};
use crate::store::{AnswerStore, JobStore};

static RESUME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(resume|résumé|cv|curriculum vitae)\b").unwrap()
});

/// Collaborators the driver needs besides the form.
pub struct WizardDeps {
    pub jobs: Arc<dyn JobStore>,
    pub answers: Arc<dyn AnswerStore>,
    pub ai: Arc<dyn JobAi>,
    pub human: Arc<dyn HumanPrompter>,
    pub documents: Documents,
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub needs_answer: usize,
    pub needs_cover_letter: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Submitted => self.submitted += 1,
            AttemptOutcome::Deferred(DeferReason::NeedsAnswer) => self.needs_answer += 1,
            AttemptOutcome::Deferred(DeferReason::NeedsCoverLetter) => {
                self.needs_cover_letter += 1
            }
            AttemptOutcome::Failed(_) => self.failed += 1,
            AttemptOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.submitted + self.needs_answer + self.needs_cover_letter + self.failed + self.skipped
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} submitted, {} need an answer, {} need a cover letter, {} failed, {} skipped",
            self.submitted, self.needs_answer, self.needs_cover_letter, self.failed, self.skipped
        )
    }
}

/// Drives application forms, one job at a time.
pub struct WizardDriver<F: FormSession> {
    form: F,
    jobs: Arc<dyn JobStore>,
    resolver: AnswerResolver,
    gate: Gate,
    ai: Arc<dyn JobAi>,
    documents: Documents,
    cover_letter: CoverLetterConfig,
    ai_timeout: Duration,
    run: RunConfig,
}

impl<F: FormSession> WizardDriver<F> {
    pub fn new(form: F, deps: WizardDeps, config: &AppConfig) -> Self {
        let limits = config.resolver();
        let resolver = AnswerResolver::new(
            Arc::clone(&deps.answers),
            Arc::clone(&deps.ai),
            deps.documents.resume_text.clone(),
            limits,
        );
        let gate = Gate::new(config.automation, deps.answers, deps.human);
        Self {
            form,
            jobs: deps.jobs,
            resolver,
            gate,
            ai: deps.ai,
            documents: deps.documents,
            cover_letter: config.cover_letter.clone(),
            ai_timeout: limits.ai_timeout,
            run: config.run.clone(),
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    /// Attempt every actionable job once, oldest first.
    pub async fn run(&mut self) -> Result<RunSummary, DatabaseError> {
        let jobs = self
            .jobs
            .list_jobs_by_status(&JobStatus::actionable(self.run.retry_errored))
            .await?;
        info!(jobs = jobs.len(), "Starting run");

        let mut summary = RunSummary::default();
        for job in jobs {
            let outcome = self.apply(job).await;
            summary.record(&outcome);
        }

        info!(%summary, "Run finished");
        Ok(summary)
    }

    /// Run one application attempt to a terminal state.
    pub async fn apply(&mut self, job: Job) -> AttemptOutcome {
        let mut attempt = ApplicationAttempt::new(job);

        if attempt.job.status.is_terminal() {
            debug!(job_id = %attempt.job.id, status = %attempt.job.status, "Already finished");
            return AttemptOutcome::Skipped;
        }

        if !attempt.job.easy_apply {
            info!(job_id = %attempt.job.id, "Not an Easy Apply listing, skipping");
            self.set_status(&mut attempt.job, JobStatus::Skipped).await;
            return AttemptOutcome::Skipped;
        }

        info!(
            job_id = %attempt.job.id,
            title = %attempt.job.title,
            company = %attempt.job.company,
            resuming = attempt.job.status.is_resumable(),
            "Applying"
        );
        self.set_status(&mut attempt.job, JobStatus::InProgress).await;

        let outcome = match self.walk(&mut attempt).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(&mut attempt, e).await,
        };

        self.set_status(&mut attempt.job, outcome.status()).await;
        info!(
            job_id = %attempt.job.id,
            state = %attempt.state,
            questions = attempt.questions.len(),
            elapsed_ms = (Utc::now() - attempt.started_at).num_milliseconds(),
            "Attempt finished"
        );
        outcome
    }

    async fn walk(&mut self, attempt: &mut ApplicationAttempt) -> Result<AttemptOutcome, FormError> {
        attempt.transition(WizardState::Started)?;
        self.open(&attempt.job).await?;
        attempt.transition(WizardState::PerQuestion)?;

        for _ in 0..self.run.max_steps {
            if self.form.is_complete().await? {
                attempt.transition(WizardState::ReviewStep)?;
                self.form.submit_application().await?;
                attempt.transition(WizardState::Submitted)?;
                info!(job_id = %attempt.job.id, "Application submitted");
                return Ok(AttemptOutcome::Submitted);
            }
            if attempt.state == WizardState::CoverLetterStep {
                attempt.transition(WizardState::PerQuestion)?;
            }

            while let Some(raw) = self.form.next_question().await? {
                if !attempt.visit(&raw.id) {
                    return Err(FormError::Navigation {
                        reason: format!("question '{}' was offered twice", raw.label),
                    });
                }
                if let Some(reason) = self.handle_question(attempt, raw).await? {
                    return self.defer(attempt, reason).await;
                }
            }

            if self.form.requests_cover_letter().await? {
                attempt.transition(WizardState::CoverLetterStep)?;
                if let Some(reason) = self.attach_cover_letter(&attempt.job).await? {
                    return self.defer(attempt, reason).await;
                }
            }

            self.form.advance().await?;
            attempt.next_page();
            self.set_status(&mut attempt.job, JobStatus::InProgress).await;
        }

        Err(FormError::Navigation {
            reason: format!("form not complete after {} pages", self.run.max_steps),
        })
    }

    /// Open the application, retrying an open failure once.
    async fn open(&mut self, job: &Job) -> Result<(), FormError> {
        match self.form.open_application(job).await {
            Err(e) if e.is_open_failure() => {
                warn!(job_id = %job.id, error = %e, "Open failed, retrying once");
                self.form.open_application(job).await
            }
            other => other,
        }
    }

    /// Classify, resolve, gate and submit one question. Returns the deferral
    /// reason when the attempt has to stop here.
    async fn handle_question(
        &mut self,
        attempt: &mut ApplicationAttempt,
        raw: RawQuestion,
    ) -> Result<Option<DeferReason>, FormError> {
        if raw.is_prefilled() {
            debug!(job_id = %attempt.job.id, question = %raw.id, "Already filled, leaving as is");
            return Ok(None);
        }

        let (question, storable) = match classify::classify(&raw) {
            Ok(question) => (question, true),
            Err(e) => {
                warn!(job_id = %attempt.job.id, error = %e, "Unclassifiable question");
                (classify::unclassified(&raw), false)
            }
        };
        attempt.record_question(question.clone());

        if question.kind == QuestionKind::FileUpload
            && RESUME_FIELD.is_match(&question.text)
            && let Some(resume) = self.documents.resume_file.clone()
        {
            debug!(job_id = %attempt.job.id, question = %question.id, "Uploading resume");
            return self
                .submit(&question.id, question.kind, &resume.to_string_lossy())
                .await;
        }

        let result = if storable {
            self.resolver.resolve(&question).await
        } else {
            AnswerResult::Unknown
        };

        let settlement = match self.gate.settle(&question, result).await {
            Ok(settlement) => settlement,
            Err(e) => {
                warn!(job_id = %attempt.job.id, error = %e, "Human prompt failed");
                Settlement::Defer
            }
        };

        match settlement {
            Settlement::Defer => {
                info!(job_id = %attempt.job.id, signature = %question.signature, "Deferring");
                Ok(Some(DeferReason::NeedsAnswer))
            }
            Settlement::Submit { value, pending } => {
                if let Some(reason) = self.submit(&question.id, question.kind, &value).await? {
                    return Ok(Some(reason));
                }
                if storable && let Some(record) = pending {
                    self.gate.commit(&record).await;
                }
                Ok(None)
            }
        }
    }

    /// Write a value into the form. A value the form refuses defers the
    /// attempt; anything else wrong with the form is an error.
    async fn submit(
        &mut self,
        question_id: &str,
        kind: QuestionKind,
        value: &str,
    ) -> Result<Option<DeferReason>, FormError> {
        let written = if kind == QuestionKind::FileUpload {
            self.form
                .upload_file(UploadTarget::Question(question_id.to_string()), Path::new(value))
                .await
        } else {
            self.form.submit_answer(question_id, value).await
        };

        match written {
            Ok(()) => Ok(None),
            Err(e @ (FormError::Upload { .. } | FormError::State(_))) => {
                warn!(question = question_id, error = %e, "Form refused the answer");
                Ok(Some(DeferReason::NeedsAnswer))
            }
            Err(e) => Err(e),
        }
    }

    async fn attach_cover_letter(&mut self, job: &Job) -> Result<Option<DeferReason>, FormError> {
        let path = match cover_letter::prepare(
            &self.cover_letter,
            self.ai.as_ref(),
            self.ai_timeout,
            &self.documents,
            job,
        )
        .await
        {
            Ok(path) => path,
            Err(e) => {
                info!(job_id = %job.id, reason = %e, "No cover letter available");
                return Ok(Some(DeferReason::NeedsCoverLetter));
            }
        };

        match self.form.upload_file(UploadTarget::CoverLetter, &path).await {
            Ok(()) => Ok(None),
            Err(e @ FormError::Upload { .. }) => {
                warn!(job_id = %job.id, error = %e, "Cover letter upload failed");
                Ok(Some(DeferReason::NeedsCoverLetter))
            }
            Err(e) => Err(e),
        }
    }

    async fn defer(
        &mut self,
        attempt: &mut ApplicationAttempt,
        reason: DeferReason,
    ) -> Result<AttemptOutcome, FormError> {
        attempt.transition(WizardState::Deferred)?;
        if let Err(e) = self.form.save_progress().await {
            warn!(job_id = %attempt.job.id, error = %e, "Failed to save progress");
        }
        Ok(AttemptOutcome::Deferred(reason))
    }

    async fn fail(&mut self, attempt: &mut ApplicationAttempt, e: FormError) -> AttemptOutcome {
        error!(job_id = %attempt.job.id, state = %attempt.state, error = %e, "Application failed");
        if attempt.state != WizardState::Started
            && let Err(save) = self.form.save_progress().await
        {
            warn!(job_id = %attempt.job.id, error = %save, "Failed to save progress");
        }
        if let Err(invalid) = attempt.transition(WizardState::Failed) {
            debug!(error = %invalid, "Failure outside the form walk");
        }
        AttemptOutcome::Failed(e.to_string())
    }

    async fn set_status(&self, job: &mut Job, status: JobStatus) {
        if !job.status.can_transition_to(status) {
            warn!(job_id = %job.id, from = %job.status, to = %status, "Status change not allowed");
            return;
        }
        match self.jobs.update_job_status(&job.id, status).await {
            Ok(()) => {
                debug!(job_id = %job.id, status = %status, "Status updated");
                job.status = status;
            }
            Err(e) => warn!(job_id = %job.id, error = %e, "Failed to update job status"),
        }
    }
}
