//! Wizard states and the per-job attempt record.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::FormError;
use crate::model::{Job, JobStatus, Question};

/// Where the driver is within one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Idle,
    Started,
    PerQuestion,
    CoverLetterStep,
    ReviewStep,
    Submitted,
    Deferred,
    Failed,
}

impl WizardState {
    pub fn can_transition_to(&self, target: WizardState) -> bool {
        use WizardState::*;

        matches!(
            (self, target),
            (Idle, Started)
                | (Started, PerQuestion)
                | (Started, Failed)
                | (PerQuestion, PerQuestion)
                | (PerQuestion, CoverLetterStep)
                | (PerQuestion, ReviewStep)
                | (PerQuestion, Deferred)
                | (PerQuestion, Failed)
                | (CoverLetterStep, PerQuestion)
                | (CoverLetterStep, ReviewStep)
                | (CoverLetterStep, Deferred)
                | (CoverLetterStep, Failed)
                | (ReviewStep, Submitted)
                | (ReviewStep, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Deferred | Self::Failed)
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::PerQuestion => "per_question",
            Self::CoverLetterStep => "cover_letter_step",
            Self::ReviewStep => "review_step",
            Self::Submitted => "submitted",
            Self::Deferred => "deferred",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why an attempt was set aside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    NeedsAnswer,
    NeedsCoverLetter,
}

impl DeferReason {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::NeedsAnswer => JobStatus::NeedsAnswer,
            Self::NeedsCoverLetter => JobStatus::NeedsCoverLetter,
        }
    }
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Submitted,
    Deferred(DeferReason),
    Failed(String),
    /// Not an Easy Apply listing; the form was never opened.
    Skipped,
}

impl AttemptOutcome {
    /// Job status recorded for this outcome.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Submitted => JobStatus::Submitted,
            Self::Deferred(reason) => reason.status(),
            Self::Failed(_) => JobStatus::Error,
            Self::Skipped => JobStatus::Skipped,
        }
    }
}

/// Position within the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Pages advanced past in this attempt.
    pub page: usize,
    /// Questions visited on the current page.
    pub question: usize,
}

/// Run-scoped state for one job.
///
/// Nothing here is persisted; a deferred attempt is resumed from the form's
/// saved progress and the answer store.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationAttempt {
    pub id: Uuid,
    pub job: Job,
    pub state: WizardState,
    /// Questions classified in this attempt, in the order seen.
    pub questions: Vec<Question>,
    pub cursor: Cursor,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    page_ids: HashSet<String>,
}

impl ApplicationAttempt {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            state: WizardState::Idle,
            questions: Vec::new(),
            cursor: Cursor::default(),
            started_at: Utc::now(),
            page_ids: HashSet::new(),
        }
    }

    /// Move to `target`, rejecting transitions the state machine does not allow.
    pub fn transition(&mut self, target: WizardState) -> Result<(), FormError> {
        if !self.state.can_transition_to(target) {
            return Err(FormError::State(format!(
                "invalid wizard transition {} -> {}",
                self.state, target
            )));
        }
        debug!(
            job_id = %self.job.id,
            attempt = %self.id,
            from = %self.state,
            to = %target,
            "Wizard transition"
        );
        self.state = target;
        Ok(())
    }

    /// Mark a question id as visited on the current page. Returns `false`
    /// when the form offers the same question again.
    pub fn visit(&mut self, id: &str) -> bool {
        if !self.page_ids.insert(id.to_string()) {
            return false;
        }
        self.cursor.question += 1;
        true
    }

    pub fn record_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    pub fn next_page(&mut self) {
        self.cursor.page += 1;
        self.cursor.question = 0;
        self.page_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::RawQuestion;

    #[test]
    fn happy_path_transitions() {
        let mut attempt = ApplicationAttempt::new(Job::new("1", "Dev", "Acme"));
        for state in [
            WizardState::Started,
            WizardState::PerQuestion,
            WizardState::CoverLetterStep,
            WizardState::PerQuestion,
            WizardState::ReviewStep,
            WizardState::Submitted,
        ] {
            attempt.transition(state).unwrap();
        }
        assert!(attempt.state.is_terminal());
    }

    #[test]
    fn review_never_defers() {
        assert!(!WizardState::ReviewStep.can_transition_to(WizardState::Deferred));
        assert!(!WizardState::Idle.can_transition_to(WizardState::PerQuestion));
        assert!(!WizardState::Submitted.can_transition_to(WizardState::Started));
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let mut attempt = ApplicationAttempt::new(Job::new("1", "Dev", "Acme"));
        assert!(attempt.transition(WizardState::Submitted).is_err());
        assert_eq!(attempt.state, WizardState::Idle);
    }

    #[test]
    fn visits_reset_with_the_page() {
        let mut attempt = ApplicationAttempt::new(Job::new("1", "Dev", "Acme"));
        assert!(attempt.visit("a"));
        attempt.record_question(classify(&RawQuestion::new("a", "Name", "text")).unwrap());
        assert!(!attempt.visit("a"));
        assert_eq!(attempt.cursor.question, 1);

        attempt.next_page();
        assert!(attempt.visit("a"));
        assert_eq!(attempt.cursor, Cursor { page: 1, question: 1 });
        assert_eq!(attempt.questions.len(), 1);
    }

    #[test]
    fn outcome_status() {
        assert_eq!(
            AttemptOutcome::Deferred(DeferReason::NeedsCoverLetter).status(),
            JobStatus::NeedsCoverLetter
        );
        assert_eq!(AttemptOutcome::Failed("x".into()).status(), JobStatus::Error);
    }
}
