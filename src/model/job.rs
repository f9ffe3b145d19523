//! Job postings and their application status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Discovered by search, never attempted.
    #[default]
    New,
    /// An application attempt is running (or was interrupted mid-run).
    InProgress,
    /// Deferred: a question could not be answered.
    NeedsAnswer,
    /// Deferred: the form wants a cover letter we could not provide.
    NeedsCoverLetter,
    /// Application submitted.
    Submitted,
    /// Not applied to (e.g. not an Easy Apply listing).
    Skipped,
    /// The form broke during an attempt.
    Error,
}

impl JobStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, target),
            (New, InProgress) | (New, Skipped) | (New, Error) |
            // An interrupted run left the job in progress; a new run re-enters it.
            (InProgress, InProgress) |
            (InProgress, NeedsAnswer) | (InProgress, NeedsCoverLetter) |
            (InProgress, Submitted) | (InProgress, Error) | (InProgress, Skipped) |
            // Resumable re-entry points
            (NeedsAnswer, InProgress) | (NeedsAnswer, Skipped) |
            (NeedsCoverLetter, InProgress) | (NeedsCoverLetter, Skipped) |
            (Error, InProgress) | (Error, Skipped)
        )
    }

    /// Submitted and skipped jobs are never touched again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Skipped)
    }

    /// Deferral statuses that a later run resumes from.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::NeedsAnswer | Self::NeedsCoverLetter)
    }

    /// Statuses the runner picks up. Errored jobs only when retrying is enabled.
    pub fn actionable(retry_errored: bool) -> Vec<JobStatus> {
        let mut statuses = vec![
            Self::New,
            Self::InProgress,
            Self::NeedsAnswer,
            Self::NeedsCoverLetter,
        ];
        if retry_errored {
            statuses.push(Self::Error);
        }
        statuses
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::NeedsAnswer => "needs_answer",
            Self::NeedsCoverLetter => "needs_cover_letter",
            Self::Submitted => "submitted",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "needs_answer" => Ok(Self::NeedsAnswer),
            "needs_cover_letter" => Ok(Self::NeedsCoverLetter),
            "submitted" => Ok(Self::Submitted),
            "skipped" => Ok(Self::Skipped),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// A job posting collected by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Listing identifier on the job board.
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Name of the hiring manager, when the listing shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hiring_manager: Option<String>,
    /// Whether the listing can be applied to without leaving the board.
    #[serde(default = "default_easy_apply")]
    pub easy_apply: bool,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default = "Utc::now")]
    pub collected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

fn default_easy_apply() -> bool {
    true
}

impl Job {
    /// Create a freshly collected Easy Apply job.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: None,
            url: None,
            description: String::new(),
            hiring_manager: None,
            easy_apply: true,
            status: JobStatus::New,
            collected_at: Utc::now(),
            applied_at: None,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set hiring manager name.
    pub fn with_hiring_manager(mut self, name: impl Into<String>) -> Self {
        self.hiring_manager = Some(name.into());
        self
    }

    /// Builder: set status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder: mark as an external (non Easy Apply) listing.
    pub fn external(mut self) -> Self {
        self.easy_apply = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_defaults() {
        let job = Job::new("123", "Engineer", "Acme");
        assert_eq!(job.status, JobStatus::New);
        assert!(job.easy_apply);
        assert!(job.hiring_manager.is_none());
        assert!(job.applied_at.is_none());
    }

    #[test]
    fn submitted_is_terminal() {
        for target in [
            JobStatus::New,
            JobStatus::InProgress,
            JobStatus::NeedsAnswer,
            JobStatus::Error,
        ] {
            assert!(!JobStatus::Submitted.can_transition_to(target));
        }
        assert!(JobStatus::Submitted.is_terminal());
    }

    #[test]
    fn deferrals_are_re_entry_points() {
        assert!(JobStatus::NeedsAnswer.is_resumable());
        assert!(JobStatus::NeedsCoverLetter.is_resumable());
        assert!(JobStatus::NeedsAnswer.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::NeedsCoverLetter.can_transition_to(JobStatus::InProgress));
        assert!(!JobStatus::NeedsAnswer.can_transition_to(JobStatus::Submitted));
    }

    #[test]
    fn actionable_statuses() {
        assert!(!JobStatus::actionable(false).contains(&JobStatus::Error));
        assert!(JobStatus::actionable(true).contains(&JobStatus::Error));
        assert!(!JobStatus::actionable(true).contains(&JobStatus::Submitted));
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            JobStatus::New,
            JobStatus::InProgress,
            JobStatus::NeedsAnswer,
            JobStatus::NeedsCoverLetter,
            JobStatus::Submitted,
            JobStatus::Skipped,
            JobStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("applied".parse::<JobStatus>().is_err());
    }

    #[test]
    fn job_deserializes_with_defaults() {
        let job: Job =
            serde_json::from_str(r#"{"id":"9","title":"Dev","company":"Initech"}"#).unwrap();
        assert_eq!(job.status, JobStatus::New);
        assert!(job.easy_apply);
        assert_eq!(job.description, "");
    }
}
