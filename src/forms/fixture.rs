//! File-backed form session.
//!
//! A board file holds job postings, each with its application pages and the
//! progress saved so far. `save_progress` writes the working answers back to
//! the file, so reopening an application resumes where it was left.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{FormSession, UploadTarget};
use crate::error::FormError;
use crate::model::{Job, RawQuestion};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Board {
    #[serde(default)]
    postings: Vec<Posting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Posting {
    job: Job,
    #[serde(default)]
    pages: Vec<Page>,
    /// Open attempts that fail before one succeeds.
    #[serde(default, skip_serializing_if = "is_zero")]
    open_failures: u32,
    #[serde(default)]
    progress: Progress,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Page {
    #[serde(default)]
    questions: Vec<RawQuestion>,
    /// Page has a cover letter slot.
    #[serde(default)]
    cover_letter: bool,
}

/// Saved state of one application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    /// Index of the current page; equal to the page count on the review page.
    pub page: usize,
    pub answers: BTreeMap<String, String>,
    pub uploads: BTreeMap<String, PathBuf>,
    pub cover_letter: Option<PathBuf>,
    pub submitted: bool,
}

impl Progress {
    fn has_answer(&self, id: &str) -> bool {
        self.answers.contains_key(id) || self.uploads.contains_key(id)
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

struct Working {
    posting: usize,
    progress: Progress,
    /// Questions already handed out on the current page.
    shown: HashSet<String>,
}

/// A [`FormSession`] over a JSON board file.
pub struct FixtureForm {
    path: PathBuf,
    board: Board,
    current: Option<Working>,
}

impl FixtureForm {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, FormError> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path).await?;
        let board: Board = serde_json::from_str(&raw)
            .map_err(|e| FormError::State(format!("invalid board {}: {}", path.display(), e)))?;
        info!(path = %path.display(), postings = board.postings.len(), "Opened form board");
        Ok(Self {
            path,
            board,
            current: None,
        })
    }

    /// Jobs listed on the board.
    pub fn jobs(&self) -> Vec<Job> {
        self.board.postings.iter().map(|p| p.job.clone()).collect()
    }

    /// Last saved progress for a job.
    pub fn saved_progress(&self, job_id: &str) -> Option<&Progress> {
        self.board
            .postings
            .iter()
            .find(|p| p.job.id == job_id)
            .map(|p| &p.progress)
    }

    fn working(&mut self) -> Result<(&Posting, &mut Working), FormError> {
        let working = self
            .current
            .as_mut()
            .ok_or_else(|| FormError::State("no application open".into()))?;
        Ok((&self.board.postings[working.posting], working))
    }

    async fn persist(&self) -> Result<(), FormError> {
        let json = serde_json::to_string_pretty(&self.board)
            .map_err(|e| FormError::State(format!("failed to encode board: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn page<'a>(posting: &'a Posting, working: &Working) -> Result<&'a Page, FormError> {
    posting
        .pages
        .get(working.progress.page)
        .ok_or_else(|| FormError::Navigation {
            reason: "no questions on the review page".into(),
        })
}

fn accepts(question: &RawQuestion, value: &str) -> bool {
    if let Some(max) = question.max_len
        && value.chars().count() > max
    {
        return false;
    }
    if question.choices.is_empty() {
        return true;
    }
    value
        .lines()
        .all(|line| question.choices.iter().any(|c| c == line))
}

#[async_trait]
impl FormSession for FixtureForm {
    async fn open_application(&mut self, job: &Job) -> Result<(), FormError> {
        let open_error = |reason: &str| FormError::OpenApplication {
            job_id: job.id.clone(),
            reason: reason.to_string(),
        };

        let index = self
            .board
            .postings
            .iter()
            .position(|p| p.job.id == job.id)
            .ok_or_else(|| open_error("posting not found"))?;
        let posting = &mut self.board.postings[index];

        if posting.open_failures > 0 {
            posting.open_failures -= 1;
            return Err(open_error("apply button did not respond"));
        }
        if posting.progress.submitted {
            return Err(open_error("already applied"));
        }

        debug!(job_id = %job.id, page = posting.progress.page, "Application opened");
        self.current = Some(Working {
            posting: index,
            progress: posting.progress.clone(),
            shown: HashSet::new(),
        });
        Ok(())
    }

    async fn next_question(&mut self) -> Result<Option<RawQuestion>, FormError> {
        let (posting, working) = self.working()?;
        let Some(page) = posting.pages.get(working.progress.page) else {
            return Ok(None);
        };

        let next = page
            .questions
            .iter()
            .find(|q| !working.progress.has_answer(&q.id) && !working.shown.contains(&q.id))
            .cloned();
        if let Some(q) = &next {
            working.shown.insert(q.id.clone());
        }
        Ok(next)
    }

    async fn submit_answer(&mut self, question_id: &str, value: &str) -> Result<(), FormError> {
        let (posting, working) = self.working()?;
        let question = page(posting, working)?
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| FormError::ElementNotFound {
                what: format!("question {}", question_id),
            })?;

        if !accepts(question, value) {
            return Err(FormError::State(format!(
                "value rejected for question {}",
                question_id
            )));
        }
        working
            .progress
            .answers
            .insert(question_id.to_string(), value.to_string());
        Ok(())
    }

    async fn requests_cover_letter(&mut self) -> Result<bool, FormError> {
        let (posting, working) = self.working()?;
        Ok(posting
            .pages
            .get(working.progress.page)
            .is_some_and(|p| p.cover_letter)
            && working.progress.cover_letter.is_none())
    }

    async fn upload_file(&mut self, target: UploadTarget, path: &Path) -> Result<(), FormError> {
        if !tokio::fs::try_exists(path).await? {
            return Err(FormError::Upload {
                path: path.display().to_string(),
                reason: "file does not exist".into(),
            });
        }

        let (posting, working) = self.working()?;
        let page = page(posting, working)?;
        match target {
            UploadTarget::Question(id) => {
                if !page.questions.iter().any(|q| q.id == id) {
                    return Err(FormError::ElementNotFound {
                        what: format!("upload field {}", id),
                    });
                }
                working.progress.uploads.insert(id, path.to_path_buf());
            }
            UploadTarget::CoverLetter => {
                if !page.cover_letter {
                    return Err(FormError::ElementNotFound {
                        what: "cover letter upload".into(),
                    });
                }
                working.progress.cover_letter = Some(path.to_path_buf());
            }
        }
        Ok(())
    }

    async fn save_progress(&mut self) -> Result<(), FormError> {
        let working = self
            .current
            .as_ref()
            .ok_or_else(|| FormError::State("no application open".into()))?;
        self.board.postings[working.posting].progress = working.progress.clone();
        self.persist().await?;
        debug!(path = %self.path.display(), "Progress saved");
        Ok(())
    }

    async fn advance(&mut self) -> Result<(), FormError> {
        let (posting, working) = self.working()?;
        let page = page(posting, working)?;

        if let Some(missing) = page
            .questions
            .iter()
            .find(|q| q.required && !q.is_prefilled() && !working.progress.has_answer(&q.id))
        {
            return Err(FormError::Navigation {
                reason: format!("required question '{}' is unanswered", missing.label),
            });
        }
        if page.cover_letter && working.progress.cover_letter.is_none() {
            return Err(FormError::Navigation {
                reason: "cover letter is missing".into(),
            });
        }

        working.progress.page += 1;
        working.shown.clear();
        Ok(())
    }

    async fn is_complete(&mut self) -> Result<bool, FormError> {
        let (posting, working) = self.working()?;
        Ok(working.progress.page >= posting.pages.len())
    }

    async fn submit_application(&mut self) -> Result<(), FormError> {
        if !self.is_complete().await? {
            return Err(FormError::Navigation {
                reason: "application is not on the review page".into(),
            });
        }
        if let Some(mut working) = self.current.take() {
            working.progress.submitted = true;
            self.board.postings[working.posting].progress = working.progress;
        }
        self.persist().await?;
        Ok(())
    }
}
