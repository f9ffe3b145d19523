//! AI collaborator: answers application questions and writes cover letters.

pub mod assistant;
pub mod prompts;

pub use assistant::AssistantAi;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;

/// Reply the model gives when it cannot determine an answer.
pub const UNKNOWN_SENTINEL: &str = "ANSWER UNKNOWN";

/// Whether a model reply is the unknown sentinel.
pub fn is_unknown_reply(reply: &str) -> bool {
    reply.to_uppercase().contains(UNKNOWN_SENTINEL)
}

/// Run an AI call with an upper bound on its duration.
pub async fn within<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, LlmError>>,
) -> Result<T, LlmError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| LlmError::Timeout(limit))?
}

/// Expected answer shape, passed to the model as formatting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    FreeText { max_len: Option<usize> },
    WholeNumber,
    OneChoice,
    ManyChoices,
}

/// A previously answered question offered to the model as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedAnswer {
    pub question: String,
    pub answer: String,
}

/// Bounded context for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskContext {
    /// Always included in full.
    pub resume_text: String,
    pub related: Vec<RelatedAnswer>,
    pub format: AnswerFormat,
}

/// Inputs for a tailored cover letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverLetterRequest {
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    /// Omitted from the prompt when unknown.
    pub hiring_manager: Option<String>,
    pub resume_text: String,
    pub examples: Vec<String>,
    /// Opening used when no hiring manager is known.
    pub default_greeting: String,
    /// Sign-off the letter must end with.
    pub closing: String,
}

impl CoverLetterRequest {
    /// Opening line: addressed to the hiring manager when known.
    pub fn greeting(&self) -> String {
        match self.hiring_manager.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Dear {},", name),
            _ => self.default_greeting.clone(),
        }
    }
}

/// The AI collaborator.
#[async_trait]
pub trait JobAi: Send + Sync {
    /// Answer a question as the candidate. `choices` constrains the reply
    /// for choice questions. May return the unknown sentinel.
    async fn ask(
        &self,
        question: &str,
        choices: Option<&[String]>,
        context: &AskContext,
    ) -> Result<String, LlmError>;

    async fn generate_cover_letter(&self, request: &CoverLetterRequest)
    -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_detection_is_case_insensitive() {
        assert!(is_unknown_reply("answer unknown"));
        assert!(is_unknown_reply("Sorry - ANSWER UNKNOWN."));
        assert!(!is_unknown_reply("5"));
    }

    #[tokio::test(start_paused = true)]
    async fn within_reports_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, LlmError>("late")
        };
        let err = within(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(limit) if limit == Duration::from_secs(1)));

        let fast = within(Duration::from_secs(1), async { Ok::<_, LlmError>(7) }).await;
        assert_eq!(fast.unwrap(), 7);
    }

    #[test]
    fn greeting_falls_back_without_hiring_manager() {
        let mut request = CoverLetterRequest {
            job_title: "Dev".into(),
            company: "Acme".into(),
            job_description: String::new(),
            hiring_manager: None,
            resume_text: String::new(),
            examples: Vec::new(),
            default_greeting: "To the Acme team,".into(),
            closing: "Sincerely".into(),
        };
        assert_eq!(request.greeting(), "To the Acme team,");
        request.hiring_manager = Some("  ".into());
        assert_eq!(request.greeting(), "To the Acme team,");
        request.hiring_manager = Some("Dana Scully".into());
        assert_eq!(request.greeting(), "Dear Dana Scully,");
    }
}
