//! `JobAi` over any `LlmProvider`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::prompts;
use super::{AskContext, CoverLetterRequest, JobAi};
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};

const ANSWER_MAX_TOKENS: u32 = 512;
const COVER_LETTER_MAX_TOKENS: u32 = 2048;

/// Answers questions and writes cover letters with a chat model.
pub struct AssistantAi {
    llm: Arc<dyn LlmProvider>,
}

impl AssistantAi {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    async fn complete_text(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let response = self.llm.complete(request).await?;
        let content = response.content.trim();

        if content.is_empty() {
            let reason = if response.finish_reason == FinishReason::Length {
                "response truncated with no content"
            } else {
                "empty response"
            };
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: reason.to_string(),
            });
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl JobAi for AssistantAi {
    async fn ask(
        &self,
        question: &str,
        choices: Option<&[String]>,
        context: &AskContext,
    ) -> Result<String, LlmError> {
        debug!(question, related = context.related.len(), "Asking model");

        let request = CompletionRequest::new(vec![
            ChatMessage::system(prompts::answer_system_prompt(context)),
            ChatMessage::user(prompts::question_message(question, choices)),
        ])
        .with_max_tokens(ANSWER_MAX_TOKENS)
        .with_temperature(0.0);

        self.complete_text(request).await
    }

    async fn generate_cover_letter(
        &self,
        request: &CoverLetterRequest,
    ) -> Result<String, LlmError> {
        info!(company = %request.company, title = %request.job_title, "Writing cover letter");

        let completion = CompletionRequest::new(vec![
            ChatMessage::system(prompts::cover_letter_system_prompt(request)),
            ChatMessage::user(prompts::cover_letter_message(request)),
        ])
        .with_max_tokens(COVER_LETTER_MAX_TOKENS)
        .with_temperature(0.7);

        self.complete_text(completion).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ai::AnswerFormat;
    use crate::llm::{CompletionResponse, Role};

    /// Records requests and replies with a fixed string.
    struct StubLlm {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn context() -> AskContext {
        AskContext {
            resume_text: "Resume".into(),
            related: Vec::new(),
            format: AnswerFormat::FreeText { max_len: None },
        }
    }

    #[tokio::test]
    async fn ask_trims_reply_and_sends_system_prompt() {
        let llm = Arc::new(StubLlm::new("  5 \n"));
        let ai = AssistantAi::new(llm.clone());

        let answer = ai.ask("Years of Python?", None, &context()).await.unwrap();
        assert_eq!(answer, "5");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert!(seen[0].messages[1].content.contains("Years of Python?"));
    }

    #[tokio::test]
    async fn empty_reply_is_invalid_response() {
        let ai = AssistantAi::new(Arc::new(StubLlm::new("   ")));
        let err = ai.ask("Anything?", None, &context()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
