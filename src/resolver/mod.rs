//! Answer resolver: stored answer first, then the AI, else unknown.
//!
//! The resolver only reads the answer store. Writing is left to the gate so
//! that approval stays the single write path.

pub mod context;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ai::{self, JobAi};
use crate::model::{AnswerSource, Question, QuestionKind};
use crate::store::AnswerStore;

pub use context::ContextBuilder;

/// Where a known answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Exact signature hit in the answer store.
    Stored(AnswerSource),
    /// Freshly produced by the AI this run.
    Ai,
}

/// Outcome of resolving one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerResult {
    Known { value: String, origin: Origin },
    Unknown,
}

impl AnswerResult {
    pub fn stored(value: impl Into<String>, source: AnswerSource) -> Self {
        Self::Known {
            value: value.into(),
            origin: Origin::Stored(source),
        }
    }

    pub fn ai(value: impl Into<String>) -> Self {
        Self::Known {
            value: value.into(),
            origin: Origin::Ai,
        }
    }
}

/// Resolver limits.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Upper bound on one AI call; exceeding it resolves as unknown.
    pub ai_timeout: Duration,
    pub max_context_answers: usize,
    pub max_context_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ai_timeout: Duration::from_secs(60),
            max_context_answers: 20,
            max_context_chars: 8_000,
        }
    }
}

/// Resolves questions against the answer store and the AI.
pub struct AnswerResolver {
    store: Arc<dyn AnswerStore>,
    ai: Arc<dyn JobAi>,
    resume_text: String,
    config: ResolverConfig,
}

impl AnswerResolver {
    pub fn new(
        store: Arc<dyn AnswerStore>,
        ai: Arc<dyn JobAi>,
        resume_text: impl Into<String>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            ai,
            resume_text: resume_text.into(),
            config,
        }
    }

    /// Resolve a classified question.
    ///
    /// Never fails: store and AI errors degrade to a cache miss and an
    /// unknown answer respectively.
    pub async fn resolve(&self, question: &Question) -> AnswerResult {
        match self.store.lookup_answer(&question.signature).await {
            Ok(Some(stored)) => {
                debug!(signature = %question.signature, source = %stored.source, "Stored answer hit");
                let value = validate::constrain(question, &stored.value).unwrap_or(stored.value);
                return AnswerResult::stored(value, stored.source);
            }
            Ok(None) => {}
            Err(e) => warn!(signature = %question.signature, error = %e, "Answer lookup failed"),
        }

        let Some(format) = validate::format_for(question) else {
            debug!(kind = %question.kind, "Question kind is not answerable by the AI");
            return AnswerResult::Unknown;
        };

        let candidates = match self
            .store
            .search_answers(
                &context::keywords(&question.text),
                self.config.max_context_answers * 2,
            )
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Related answer search failed, asking without history");
                Vec::new()
            }
        };

        let builder =
            ContextBuilder::new(self.config.max_context_answers, self.config.max_context_chars);
        let ctx = builder.build(&self.resume_text, format, candidates, &question.signature);

        let choices = question.kind.is_choice().then_some(question.choices.as_slice());
        let reply = match ai::within(
            self.config.ai_timeout,
            self.ai.ask(&question.text, choices, &ctx),
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(signature = %question.signature, error = %e, "AI unavailable");
                return AnswerResult::Unknown;
            }
        };

        match validate::constrain(question, &reply) {
            Some(value) => {
                info!(signature = %question.signature, "AI answered");
                AnswerResult::ai(value)
            }
            None => {
                if question.kind == QuestionKind::FreeText || ai::is_unknown_reply(&reply) {
                    info!(signature = %question.signature, "AI could not answer");
                } else {
                    info!(signature = %question.signature, reply = %reply, "AI reply rejected");
                }
                AnswerResult::Unknown
            }
        }
    }
}
