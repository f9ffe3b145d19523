//! Human UI used by the gate.

mod terminal;

pub use terminal::TerminalPrompter;

use async_trait::async_trait;

use crate::error::HumanError;
use crate::model::Question;

/// What the human did with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanReply {
    Answered(String),
    /// The human chose not to answer now; the attempt is deferred.
    Abandoned,
}

/// Blocking prompts to the person running the tool.
///
/// Only the gate calls these; the driver is suspended while a prompt is open.
#[async_trait]
pub trait HumanPrompter: Send + Sync {
    /// Ask for an answer the resolver could not produce.
    async fn prompt_for_answer(
        &self,
        question: &Question,
        prefill: Option<&str>,
    ) -> Result<HumanReply, HumanError>;

    /// Show a resolved answer for approval or editing.
    async fn prompt_for_verification(
        &self,
        question: &Question,
        answer: &str,
    ) -> Result<HumanReply, HumanError>;
}
