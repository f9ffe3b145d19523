//! Stored answers and the automation policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::Signature;

/// Who produced a stored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Human,
    Ai,
    AiVerified,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::AiVerified => "ai_verified",
        }
    }

    /// Approved by a person, either typed or verified.
    pub fn is_human_approved(&self) -> bool {
        matches!(self, Self::Human | Self::AiVerified)
    }
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "ai" => Ok(Self::Ai),
            "ai_verified" => Ok(Self::AiVerified),
            _ => Err(format!("Unknown answer source: {}", s)),
        }
    }
}

/// An answer to write into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub signature: Signature,
    /// Question text as it appeared when answered (kept for relevance search).
    pub question_text: String,
    pub value: String,
    pub source: AnswerSource,
}

/// The canonical answer for a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnswer {
    pub signature: Signature,
    pub question_text: String,
    pub value: String,
    pub source: AnswerSource,
    /// Number of times this signature has been written.
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How much the run may act without a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationPolicy {
    /// Ask a person when no answer can be resolved.
    pub ask_when_needed: bool,
    /// Have a person confirm every resolved answer before it is submitted.
    pub verify_ai_answers: bool,
}

impl AutomationPolicy {
    pub fn new(ask_when_needed: bool, verify_ai_answers: bool) -> Self {
        Self {
            ask_when_needed,
            verify_ai_answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnswerSource::AiVerified).unwrap(),
            "\"ai_verified\""
        );
        assert_eq!("ai_verified".parse::<AnswerSource>().unwrap(), AnswerSource::AiVerified);
    }

    #[test]
    fn human_approved_sources() {
        assert!(AnswerSource::Human.is_human_approved());
        assert!(AnswerSource::AiVerified.is_human_approved());
        assert!(!AnswerSource::Ai.is_human_approved());
    }

    #[test]
    fn policy_defaults_to_fully_automatic() {
        let policy: AutomationPolicy = toml::from_str("").unwrap();
        assert_eq!(policy, AutomationPolicy::new(false, false));
    }
}
