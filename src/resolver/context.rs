//! Bounded context selection for AI questions.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::ai::{AnswerFormat, AskContext, RelatedAnswer};
use crate::model::{Signature, StoredAnswer};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}+#]+").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "you", "your", "are", "with", "have", "has", "how", "many", "much",
    "what", "which", "who", "why", "when", "where", "this", "that", "any", "our", "not", "yes",
    "did", "does", "can", "will", "would", "please", "years", "year", "experience", "from",
    "into", "about", "been", "were", "was", "all", "per",
];

const MAX_KEYWORDS: usize = 8;

/// Search keywords for a question: lowercase words of three or more
/// characters that are not stopwords, in order of appearance.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_KEYWORDS)
        .collect()
}

/// Builds the per-question context window.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    pub max_answers: usize,
    /// Budget for related question/answer text; the resume is not counted.
    pub max_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_answers: usize, max_chars: usize) -> Self {
        Self {
            max_answers,
            max_chars,
        }
    }

    /// Resume in full, plus as many related answers as fit the bounds.
    pub fn build(
        &self,
        resume_text: &str,
        format: AnswerFormat,
        candidates: Vec<StoredAnswer>,
        current: &Signature,
    ) -> AskContext {
        let mut related = Vec::new();
        let mut used = 0usize;

        for answer in candidates {
            if related.len() >= self.max_answers {
                break;
            }
            if &answer.signature == current {
                continue;
            }
            let cost = answer.question_text.len() + answer.value.len();
            if used + cost > self.max_chars {
                continue;
            }
            used += cost;
            related.push(RelatedAnswer {
                question: answer.question_text,
                answer: answer.value,
            });
        }

        AskContext {
            resume_text: resume_text.to_string(),
            related,
            format,
        }
    }
}
