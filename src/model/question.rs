//! Application form questions.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Fold case and whitespace: trim, lowercase, collapse runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

/// Lookup key for stored answers: the normalized question text plus its
/// normalized choice set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Build a signature from question text and its (possibly empty) choices.
    ///
    /// Choice order does not matter; duplicates collapse.
    pub fn new(text: &str, choices: &[String]) -> Self {
        let text = normalize_text(text);
        let mut set: Vec<String> = choices
            .iter()
            .map(|c| normalize_text(c))
            .filter(|c| !c.is_empty())
            .collect();
        set.sort();
        set.dedup();

        if set.is_empty() {
            Self(text)
        } else {
            Self(format!("{} [{}]", text, set.join(" | ")))
        }
    }

    /// Wrap an already-normalized key read back from storage.
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type of answer a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    Numeric,
    SingleChoice,
    MultipleChoice,
    FileUpload,
}

impl QuestionKind {
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::Numeric => "numeric",
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
            Self::FileUpload => "file_upload",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question as scraped from the live form, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    /// Form-local identifier used to write the answer back.
    pub id: String,
    /// Label text shown next to the input.
    pub label: String,
    /// Input widget kind as reported by the form ("text", "select", ...).
    pub widget: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub required: bool,
    /// Maximum answer length, when the form states one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    /// Value already present in the field (profile prefill or a saved attempt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
}

impl RawQuestion {
    pub fn new(id: impl Into<String>, label: impl Into<String>, widget: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            widget: widget.into(),
            choices: Vec::new(),
            required: true,
            max_len: None,
            current_value: None,
        }
    }

    /// Builder: set choices.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the value already in the field.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    /// Builder: set maximum length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Builder: mark optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Whether the field already holds a non-blank value.
    pub fn is_prefilled(&self) -> bool {
        self.current_value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }
}

/// A classified question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Original label text.
    pub text: String,
    pub signature: Signature,
    pub kind: QuestionKind,
    /// Allowed choices in form order (empty for non-choice questions).
    pub choices: Vec<String>,
    pub required: bool,
    pub max_len: Option<usize>,
}

impl Question {
    /// Find the form's spelling of a choice, ignoring case and surrounding whitespace.
    pub fn canonical_choice(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.choices
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }

    /// Prompt-ready rendering: the text, followed by choices when present.
    pub fn render(&self) -> String {
        if self.choices.is_empty() {
            self.text.clone()
        } else {
            format!("{}\nChoices: {}", self.text, self.choices.join(" | "))
        }
    }
}
