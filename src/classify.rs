//! Question classifier: raw form fields to typed questions.

use tracing::debug;

use crate::error::ClassificationError;
use crate::model::{Question, QuestionKind, RawQuestion, Signature};

/// Dropdown placeholder options that are not real choices.
const PLACEHOLDER_CHOICES: &[&str] = &["select an option", "select", "please select", "--"];

/// Map a widget kind to a question kind. Unknown widgets fall back to free text.
pub fn kind_for_widget(widget: &str) -> QuestionKind {
    match widget.trim().to_ascii_lowercase().as_str() {
        "text" | "input" | "textarea" | "email" | "tel" | "url" => QuestionKind::FreeText,
        "number" | "numeric" => QuestionKind::Numeric,
        "select" | "dropdown" | "radio" | "combobox" => QuestionKind::SingleChoice,
        "checkbox" | "checkboxes" | "multiselect" => QuestionKind::MultipleChoice,
        "file" | "upload" | "document" => QuestionKind::FileUpload,
        other => {
            debug!(widget = other, "Unrecognized widget kind, treating as free text");
            QuestionKind::FreeText
        }
    }
}

/// Classify a raw form field.
///
/// Fails only when the field is structurally incomplete: no label, or a
/// choice widget without any choices.
pub fn classify(raw: &RawQuestion) -> Result<Question, ClassificationError> {
    let text = raw.label.trim();
    if text.is_empty() {
        return Err(ClassificationError::MissingLabel { id: raw.id.clone() });
    }

    let kind = kind_for_widget(&raw.widget);

    let choices: Vec<String> = if kind.is_choice() {
        raw.choices
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && !is_placeholder(c))
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    if kind.is_choice() && choices.is_empty() {
        return Err(ClassificationError::NoChoices {
            label: text.to_string(),
            widget: raw.widget.clone(),
        });
    }

    Ok(Question {
        id: raw.id.clone(),
        text: text.to_string(),
        signature: Signature::new(text, &choices),
        kind,
        choices,
        required: raw.required,
        max_len: raw.max_len,
    })
}

/// A free-text stand-in for a field that failed classification, so a
/// person can still be asked about it.
pub fn unclassified(raw: &RawQuestion) -> Question {
    let text = if raw.label.trim().is_empty() {
        format!("(unlabelled field {})", raw.id)
    } else {
        raw.label.trim().to_string()
    };
    Question {
        id: raw.id.clone(),
        signature: Signature::new(&text, &[]),
        text,
        kind: QuestionKind::FreeText,
        choices: Vec::new(),
        required: raw.required,
        max_len: raw.max_len,
    }
}

fn is_placeholder(choice: &str) -> bool {
    PLACEHOLDER_CHOICES
        .iter()
        .any(|p| choice.eq_ignore_ascii_case(p))
}
