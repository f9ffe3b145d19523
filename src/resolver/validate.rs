//! Constrain free-form replies to what a question accepts.
//!
//! A reply that does not fit is rejected outright; nothing is coerced to a
//! nearest match.

use crate::ai::{self, AnswerFormat};
use crate::model::{Question, QuestionKind};

/// Answer format a question asks the model for. `None` for questions the
/// model cannot answer (file uploads).
pub fn format_for(question: &Question) -> Option<AnswerFormat> {
    match question.kind {
        QuestionKind::FreeText => Some(AnswerFormat::FreeText {
            max_len: question.max_len,
        }),
        QuestionKind::Numeric => Some(AnswerFormat::WholeNumber),
        QuestionKind::SingleChoice => Some(AnswerFormat::OneChoice),
        QuestionKind::MultipleChoice => Some(AnswerFormat::ManyChoices),
        QuestionKind::FileUpload => None,
    }
}

/// Validate a reply against the question. Returns the value to submit, or
/// `None` when the reply is the unknown sentinel or does not fit.
pub fn constrain(question: &Question, reply: &str) -> Option<String> {
    let reply = reply.trim();
    if reply.is_empty() || ai::is_unknown_reply(reply) {
        return None;
    }

    match question.kind {
        QuestionKind::SingleChoice => question
            .canonical_choice(strip_quotes(reply))
            .map(str::to_string),
        QuestionKind::MultipleChoice => {
            let mut selected: Vec<&str> = Vec::new();
            for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let line = strip_quotes(line.strip_prefix("- ").unwrap_or(line));
                let choice = question.canonical_choice(line)?;
                if !selected.contains(&choice) {
                    selected.push(choice);
                }
            }
            if selected.is_empty() {
                None
            } else {
                Some(selected.join("\n"))
            }
        }
        QuestionKind::Numeric => reply.parse::<u32>().ok().map(|n| n.to_string()),
        QuestionKind::FreeText => match question.max_len {
            Some(max) if reply.chars().count() > max => None,
            _ => Some(reply.to_string()),
        },
        QuestionKind::FileUpload => None,
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'').trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::RawQuestion;

    fn question(raw: RawQuestion) -> Question {
        classify(&raw).unwrap()
    }

    #[test]
    fn single_choice_outside_set_is_rejected() {
        let q = question(
            RawQuestion::new("1", "Sponsorship needed?", "radio").with_choices(["Yes", "No"]),
        );
        assert_eq!(constrain(&q, "no"), Some("No".into()));
        assert_eq!(constrain(&q, "\"Yes\""), Some("Yes".into()));
        assert_eq!(constrain(&q, "Probably not"), None);
        assert_eq!(constrain(&q, "Nope"), None);
    }

    #[test]
    fn multiple_choice_requires_every_line_to_match() {
        let q = question(
            RawQuestion::new("2", "Languages", "checkbox").with_choices(["Rust", "Go", "C"]),
        );
        assert_eq!(constrain(&q, "rust\n- Go\nrust"), Some("Rust\nGo".into()));
        assert_eq!(constrain(&q, "Rust\nHaskell"), None);
    }

    #[test]
    fn numeric_requires_whole_number() {
        let q = question(RawQuestion::new("3", "Years of Rust?", "number"));
        assert_eq!(constrain(&q, " 6 "), Some("6".into()));
        assert_eq!(constrain(&q, "6 years"), None);
        assert_eq!(constrain(&q, "2.5"), None);
    }

    #[test]
    fn free_text_respects_max_len() {
        let q = question(RawQuestion::new("4", "Summary", "textarea").with_max_len(5));
        assert_eq!(constrain(&q, "short"), Some("short".into()));
        assert_eq!(constrain(&q, "too long"), None);
    }

    #[test]
    fn sentinel_is_rejected_for_every_kind() {
        let q = question(RawQuestion::new("5", "Why us?", "text"));
        assert_eq!(constrain(&q, "ANSWER UNKNOWN"), None);
        assert_eq!(constrain(&q, ""), None);
    }

    #[test]
    fn file_uploads_have_no_model_format() {
        let q = question(RawQuestion::new("6", "Portfolio", "file"));
        assert_eq!(format_for(&q), None);
        assert_eq!(constrain(&q, "/tmp/portfolio.pdf"), None);
    }
}
