//! Domain model: jobs, questions and answers.

pub mod answer;
pub mod job;
pub mod question;

pub use answer::{AnswerRecord, AnswerSource, AutomationPolicy, StoredAnswer};
pub use job::{Job, JobStatus};
pub use question::{Question, QuestionKind, RawQuestion, Signature, normalize_text};
