//! End-to-end runs of the wizard against a file-backed form.
//!
//! The model is a stub keyed on the question text, the human is scripted and
//! the database is in memory, so every run is deterministic.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use easy_apply::ai::AssistantAi;
use easy_apply::classify::classify;
use easy_apply::config::{AppConfig, CoverLetterMode};
use easy_apply::documents::Documents;
use easy_apply::error::{HumanError, LlmError};
use easy_apply::forms::FixtureForm;
use easy_apply::human::{HumanPrompter, HumanReply};
use easy_apply::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use easy_apply::model::{AnswerSource, AutomationPolicy, JobStatus, Question, RawQuestion};
use easy_apply::store::{AnswerStore, JobStore, LibSqlBackend};
use easy_apply::wizard::{WizardDeps, WizardDriver};

/// Answers by matching the question text; unknown otherwise.
struct StubLlm {
    answers: Vec<(&'static str, &'static str)>,
    asked: Mutex<Vec<String>>,
}

impl StubLlm {
    fn new(answers: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            answers,
            asked: Mutex::new(Vec::new()),
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let message = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.asked.lock().unwrap().push(message.clone());

        let content = if message.starts_with("Job Description") {
            "Dear Hiring Manager,\nI would love to help.\nSincerely,".to_string()
        } else {
            self.answers
                .iter()
                .find(|(needle, _)| message.contains(needle))
                .map(|(_, answer)| answer.to_string())
                .unwrap_or_else(|| "ANSWER UNKNOWN".to_string())
        };

        Ok(CompletionResponse {
            content,
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Replays queued answers; abandons once the queue is empty.
struct ScriptedHuman {
    replies: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedHuman {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn reply(&self, question: &Question) -> HumanReply {
        self.asked.lock().unwrap().push(question.text.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(value) => HumanReply::Answered(value),
            None => HumanReply::Abandoned,
        }
    }
}

#[async_trait]
impl HumanPrompter for ScriptedHuman {
    async fn prompt_for_answer(
        &self,
        question: &Question,
        _prefill: Option<&str>,
    ) -> Result<HumanReply, HumanError> {
        Ok(self.reply(question))
    }

    async fn prompt_for_verification(
        &self,
        question: &Question,
        _answer: &str,
    ) -> Result<HumanReply, HumanError> {
        Ok(self.reply(question))
    }
}

async fn write_board(dir: &Path) -> PathBuf {
    let path = dir.join("board.json");
    let board = json!({
        "postings": [{
            "job": {
                "id": "4012",
                "title": "Rust Engineer",
                "company": "Acme",
                "description": "Build reliable systems in Rust."
            },
            "pages": [
                { "questions": [
                    { "id": "phone", "label": "Mobile phone number", "widget": "tel",
                      "required": true, "current_value": "+1 555 0100" },
                    { "id": "years", "label": "Years of experience with Rust?", "widget": "number",
                      "required": true },
                    { "id": "remote", "label": "Are you willing to work on-site?", "widget": "radio",
                      "choices": ["Yes", "No"], "required": true }
                ]},
                { "questions": [], "cover_letter": true }
            ]
        }]
    });
    tokio::fs::write(&path, board.to_string()).await.unwrap();
    path
}

async fn run(
    board: &Path,
    store: &Arc<LibSqlBackend>,
    llm: Arc<StubLlm>,
    human: Arc<ScriptedHuman>,
    config: &AppConfig,
) -> easy_apply::wizard::RunSummary {
    let form = FixtureForm::open(board).await.unwrap();
    for job in form.jobs() {
        store.upsert_job(&job).await.unwrap();
    }
    let deps = WizardDeps {
        jobs: store.clone(),
        answers: store.clone(),
        ai: Arc::new(AssistantAi::new(llm)),
        human,
        documents: Documents {
            resume_text: "Six years of Rust at Initech.".into(),
            ..Documents::default()
        },
    };
    WizardDriver::new(form, deps, config).run().await.unwrap()
}

fn config(ask: bool, verify: bool, letters: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.automation = AutomationPolicy::new(ask, verify);
    config.cover_letter.mode = CoverLetterMode::Generate;
    config.cover_letter.output_dir = letters.to_path_buf();
    config
}

fn signature(raw: RawQuestion) -> easy_apply::model::Signature {
    classify(&raw).unwrap().signature
}

#[tokio::test]
async fn deferred_application_resumes_without_redoing_answers() {
    let dir = tempfile::tempdir().unwrap();
    let board = write_board(dir.path()).await;
    let letters = dir.path().join("letters");
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());

    // First run: nobody at the keyboard; the on-site question is unknown.
    let llm = Arc::new(StubLlm::new(vec![("Years of experience with Rust?", "6")]));
    let summary = run(
        &board,
        &store,
        llm.clone(),
        Arc::new(ScriptedHuman::new(&[])),
        &config(false, false, &letters),
    )
    .await;
    assert_eq!(summary.needs_answer, 1);
    assert_eq!(
        store.get_job("4012").await.unwrap().unwrap().status,
        JobStatus::NeedsAnswer
    );

    let years = signature(RawQuestion::new("years", "Years of experience with Rust?", "number"));
    let stored = store.lookup_answer(&years).await.unwrap().unwrap();
    assert_eq!(stored.value, "6");
    assert_eq!(stored.source, AnswerSource::Ai);
    assert!(llm.asked().iter().all(|m| !m.contains("phone")));

    let saved = FixtureForm::open(&board).await.unwrap();
    let progress = saved.saved_progress("4012").unwrap();
    assert_eq!(progress.answers.get("years"), Some(&"6".to_string()));
    assert!(!progress.answers.contains_key("remote"));

    // Second run: a human answers the on-site question.
    let llm = Arc::new(StubLlm::new(vec![]));
    let human = Arc::new(ScriptedHuman::new(&["No"]));
    let summary = run(
        &board,
        &store,
        llm.clone(),
        human.clone(),
        &config(true, false, &letters),
    )
    .await;
    assert_eq!(summary.submitted, 1);
    assert_eq!(
        store.get_job("4012").await.unwrap().unwrap().status,
        JobStatus::Submitted
    );

    // The years question was answered in the first run and is not asked again.
    assert!(llm.asked().iter().all(|m| !m.contains("Years of experience")));
    assert_eq!(
        *human.asked.lock().unwrap(),
        vec!["Are you willing to work on-site?".to_string()]
    );

    let remote = signature(
        RawQuestion::new("remote", "Are you willing to work on-site?", "radio")
            .with_choices(["Yes", "No"]),
    );
    let stored = store.lookup_answer(&remote).await.unwrap().unwrap();
    assert_eq!(stored.value, "No");
    assert_eq!(stored.source, AnswerSource::Human);

    let letter = letters.join("Acme-4012-cover-letter.txt");
    let text = tokio::fs::read_to_string(&letter).await.unwrap();
    assert!(text.starts_with("Dear Hiring Manager,"));

    let done = FixtureForm::open(&board).await.unwrap();
    assert!(done.saved_progress("4012").unwrap().submitted);
}

#[tokio::test]
async fn verified_answers_are_stored_as_ai_verified() {
    let dir = tempfile::tempdir().unwrap();
    let board = write_board(dir.path()).await;
    let letters = dir.path().join("letters");
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());

    let llm = Arc::new(StubLlm::new(vec![
        ("Years of experience with Rust?", "6"),
        ("work on-site", "yes"),
    ]));
    let human = Arc::new(ScriptedHuman::new(&["6", "Yes"]));
    let summary = run(&board, &store, llm, human, &config(false, true, &letters)).await;
    assert_eq!(summary.submitted, 1);

    let years = signature(RawQuestion::new("years", "Years of experience with Rust?", "number"));
    let stored = store.lookup_answer(&years).await.unwrap().unwrap();
    assert_eq!(stored.source, AnswerSource::AiVerified);

    let remote = signature(
        RawQuestion::new("remote", "Are you willing to work on-site?", "radio")
            .with_choices(["Yes", "No"]),
    );
    let stored = store.lookup_answer(&remote).await.unwrap().unwrap();
    assert_eq!(stored.value, "Yes");
    assert_eq!(stored.source, AnswerSource::AiVerified);
}

#[tokio::test]
async fn stored_answers_are_reused_across_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let board = write_board(dir.path()).await;
    let letters = dir.path().join("letters");
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());

    store
        .upsert_answer(&easy_apply::model::AnswerRecord {
            signature: signature(
                RawQuestion::new("x", "are you WILLING to work on-site?", "select")
                    .with_choices(["no", "yes"]),
            ),
            question_text: "Are you willing to work on-site?".into(),
            value: "yes".into(),
            source: AnswerSource::Human,
        })
        .await
        .unwrap();

    let llm = Arc::new(StubLlm::new(vec![("Years of experience with Rust?", "6")]));
    let summary = run(
        &board,
        &store,
        llm.clone(),
        Arc::new(ScriptedHuman::new(&[])),
        &config(false, false, &letters),
    )
    .await;
    assert_eq!(summary.submitted, 1);
    assert!(llm.asked().iter().all(|m| !m.contains("on-site")));

    let done = FixtureForm::open(&board).await.unwrap();
    assert_eq!(
        done.saved_progress("4012").unwrap().answers.get("remote"),
        Some(&"Yes".to_string())
    );
}
