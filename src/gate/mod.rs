//! Human-in-the-loop gate.
//!
//! [`decide`] is the policy table. [`Gate`] carries the decision out: it runs
//! the human prompt when one is needed and produces the answer record to
//! persist. The record is only written through [`Gate::commit`], once the
//! form has accepted the value.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::HumanError;
use crate::human::{HumanPrompter, HumanReply};
use crate::model::{AnswerRecord, AnswerSource, AutomationPolicy, Question};
use crate::resolver::{AnswerResult, Origin};
use crate::store::AnswerStore;

/// Result of the policy table for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Submit without asking. `record` is the source to store the value under,
    /// or `None` when the store already holds it.
    Submit {
        value: String,
        record: Option<AnswerSource>,
    },
    /// Ask the human. With a prefill this is a verification; the approved
    /// value is stored under `record`.
    PromptHuman {
        prefill: Option<String>,
        record: AnswerSource,
    },
    /// Abandon the attempt and leave the question for a later run.
    Defer,
}

/// The policy table, as a pure function of the two flags and the resolver
/// result.
pub fn decide(policy: AutomationPolicy, result: &AnswerResult) -> GateOutcome {
    let AutomationPolicy {
        ask_when_needed,
        verify_ai_answers,
    } = policy;

    match (ask_when_needed, verify_ai_answers, result) {
        (_, true, AnswerResult::Known { value, .. }) => GateOutcome::PromptHuman {
            prefill: Some(value.clone()),
            record: AnswerSource::AiVerified,
        },
        (true, _, AnswerResult::Unknown) => GateOutcome::PromptHuman {
            prefill: None,
            record: AnswerSource::Human,
        },
        (false, _, AnswerResult::Unknown) => GateOutcome::Defer,
        (_, false, AnswerResult::Known { value, origin }) => GateOutcome::Submit {
            value: value.clone(),
            record: match origin {
                Origin::Ai => Some(AnswerSource::Ai),
                Origin::Stored(_) => None,
            },
        },
    }
}

/// Final word on a question after any human interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Submit {
        value: String,
        /// Written via [`Gate::commit`] after the form accepts `value`.
        pending: Option<AnswerRecord>,
    },
    Defer,
}

/// Applies the automation policy, prompting the human when the table says so.
pub struct Gate {
    policy: AutomationPolicy,
    store: Arc<dyn AnswerStore>,
    human: Arc<dyn HumanPrompter>,
}

impl Gate {
    pub fn new(
        policy: AutomationPolicy,
        store: Arc<dyn AnswerStore>,
        human: Arc<dyn HumanPrompter>,
    ) -> Self {
        Self {
            policy,
            store,
            human,
        }
    }

    pub fn policy(&self) -> AutomationPolicy {
        self.policy
    }

    /// Decide and, when needed, prompt. An abandoned prompt defers.
    pub async fn settle(
        &self,
        question: &Question,
        result: AnswerResult,
    ) -> Result<Settlement, HumanError> {
        let outcome = decide(self.policy, &result);
        debug!(signature = %question.signature, outcome = ?outcome, "Gate decision");

        match outcome {
            GateOutcome::Defer => Ok(Settlement::Defer),
            GateOutcome::Submit { value, record } => Ok(Settlement::Submit {
                pending: record.map(|source| record_for(question, &value, source)),
                value,
            }),
            GateOutcome::PromptHuman {
                prefill: Some(suggested),
                record,
            } => {
                let reply = self
                    .human
                    .prompt_for_verification(question, &suggested)
                    .await?;
                let HumanReply::Answered(value) = reply else {
                    info!(signature = %question.signature, "Verification abandoned");
                    return Ok(Settlement::Defer);
                };

                let source = if value != suggested {
                    Some(AnswerSource::Human)
                } else {
                    match result {
                        // Already human-approved in the store; nothing new to record.
                        AnswerResult::Known {
                            origin: Origin::Stored(stored),
                            ..
                        } if stored.is_human_approved() => None,
                        _ => Some(record),
                    }
                };
                Ok(Settlement::Submit {
                    pending: source.map(|s| record_for(question, &value, s)),
                    value,
                })
            }
            GateOutcome::PromptHuman {
                prefill: None,
                record,
            } => match self.human.prompt_for_answer(question, None).await? {
                HumanReply::Answered(value) => Ok(Settlement::Submit {
                    pending: Some(record_for(question, &value, record)),
                    value,
                }),
                HumanReply::Abandoned => {
                    info!(signature = %question.signature, "Answer prompt abandoned");
                    Ok(Settlement::Defer)
                }
            },
        }
    }

    /// Persist an approved answer. A failed write is logged and never
    /// blocks the application.
    pub async fn commit(&self, record: &AnswerRecord) {
        match self.store.upsert_answer(record).await {
            Ok(stored) => debug!(
                signature = %stored.signature,
                source = %stored.source,
                revision = stored.revision,
                "Answer stored"
            ),
            Err(e) => warn!(signature = %record.signature, error = %e, "Failed to store answer"),
        }
    }
}

fn record_for(question: &Question, value: &str, source: AnswerSource) -> AnswerRecord {
    AnswerRecord {
        signature: question.signature.clone(),
        question_text: question.text.clone(),
        value: value.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::classify::classify;
    use crate::model::RawQuestion;
    use crate::store::LibSqlBackend;

    fn policy(ask: bool, verify: bool) -> AutomationPolicy {
        AutomationPolicy::new(ask, verify)
    }

    #[test]
    fn table_known_answers() {
        let ai = AnswerResult::ai("5");
        let stored = AnswerResult::stored("5", AnswerSource::Human);
        let verify = GateOutcome::PromptHuman {
            prefill: Some("5".into()),
            record: AnswerSource::AiVerified,
        };

        assert_eq!(decide(policy(true, true), &ai), verify);
        assert_eq!(decide(policy(false, true), &ai), verify);
        assert_eq!(decide(policy(false, true), &stored), verify);
        assert_eq!(
            decide(policy(true, false), &ai),
            GateOutcome::Submit {
                value: "5".into(),
                record: Some(AnswerSource::Ai)
            }
        );
        assert_eq!(
            decide(policy(true, false), &stored),
            GateOutcome::Submit {
                value: "5".into(),
                record: None
            }
        );
        assert_eq!(
            decide(policy(false, false), &stored),
            GateOutcome::Submit {
                value: "5".into(),
                record: None
            }
        );
    }

    #[test]
    fn table_unknown_answers() {
        let ask = GateOutcome::PromptHuman {
            prefill: None,
            record: AnswerSource::Human,
        };
        assert_eq!(decide(policy(true, true), &AnswerResult::Unknown), ask);
        assert_eq!(decide(policy(true, false), &AnswerResult::Unknown), ask);
        assert_eq!(
            decide(policy(false, true), &AnswerResult::Unknown),
            GateOutcome::Defer
        );
        assert_eq!(
            decide(policy(false, false), &AnswerResult::Unknown),
            GateOutcome::Defer
        );
    }

    /// Replays canned replies and records what was asked.
    struct ScriptedHuman {
        replies: Mutex<VecDeque<HumanReply>>,
        asked: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedHuman {
        fn new(replies: Vec<HumanReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                asked: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, question: &Question, prefill: Option<&str>) -> HumanReply {
            self.asked
                .lock()
                .unwrap()
                .push((question.text.clone(), prefill.map(str::to_string)));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(HumanReply::Abandoned)
        }
    }

    #[async_trait]
    impl HumanPrompter for ScriptedHuman {
        async fn prompt_for_answer(
            &self,
            question: &Question,
            prefill: Option<&str>,
        ) -> Result<HumanReply, HumanError> {
            Ok(self.next(question, prefill))
        }

        async fn prompt_for_verification(
            &self,
            question: &Question,
            answer: &str,
        ) -> Result<HumanReply, HumanError> {
            Ok(self.next(question, Some(answer)))
        }
    }

    async fn gate(
        ask: bool,
        verify: bool,
        replies: Vec<HumanReply>,
    ) -> (Gate, Arc<LibSqlBackend>, Arc<ScriptedHuman>) {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let human = Arc::new(ScriptedHuman::new(replies));
        (
            Gate::new(policy(ask, verify), store.clone(), human.clone()),
            store,
            human,
        )
    }

    fn python_question() -> Question {
        classify(&RawQuestion::new(
            "q1",
            "Years of experience with Python?",
            "number",
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn unverified_ai_answer_is_submitted_and_stored_as_ai() {
        let (gate, store, human) = gate(true, false, vec![]).await;
        let q = python_question();

        let settlement = gate.settle(&q, AnswerResult::ai("5")).await.unwrap();
        let Settlement::Submit { value, pending } = settlement else {
            panic!("expected submit");
        };
        assert_eq!(value, "5");
        gate.commit(&pending.unwrap()).await;

        let stored = store.lookup_answer(&q.signature).await.unwrap().unwrap();
        assert_eq!(stored.value, "5");
        assert_eq!(stored.source, AnswerSource::Ai);
        assert!(human.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_without_asking_defers() {
        let (gate, _store, human) = gate(false, false, vec![]).await;
        let settlement = gate
            .settle(&python_question(), AnswerResult::Unknown)
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Defer);
        assert!(human.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn approved_verification_records_ai_verified() {
        let (gate, _store, human) = gate(false, true, vec![HumanReply::Answered("5".into())]).await;
        let settlement = gate
            .settle(&python_question(), AnswerResult::ai("5"))
            .await
            .unwrap();
        let Settlement::Submit { pending, .. } = settlement else {
            panic!("expected submit");
        };
        assert_eq!(pending.unwrap().source, AnswerSource::AiVerified);
        assert_eq!(
            human.asked.lock().unwrap()[0].1.as_deref(),
            Some("5"),
            "verification shows the AI answer"
        );
    }

    #[tokio::test]
    async fn edited_verification_records_human() {
        let (gate, _store, _human) =
            gate(true, true, vec![HumanReply::Answered("7".into())]).await;
        let settlement = gate
            .settle(&python_question(), AnswerResult::ai("5"))
            .await
            .unwrap();
        assert_eq!(
            settlement,
            Settlement::Submit {
                value: "7".into(),
                pending: Some(AnswerRecord {
                    signature: python_question().signature,
                    question_text: "Years of experience with Python?".into(),
                    value: "7".into(),
                    source: AnswerSource::Human,
                }),
            }
        );
    }

    #[tokio::test]
    async fn approving_a_human_answer_writes_nothing_new() {
        let (gate, _store, _human) =
            gate(true, true, vec![HumanReply::Answered("5".into())]).await;
        let settlement = gate
            .settle(
                &python_question(),
                AnswerResult::stored("5", AnswerSource::Human),
            )
            .await
            .unwrap();
        assert_eq!(
            settlement,
            Settlement::Submit {
                value: "5".into(),
                pending: None
            }
        );
    }

    #[tokio::test]
    async fn approving_a_stored_ai_answer_upgrades_it() {
        let (gate, _store, _human) =
            gate(true, true, vec![HumanReply::Answered("5".into())]).await;
        let settlement = gate
            .settle(&python_question(), AnswerResult::stored("5", AnswerSource::Ai))
            .await
            .unwrap();
        let Settlement::Submit { pending, .. } = settlement else {
            panic!("expected submit");
        };
        assert_eq!(pending.unwrap().source, AnswerSource::AiVerified);
    }

    #[tokio::test]
    async fn abandoned_prompt_defers() {
        let (gate, _store, _human) = gate(true, false, vec![HumanReply::Abandoned]).await;
        let settlement = gate
            .settle(&python_question(), AnswerResult::Unknown)
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Defer);
    }

    #[tokio::test]
    async fn human_answer_round_trips_through_the_store() {
        let (gate, store, _human) =
            gate(true, false, vec![HumanReply::Answered("3".into())]).await;
        let Settlement::Submit { pending, .. } = gate
            .settle(&python_question(), AnswerResult::Unknown)
            .await
            .unwrap()
        else {
            panic!("expected submit");
        };
        gate.commit(&pending.unwrap()).await;

        let again = classify(&RawQuestion::new(
            "other-id",
            "  YEARS of experience   with python? ",
            "number",
        ))
        .unwrap();
        let stored = store.lookup_answer(&again.signature).await.unwrap().unwrap();
        assert_eq!(stored.value, "3");
        assert_eq!(stored.source, AnswerSource::Human);
    }
}
