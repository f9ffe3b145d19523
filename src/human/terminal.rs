//! Terminal prompter: questions on stderr, answers from stdin.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use super::{HumanPrompter, HumanReply};
use crate::error::HumanError;
use crate::model::{Question, QuestionKind};
use crate::resolver::validate;

const SKIP: &str = "skip";

struct Io<R, W> {
    lines: Lines<R>,
    out: W,
}

/// Line-oriented prompter.
///
/// Enter accepts the prefill, `skip` abandons the question. Choices may be
/// typed by name or by number; multiple-choice answers are comma separated.
pub struct TerminalPrompter<R, W> {
    io: Mutex<Io<R, W>>,
}

impl TerminalPrompter<BufReader<tokio::io::Stdin>, tokio::io::Stderr> {
    /// Prompter over the process's stdin and stderr.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stderr())
    }
}

impl<R, W> TerminalPrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new(Io {
                lines: reader.lines(),
                out: writer,
            }),
        }
    }

    async fn ask(
        &self,
        header: &str,
        question: &Question,
        prefill: Option<&str>,
    ) -> Result<HumanReply, HumanError> {
        let mut io = self.io.lock().await;

        let mut text = format!("\n{header}\n  {}\n", question.text);
        for (i, choice) in question.choices.iter().enumerate() {
            text.push_str(&format!("    {}. {}\n", i + 1, choice));
        }
        match prefill {
            Some(value) => text.push_str(&format!(
                "  Suggested: {}\n  [Enter] accept, type a new answer, or '{SKIP}'\n",
                value.replace('\n', ", ")
            )),
            None => text.push_str(&format!("  Type an answer, or '{SKIP}'\n")),
        }
        io.out.write_all(text.as_bytes()).await?;

        loop {
            io.out.write_all(b"> ").await?;
            io.out.flush().await?;

            let Some(line) = io.lines.next_line().await? else {
                return Err(HumanError::Closed);
            };
            let line = line.trim();

            if line.eq_ignore_ascii_case(SKIP) {
                return Ok(HumanReply::Abandoned);
            }
            if line.is_empty() {
                if let Some(value) = prefill {
                    return Ok(HumanReply::Answered(value.to_string()));
                }
                continue;
            }

            match interpret(question, line) {
                Some(value) => return Ok(HumanReply::Answered(value)),
                None => {
                    let hint = match question.kind {
                        QuestionKind::Numeric => "Please enter a whole number.\n",
                        QuestionKind::SingleChoice => "Please pick one of the listed choices.\n",
                        QuestionKind::MultipleChoice => {
                            "Please pick listed choices, separated by commas.\n"
                        }
                        _ => "That answer does not fit this question.\n",
                    };
                    io.out.write_all(hint.as_bytes()).await?;
                }
            }
        }
    }
}

/// Turn typed input into a submittable value.
fn interpret(question: &Question, line: &str) -> Option<String> {
    match question.kind {
        QuestionKind::FileUpload => Some(line.to_string()),
        QuestionKind::SingleChoice => validate::constrain(question, &by_index(question, line)),
        QuestionKind::MultipleChoice => {
            let picked: Vec<String> = line
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| by_index(question, p))
                .collect();
            validate::constrain(question, &picked.join("\n"))
        }
        _ => validate::constrain(question, line),
    }
}

fn by_index(question: &Question, part: &str) -> String {
    part.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.choices.get(i))
        .cloned()
        .unwrap_or_else(|| part.to_string())
}

#[async_trait]
impl<R, W> HumanPrompter for TerminalPrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn prompt_for_answer(
        &self,
        question: &Question,
        prefill: Option<&str>,
    ) -> Result<HumanReply, HumanError> {
        self.ask("Answer needed:", question, prefill).await
    }

    async fn prompt_for_verification(
        &self,
        question: &Question,
        answer: &str,
    ) -> Result<HumanReply, HumanError> {
        self.ask("Please verify:", question, Some(answer)).await
    }
}
