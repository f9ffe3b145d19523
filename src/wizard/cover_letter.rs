//! Cover letter preparation for pages that ask for one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::ai::{self, CoverLetterRequest, JobAi};
use crate::config::{CoverLetterConfig, CoverLetterMode};
use crate::documents::Documents;
use crate::error::CoverLetterError;
use crate::model::Job;

/// File name for a generated letter: `<company>-<job id>-cover-letter.txt`,
/// with anything but ASCII letters, digits, `-` and `_` replaced.
pub fn letter_file_name(job: &Job) -> String {
    let clean = |s: &str| -> String {
        s.trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{}-{}-cover-letter.txt", clean(&job.company), clean(&job.id))
}

/// Produce the file to attach for `job` according to the configured mode.
/// Generation is abandoned after `ai_timeout`.
pub async fn prepare(
    config: &CoverLetterConfig,
    job_ai: &dyn JobAi,
    ai_timeout: Duration,
    documents: &Documents,
    job: &Job,
) -> Result<PathBuf, CoverLetterError> {
    match config.mode {
        CoverLetterMode::Skip => Err(CoverLetterError::Skipped),
        CoverLetterMode::UploadDefault => {
            let path = config
                .default_path
                .as_ref()
                .ok_or(CoverLetterError::NoDefault)?;
            if !tokio::fs::try_exists(path).await? {
                return Err(CoverLetterError::NoDefault);
            }
            Ok(path.clone())
        }
        CoverLetterMode::Generate => {
            let request = CoverLetterRequest {
                job_title: job.title.clone(),
                company: job.company.clone(),
                job_description: job.description.clone(),
                hiring_manager: job.hiring_manager.clone(),
                resume_text: documents.resume_text.clone(),
                examples: documents.cover_letter_examples.clone(),
                default_greeting: config.greeting.clone(),
                closing: config.closing.clone(),
            };
            let text = ai::within(ai_timeout, job_ai.generate_cover_letter(&request)).await?;
            write_letter(&config.output_dir, job, &text).await
        }
    }
}

async fn write_letter(dir: &Path, job: &Job, text: &str) -> Result<PathBuf, CoverLetterError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(letter_file_name(job));
    tokio::fs::write(&path, text).await?;
    info!(job_id = %job.id, path = %path.display(), "Cover letter written");
    Ok(path)
}
