//! Resume and cover letter example loading.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::DocumentsConfig;
use crate::error::ConfigError;

/// Candidate documents handed to the AI and the uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documents {
    pub resume_text: String,
    /// File uploaded to resume fields, when configured.
    pub resume_file: Option<PathBuf>,
    pub cover_letter_examples: Vec<String>,
}

impl Documents {
    /// Read the resume text and example letters. A missing resume is an
    /// error; unreadable examples are skipped.
    pub async fn load(config: &DocumentsConfig) -> Result<Self, ConfigError> {
        let resume_text = tokio::fs::read_to_string(&config.resume_text)
            .await
            .map_err(|e| ConfigError::InvalidValue {
                key: "documents.resume_text".to_string(),
                message: format!("{}: {}", config.resume_text.display(), e),
            })?;

        let mut examples = Vec::with_capacity(config.cover_letter_examples.len());
        for path in &config.cover_letter_examples {
            match tokio::fs::read_to_string(path).await {
                Ok(text) if !text.trim().is_empty() => examples.push(text.trim().to_string()),
                Ok(_) => warn!(path = %path.display(), "Empty cover letter example skipped"),
                Err(e) => warn!(path = %path.display(), error = %e, "Cover letter example unreadable"),
            }
        }

        if let Some(file) = &config.resume_file
            && !tokio::fs::try_exists(file).await.unwrap_or(false)
        {
            warn!(path = %file.display(), "Resume file not found; resume fields will need a human");
        }

        info!(
            resume_chars = resume_text.len(),
            examples = examples.len(),
            "Documents loaded"
        );
        Ok(Self {
            resume_text: resume_text.trim().to_string(),
            resume_file: config.resume_file.clone(),
            cover_letter_examples: examples,
        })
    }
}
