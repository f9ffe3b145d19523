//! Configuration types.
//!
//! Everything comes from one TOML file; every field has a default so a
//! minimal file only needs what differs. The API key is the exception: it is
//! read from the environment (or a `.env` file) and never from the TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::model::AutomationPolicy;
use crate::resolver::ResolverConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub automation: AutomationPolicy,
    pub ai: AiConfig,
    pub documents: DocumentsConfig,
    pub cover_letter: CoverLetterConfig,
    pub database: DatabaseConfig,
    pub form: FormConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// Model selection and context bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub backend: LlmBackend,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-question AI timeout; an expired call resolves as unknown.
    pub timeout_secs: u64,
    pub max_context_answers: usize,
    pub max_context_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::OpenAi,
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_context_answers: 20,
            max_context_chars: 8_000,
        }
    }
}

/// Resume and example letters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Plain-text resume given to the AI.
    pub resume_text: PathBuf,
    /// Resume file uploaded to resume fields.
    pub resume_file: Option<PathBuf>,
    pub cover_letter_examples: Vec<PathBuf>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            resume_text: PathBuf::from("resume.txt"),
            resume_file: None,
            cover_letter_examples: Vec::new(),
        }
    }
}

/// How cover letter requests are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverLetterMode {
    /// Leave the job for later with `needs_cover_letter`.
    #[default]
    Skip,
    /// Attach the configured default letter.
    #[serde(rename = "default")]
    UploadDefault,
    /// Write a tailored letter with the AI and attach it.
    Generate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoverLetterConfig {
    pub mode: CoverLetterMode,
    pub default_path: Option<PathBuf>,
    /// Where generated letters are written.
    pub output_dir: PathBuf,
    /// Opening used when the posting names no hiring manager.
    pub greeting: String,
    /// Sign-off every generated letter ends with.
    pub closing: String,
}

impl Default for CoverLetterConfig {
    fn default() -> Self {
        Self {
            mode: CoverLetterMode::Skip,
            default_path: None,
            output_dir: PathBuf::from("cover_letters"),
            greeting: "Dear Hiring Manager,".to_string(),
            closing: "Sincerely,".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/easy-apply.db"),
        }
    }
}

/// Form session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Board file backing the form session.
    pub board: PathBuf,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            board: PathBuf::from("board.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Page limit per application; a form that never completes fails.
    pub max_steps: usize,
    /// Re-attempt jobs left in `error` by an earlier run.
    pub retry_errored: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            retry_errored: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    /// Also write a daily-rotated log file here.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
            file_prefix: "easy-apply.log".to_string(),
        }
    }
}

impl AppConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cover_letter.mode == CoverLetterMode::UploadDefault
            && self.cover_letter.default_path.is_none()
        {
            return Err(ConfigError::MissingRequired {
                key: "cover_letter.default_path".to_string(),
                hint: "mode = \"default\" needs a letter to upload".to_string(),
            });
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ai.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.run.max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "run.max_steps".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// LLM settings with the API key taken from the environment.
    pub fn llm_config(&self) -> Result<LlmConfig, ConfigError> {
        dotenvy::dotenv().ok();
        let key = std::env::var(&self.ai.api_key_env)
            .map_err(|_| ConfigError::MissingEnvVar(self.ai.api_key_env.clone()))?;
        Ok(LlmConfig {
            backend: self.ai.backend,
            api_key: SecretString::from(key),
            model: self.ai.model.clone(),
        })
    }

    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            ai_timeout: Duration::from_secs(self.ai.timeout_secs),
            max_context_answers: self.ai.max_context_answers,
            max_context_chars: self.ai.max_context_chars,
        }
    }
}
