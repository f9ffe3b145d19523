use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use easy_apply::ai::AssistantAi;
use easy_apply::config::AppConfig;
use easy_apply::documents::Documents;
use easy_apply::forms::FixtureForm;
use easy_apply::human::TerminalPrompter;
use easy_apply::llm::create_provider;
use easy_apply::logging;
use easy_apply::store::{JobStore, LibSqlBackend};
use easy_apply::wizard::{WizardDeps, WizardDriver};

/// Apply to Easy Apply job listings with stored, AI and human answers.
#[derive(Debug, Parser)]
#[command(name = "easy-apply", version)]
struct Cli {
    /// Path to the TOML configuration file.
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let _log_guard = logging::init(&config.logging);

    eprintln!("📝 Easy Apply v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.ai.model);
    eprintln!(
        "   Policy: ask_when_needed={}, verify_ai_answers={}",
        config.automation.ask_when_needed, config.automation.verify_ai_answers
    );
    eprintln!("   Database: {}", config.database.path.display());
    eprintln!("   Board: {}\n", config.form.board.display());

    let llm = create_provider(&config.llm_config()?)?;
    let documents = Documents::load(&config.documents).await?;

    let store = Arc::new(
        LibSqlBackend::new_local(&config.database.path)
            .await
            .with_context(|| format!("opening database {}", config.database.path.display()))?,
    );

    let form = FixtureForm::open(&config.form.board).await?;
    let mut imported = 0;
    for job in form.jobs() {
        if store.upsert_job(&job).await? {
            imported += 1;
        }
    }
    tracing::info!(imported, "Jobs imported from board");

    let deps = WizardDeps {
        jobs: store.clone(),
        answers: store,
        ai: Arc::new(AssistantAi::new(llm)),
        human: Arc::new(TerminalPrompter::stdio()),
        documents,
    };
    let mut driver = WizardDriver::new(form, deps, &config);
    let summary = driver.run().await?;

    eprintln!("\n✅ {}", summary);
    Ok(())
}
