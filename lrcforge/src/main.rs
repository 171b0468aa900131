//! lrcforge - Main entry point
//!
//! Transcribes a music directory into enriched `.lrc` files and offers a few
//! ledger inspection commands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lrcforge::db::ProcessingLedger;
use lrcforge::error::RunError;
use lrcforge::services::{
    AudioCatalog, BatchOrchestrator, FileStatus, GeminiClient, LineEnhancer, TranscriptionEngine,
};
use lrcforge_common::config::{Config, EngineKind};
use lrcforge_common::db::open_ledger_pool;
use lrcforge_common::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// sysexits EX_TEMPFAIL: the run stopped on a rate limit and can be retried later
const EXIT_RATE_LIMITED: u8 = 75;

/// Command-line arguments for lrcforge
#[derive(Parser, Debug)]
#[command(name = "lrcforge")]
#[command(about = "Transcribe music into time-synced, enriched LRC lyrics")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "LRCFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe every audio file under a directory
    Run {
        /// Directory to scan (defaults to the configured media root)
        directory: Option<PathBuf>,

        /// Transcription engine: openai|precise or faster|fast
        #[arg(short, long)]
        engine: Option<String>,
    },

    /// Inspect or repair the processing ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// List models available to the enrichment service
    Models,
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// List all entries
    List,
    /// Show one entry
    Show { identifier: String },
    /// Delete an entry
    Forget { identifier: String },
    /// Set an entry's transcription time (now, or an RFC 3339 timestamp)
    Touch {
        identifier: String,
        #[arg(long)]
        at: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let default_filter = format!(
        "lrcforge={level},lrcforge_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Run { directory, engine } => {
            if let Some(engine) = engine {
                config.transcription.engine = engine.parse::<EngineKind>()?;
            }
            let directory = directory.unwrap_or_else(|| config.media_root.clone());
            run(&config, directory).await
        }
        Command::Ledger { action } => {
            ledger_command(&config, action).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Models => {
            list_models(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(config: &Config, directory: PathBuf) -> Result<ExitCode> {
    if !directory.is_dir() {
        bail!("Not a directory: {}", directory.display());
    }

    info!("Starting lrcforge on {}", directory.display());
    info!("Media root: {}", config.media_root.display());

    let pool = open_ledger_pool(&config.database)
        .await
        .context("Failed to open processing ledger")?;

    let orchestrator = BatchOrchestrator::new(
        AudioCatalog::new(&config.audio_extensions),
        TranscriptionEngine::from_config(&config.transcription),
        build_enhancer(config)?,
        ProcessingLedger::new(pool),
        config.media_root.clone(),
        config.output.extension.clone(),
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current file");
            signal_token.cancel();
        }
    });

    match orchestrator.run(&directory, &cancel).await {
        Ok(report) => {
            for outcome in &report.outcomes {
                if let FileStatus::Failed { error } = &outcome.status {
                    warn!("Failed: {} ({})", outcome.identifier, error);
                }
            }
            info!(
                "Done: {} discovered, {} processed, {} skipped, {} failed",
                report.discovered,
                report.processed(),
                report.skipped(),
                report.failed()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(RunError::RateLimited {
            identifier,
            source,
            report,
        }) => {
            error!(
                "Stopped at {} after {} of {} files: {}",
                identifier,
                report.attempted(),
                report.discovered,
                source
            );
            Ok(ExitCode::from(EXIT_RATE_LIMITED))
        }
        Err(e) => Err(e).context("Transcription run failed"),
    }
}

/// Enhancer over Gemini, or a disabled one when no API key is configured
fn build_enhancer(config: &Config) -> Result<LineEnhancer> {
    let Some(api_key) = config.enrichment_api_key() else {
        warn!("No enrichment API key configured, writing original lines only");
        return Ok(LineEnhancer::disabled());
    };

    let client = GeminiClient::new(&config.enrichment, api_key.to_string())
        .context("Failed to initialize Gemini client")?;
    info!("Enrichment enabled (model: {})", client.model());

    Ok(LineEnhancer::new(
        Arc::new(client),
        config.enrichment.structured_output,
    ))
}

async fn ledger_command(config: &Config, action: LedgerAction) -> Result<()> {
    let pool = open_ledger_pool(&config.database)
        .await
        .context("Failed to open processing ledger")?;
    let ledger = ProcessingLedger::new(pool);

    match action {
        LedgerAction::List => {
            let entries = ledger.list_all().await?;
            for entry in &entries {
                println!(
                    "{}\t{}\t{}",
                    entry.file_id,
                    entry
                        .date_transcribed
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string()),
                    entry.identifier
                );
            }
            println!("{} entries", entries.len());
        }
        LedgerAction::Show { identifier } => match ledger.get(&identifier).await? {
            Some(entry) => println!("{:#?}", entry),
            None => bail!("No ledger entry for {}", identifier),
        },
        LedgerAction::Forget { identifier } => {
            if !ledger.delete(&identifier).await? {
                bail!("No ledger entry for {}", identifier);
            }
            println!("Removed {}", identifier);
        }
        LedgerAction::Touch { identifier, at } => {
            let when = match at {
                Some(value) => time::parse_rfc3339(&value)?,
                None => time::now(),
            };
            if !ledger.update_transcribed_at(&identifier, when).await? {
                bail!("No ledger entry for {}", identifier);
            }
            println!("Updated {} to {}", identifier, when.to_rfc3339());
        }
    }

    Ok(())
}

async fn list_models(config: &Config) -> Result<()> {
    let Some(api_key) = config.enrichment_api_key() else {
        bail!("No enrichment API key configured (set GEMINI_API_KEY)");
    };

    let client = GeminiClient::new(&config.enrichment, api_key.to_string())?;
    for model in client.list_models().await? {
        match model.display_name {
            Some(display_name) => println!("{}\t{}", model.name, display_name),
            None => println!("{}", model.name),
        }
    }

    Ok(())
}
