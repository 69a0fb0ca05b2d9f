//! Aula CLI entry point.

use anyhow::Result;
use aula::cli::{commands, Cli, Commands};
use aula::config::Settings;
use aula::session::SessionConfig;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("aula={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Run {
            nrc,
            grupo,
            tema,
            estudiantes,
            pdfs,
            consentimiento,
            model,
        } => {
            let config = SessionConfig {
                nrc: nrc.clone(),
                grupo: grupo.clone(),
                tema: tema.clone(),
                estudiantes: estudiantes
                    .iter()
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect(),
                consentimiento: *consentimiento,
            };
            commands::run_session(config, pdfs, model.clone(), settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
