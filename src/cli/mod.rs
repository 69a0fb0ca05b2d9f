//! CLI module for Aula.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aula - Classroom chat assistant with research logging
///
/// Students converse with an LLM about a configured topic, optionally
/// grounded in instructor-supplied PDF material. Every turn is logged for
/// research and can receive thumbs-up/down feedback.
#[derive(Parser, Debug)]
#[command(name = "aula")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a classroom session
    Run {
        /// Course code (asignatura/NRC)
        #[arg(long)]
        nrc: String,

        /// Group identifier
        #[arg(long)]
        grupo: String,

        /// Topic to work on (e.g. "Distribución Normal")
        #[arg(long)]
        tema: String,

        /// Participant names, comma separated
        #[arg(long, value_delimiter = ',')]
        estudiantes: Vec<String>,

        /// PDF materials to ground the assistant (optional, repeatable)
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,

        /// The group consents to research logging of this session
        #[arg(long)]
        consentimiento: bool,

        /// Override the chat model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init,
}
