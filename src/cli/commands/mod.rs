//! Command implementations.

mod config;
mod run;

pub use config::run_config;
pub use run::run_session;
