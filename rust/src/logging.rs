//! Diagnostics for the command line tool. Library code only emits `tracing`
//! events; this module installs the subscriber that prints them to stderr so
//! stdout stays clean for decrypted output.

use std::io;
use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CONFIGPARSER_CRYPT_LOG";

static INIT_GUARD: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to parse log filter: {0}")]
    FilterParse(#[from] tracing_subscriber::filter::ParseError),
    #[error("logging already initialized")]
    AlreadyInitialized,
    #[error("failed to initialize subscriber: {0}")]
    TryInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Picks the filter directive: `CONFIGPARSER_CRYPT_LOG`, then `RUST_LOG`,
/// then `default_level`.
fn filter_directive<L>(lookup: L, default_level: Level) -> String
where
    L: Fn(&str) -> Option<String>,
{
    lookup(LOG_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| default_level.as_str().to_lowercase())
}

fn build_env_filter(default_level: Level) -> Result<EnvFilter, LoggingError> {
    let directive = filter_directive(|var| std::env::var(var).ok(), default_level);
    Ok(EnvFilter::try_new(directive)?)
}

/// Installs a plaintext stderr subscriber. Only the first call succeeds.
pub fn init_logging(default_level: Level) -> Result<(), LoggingError> {
    if INIT_GUARD.set(()).is_err() {
        return Err(LoggingError::AlreadyInitialized);
    }

    let filter = build_env_filter(default_level)?;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}
