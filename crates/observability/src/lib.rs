//! # Observability
//!
//! Logging setup shared by every FindMySong crate.
//!
//! Crates are **log producers** only. They use the standard `tracing` macros
//! and never decide where output goes. The binary calls
//! [`init_with_config`] once at startup, which installs:
//!
//! - an `EnvFilter` (`RUST_LOG` wins over the configured default level)
//! - an optional JSON-lines file layer (one event per line, flushed per line)
//! - an optional compact stderr layer for interactive use
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "findmysong".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! ```
//!
//! Secrets (access and refresh tokens) must only reach a log line through
//! [`redact`].

mod file_writer;

pub use file_writer::LogFileWriter;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Number of leading characters of a secret kept by [`redact`].
const REDACT_VISIBLE_PREFIX: usize = 4;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, recorded once at startup.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSON-lines log file. No file output when `None`.
    pub log_path: Option<PathBuf>,

    /// Also emit human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings (stderr only).
pub fn init(service_name: &str) -> io::Result<()> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        also_stderr: true,
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
///
/// Installing a second global subscriber is a no-op, so tests and embedders
/// may call this more than once.
pub fn init_with_config(config: LogConfig) -> io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let file_layer = match &config.log_path {
        Some(path) => Some(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_writer(LogFileWriter::open(path)?),
        ),
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            log_path = ?config.log_path,
            "observability initialized"
        );
    }

    Ok(())
}

/// Render a secret for logging: a short prefix plus its length.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(REDACT_VISIBLE_PREFIX).collect();
    if secret.chars().count() <= REDACT_VISIBLE_PREFIX * 2 {
        return format!("***(len={})", secret.len());
    }
    format!("{}***(len={})", prefix, secret.len())
}

/// Describe a remote response body by length and digest, so error logs can
/// tell bodies apart without recording provider text.
pub fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};
