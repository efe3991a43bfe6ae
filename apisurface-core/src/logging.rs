//! Structured logging using **tracing**.
//!
//! Library code only emits events (`warn!` for skipped files, `debug!` for
//! resolution decisions, `info!` for pipeline summaries). Binaries choose a
//! subscriber once at startup with one of the initializers below.
//!
//! Both initializers write to stderr so stdout stays clean for the model,
//! stub or usage report.

use tracing_subscriber::EnvFilter;

/// Log output format selected by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Machine-readable JSON lines
    #[default]
    Json,
    /// Human-readable single-line text
    Plain,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Initializes the global tracing subscriber with JSON output to stderr.
///
/// Call *once* at the beginning of the application's runtime.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=apisurface_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes the global tracing subscriber with compact text output to stderr.
pub fn init_plain_logging() {
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging in the requested format.
pub fn init_logging(format: LogFormat) {
    match format {
        LogFormat::Json => init_structured_logging(),
        LogFormat::Plain => init_plain_logging(),
    }
}

// Warnings by default; RUST_LOG overrides.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}
