//! apisurface CLI - public API surface extractor for Python packages.
//!
//! Features:
//! - Package name discovery from pyproject.toml / setup.py / layout
//! - Python stub or JSON rendering of the extracted surface
//! - Dependency types resolved from local virtual environments
//! - Usage coverage of sample code against a saved API model

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use apisurface_core::{
    analyze_usage, format_stubs, format_usage_plain, init_logging, load_config_or_default, to_json,
    ApiModel, ApiResult, ApiSurface, ApiSurfaceError, IoResultExt, LogFormat, SourceFilter,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Public API surface extractor for Python packages")]
pub struct Cli {
    /// Package root to extract, or the samples root with --usage
    path: PathBuf,

    /// Emit the API model as JSON
    #[arg(long)]
    json: bool,

    /// Emit Python stubs (default)
    #[arg(long, conflicts_with = "json")]
    stub: bool,

    /// Skip dependency resolution against installed packages
    #[arg(long)]
    no_deps: bool,

    /// Override the discovered package name
    #[arg(long, value_name = "NAME")]
    package: Option<String>,

    /// Analyze samples at PATH against an API model (`-` reads stdin)
    #[arg(long, value_name = "API_JSON")]
    usage: Option<String>,

    /// Print the usage report as a terminal summary
    #[arg(long, requires = "usage")]
    plain: bool,

    /// Write output to FILE (relative path) instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<String>,

    /// Log format on stderr: json or plain
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    log_format: LogFormat,
}

/// Validates an output file path to prevent path traversal attacks.
///
/// Rejects:
/// - Absolute paths (must be relative to current directory)
/// - Paths containing `..` (parent directory traversal)
/// - Paths with null bytes
fn validate_output_path(path: &str) -> ApiResult<PathBuf> {
    if path.contains('\0') {
        return Err(ApiSurfaceError::invalid_argument(
            "output path contains null bytes",
        ));
    }

    let p = PathBuf::from(path);

    if p.is_absolute() {
        return Err(ApiSurfaceError::invalid_argument(format!(
            "output path must be relative, not absolute: {}",
            path
        )));
    }

    if p
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ApiSurfaceError::invalid_argument(format!(
            "path traversal (..) not allowed in output paths: {}",
            path
        )));
    }

    Ok(p)
}

/// Loads an API model from a file, or from stdin for `-`.
fn read_model(source: &str) -> ApiResult<ApiModel> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).with_path("<stdin>")?;
        buf
    } else {
        let path = Path::new(source);
        if !path.is_file() {
            return Err(ApiSurfaceError::invalid_argument(format!(
                "--usage expects an API model file or `-`, got {}",
                source
            )));
        }
        fs::read_to_string(path).with_path(path)?
    };
    serde_json::from_str(&text).map_err(|e| {
        ApiSurfaceError::invalid_argument(format!("{} is not an API model: {}", source, e))
    })
}

fn emit(output: Option<&str>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            let safe_path = validate_output_path(path)?;
            fs::write(&safe_path, text)
                .with_context(|| format!("Failed to write {}", safe_path.display()))?;
            info!(file = %safe_path.display(), "output written");
            Ok(())
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn run_usage(cli: &Cli, model_source: &str) -> Result<String> {
    let model = read_model(model_source)?;
    let samples = cli.path.as_path();
    let filter = SourceFilter::from_config(&load_config_or_default(samples));
    let report = analyze_usage(samples, &model, &filter)
        .with_context(|| format!("Failed to analyze samples in {}", samples.display()))?;

    if cli.plain {
        Ok(format_usage_plain(&report))
    } else {
        to_json(&report)
    }
}

fn run_extract(cli: &Cli) -> Result<String> {
    let root = cli.path.as_path();
    let mut builder = ApiSurface::new(root).resolve_dependencies(!cli.no_deps);
    if let Some(name) = &cli.package {
        builder = builder.package_name(name);
    }
    let result = builder
        .extract()
        .with_context(|| format!("Failed to extract API from {}", root.display()))?;

    if cli.json && !cli.stub {
        to_json(&result.model)
    } else {
        Ok(format_stubs(&result.model))
    }
}

fn run(cli: &Cli) -> Result<()> {
    let text = match &cli.usage {
        Some(model_source) => run_usage(cli, model_source)?,
        None => run_extract(cli)?,
    };
    emit(cli.output.as_deref(), &text)
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] apisurface internal error: {}", info);
        eprintln!("[PANIC] The process will exit with a non-zero status.");
    }));

    let cli = Cli::parse();
    init_logging(cli.log_format);

    run(&cli)
}
