//! `probs-build`: builds a PRObs system definition from a tree of Markdown
//! documents.
//!
//! **Outputs:**
//! - `<out>/output.ttl`: the merged system definition as Turtle
//! - `<out>/**/*.html`: rendered pages and the process/object indices
//!   (with `--html`)
//!
//! **Usage:**
//! ```
//! probs-build [--source <dir>] [--config <probs.toml>] [--out <dir>] [--html] [--strict]
//! ```
//!
//! Logging is controlled by `PROBS_LOG` (or `RUST_LOG`); set
//! `PROBS_LOG_FORMAT=json` for machine-readable logs.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use probs_docs::{build, BuildOptions, BuildOutput};
use probs_graph::Severity;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build a PRObs system definition.
#[derive(Parser)]
#[command(name = "probs-build", about = "Build a PRObs system definition from Markdown sources")]
struct Args {
    /// Directory containing the Markdown documents.
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Configuration file. Defaults to `probs.toml` in the source directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for generated artifacts.
    #[arg(long, default_value = "_build/probs")]
    out: PathBuf,

    /// Also render HTML pages.
    #[arg(long)]
    html: bool,

    /// Exit with an error status if any warning or error was reported.
    #[arg(long)]
    strict: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("PROBS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "probs=info".into());
    let format = std::env::var("PROBS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn print_summary(output: &BuildOutput) {
    for diagnostic in &output.diagnostics.entries {
        println!("  {diagnostic}");
    }
    for failure in &output.failures {
        println!("  {}: failed: {}", failure.document, failure.error);
    }
    println!(
        "{} triples, {} declarations, {} warnings, {} errors, {} failed documents",
        output.graph.len(),
        output.index.len(),
        output.diagnostics.count(Severity::Warning),
        output.diagnostics.count(Severity::Error),
        output.failures.len()
    );
}

fn run(args: &Args) -> Result<bool> {
    let config = args
        .config
        .clone()
        .unwrap_or_else(|| args.source.join("probs.toml"));
    let options = BuildOptions {
        source: args.source.clone(),
        config,
        out: args.out.clone(),
        html: args.html,
    };
    let output = build(&options)
        .with_context(|| format!("Failed to build {}", args.source.display()))?;

    print_summary(&output);
    println!("  Written: {}", args.out.join(probs_docs::writer::TURTLE_FILE).display());

    let failed = !output.failures.is_empty();
    let noisy = !output.diagnostics.is_empty();
    Ok(!failed && !(args.strict && noisy))
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {
            println!("Build complete.");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("Build finished with problems.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
