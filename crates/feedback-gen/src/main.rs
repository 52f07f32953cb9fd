mod inputs;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "feedback-gen",
    version,
    about = "Generate compiler-surfaced feedback diagnostics from pattern rules"
)]
struct Cli {
    /// JSON document with the feedback rules
    rules: PathBuf,

    /// Newline-separated list of source files to scan
    sources: PathBuf,

    /// Write the generated artifact here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Unified diff restricting changed_files/changed_lines scopes
    #[arg(short, long)]
    diff: Option<PathBuf>,

    /// JSON document mapping rule categories to handlings
    #[arg(short, long)]
    workflow: Option<PathBuf>,
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(or_exit(run(&cli)));
}

fn or_exit(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("[feedback-gen] error: {error:#}");
            1
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let loaded = inputs::load(
        &cli.rules,
        &cli.sources,
        cli.diff.as_deref(),
        cli.workflow.as_deref(),
    )?;

    let stats = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            feedback_core::generate(
                &loaded.rules,
                &loaded.workflow,
                &loaded.diff,
                &loaded.sources,
                BufWriter::new(file),
            )?
        }
        None => feedback_core::generate(
            &loaded.rules,
            &loaded.workflow,
            &loaded.diff,
            &loaded.sources,
            io::stdout(),
        )?,
    };

    info!(
        sources = stats.sources,
        bytes = stats.bytes,
        matches = stats.matches,
        "feedback generated"
    );
    Ok(())
}
