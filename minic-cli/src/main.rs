use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use minic_core::{CompileOptions, ExecutionLimits, PipelineResult, compile};
use tracing_subscriber::EnvFilter;

/// Compile and run a minic program, then report every phase.
#[derive(Parser, Debug)]
#[command(name = "minic", version, about, long_about = None)]
struct Cli {
    /// Source file to run (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Also write the JSON report to this file
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[arg(long, value_name = "N", default_value_t = ExecutionLimits::default().step_budget)]
    step_budget: u64,

    #[arg(
        long,
        value_name = "MS",
        default_value_t = ExecutionLimits::default().timeout.as_millis() as u64
    )]
    timeout_ms: u64,

    #[arg(long, value_name = "N", default_value_t = ExecutionLimits::default().max_call_depth)]
    max_call_depth: usize,

    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = ExecutionLimits::default().max_output_bytes
    )]
    max_output_bytes: usize,

    /// Largest string a program may build
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = ExecutionLimits::default().max_value_bytes
    )]
    max_value_bytes: usize,

    /// Leave the metrics object out of the report
    #[arg(long)]
    no_metrics: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// The full pipeline report as JSON
    Json,
    /// Program output on stdout, diagnostics on stderr
    Text,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            limits: ExecutionLimits {
                step_budget: self.step_budget,
                timeout: Duration::from_millis(self.timeout_ms),
                max_call_depth: self.max_call_depth,
                max_output_bytes: self.max_output_bytes,
                max_value_bytes: self.max_value_bytes,
            },
            include_metrics: !self.no_metrics,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    execute(cli)
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read program from stdin")?;
            buffer
        }
    };

    let result = compile(&source, &cli.options());
    tracing::info!(success = result.success, "pipeline finished");

    if let Some(path) = &cli.output {
        write_output(path, &result)?;
    }
    match cli.format {
        Format::Json => println!("{}", result.to_json()?),
        Format::Text => print_text(&result),
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_text(result: &PipelineResult) {
    if let Some(output) = result.output() {
        print!("{output}");
    }
    for diagnostic in result.phases.diagnostics() {
        eprintln!("{diagnostic}");
    }
}

fn write_output(path: &str, result: &PipelineResult) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, result.to_json()?)
        .with_context(|| format!("failed to write report file {path}"))?;
    Ok(())
}
