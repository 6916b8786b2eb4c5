use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strata::{CancellationToken, ConcurrencyLimit, ExecuteOptions, Scheduler};

mod batch;
mod demo;

use batch::{BatchFile, CliError};
use demo::DemoExecutor;

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
#[command(about = "Strata CLI - plan and run dependency-aware invocation batches")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a batch and print its execution levels
    Plan {
        /// Path to a JSON batch file
        batch: PathBuf,
    },
    /// Execute a batch with the built-in demo executor
    Run {
        /// Path to a JSON batch file
        batch: PathBuf,
        /// TOML file with scheduler options
        #[arg(long)]
        config: Option<PathBuf>,
        /// Timeout for each invocation (e.g. "5s")
        #[arg(long, value_parser = humantime::parse_duration)]
        per_invocation_timeout: Option<Duration>,
        /// Wall-clock budget for the whole batch (e.g. "1m")
        #[arg(long, value_parser = humantime::parse_duration)]
        batch_timeout: Option<Duration>,
        /// Max concurrent invocations within one level
        #[arg(long)]
        max_concurrency: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter, // fallback to default if parsing fails
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Plan { batch } => plan(&batch),
        Commands::Run {
            batch,
            config,
            per_invocation_timeout,
            batch_timeout,
            max_concurrency,
        } => resolve_options(
            config.as_deref(),
            per_invocation_timeout,
            batch_timeout,
            max_concurrency,
        )
        .and_then(|options| run(&batch, options)),
    };

    if let Err(e) = result {
        if let CliError::Structural(structural) = &e
            && let Ok(rendered) = serde_json::to_string_pretty(structural)
        {
            println!("{rendered}");
        }
        tracing::error!(error = %e, code = e.error_code(), "Command failed");
        std::process::exit(e.exit_code());
    }
}

fn plan(path: &Path) -> Result<(), CliError> {
    let batch = BatchFile::load(path)?;
    let plan = Scheduler::default().plan(&batch.invocations)?;
    tracing::info!(
        invocations = plan.invocation_count(),
        levels = plan.levels.len(),
        "Batch is schedulable"
    );
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Options from the config file (or defaults), then `STRATA_*` variables,
/// then command-line flags.
fn resolve_options(
    config: Option<&Path>,
    per_invocation_timeout: Option<Duration>,
    batch_timeout: Option<Duration>,
    max_concurrency: Option<usize>,
) -> Result<ExecuteOptions, CliError> {
    let base = match config {
        Some(path) => ExecuteOptions::load_from_file(path)?,
        None => ExecuteOptions::default(),
    };
    let mut options = base.overlay(|key| std::env::var(key).ok())?;

    if let Some(timeout) = per_invocation_timeout {
        options = options.with_per_invocation_timeout(timeout);
    }
    if let Some(timeout) = batch_timeout {
        options = options.with_batch_timeout(timeout);
    }
    if let Some(limit) = max_concurrency {
        options = options.with_max_concurrency(ConcurrencyLimit::new(limit)?);
    }
    options.validate()?;
    Ok(options)
}

fn run(path: &Path, options: ExecuteOptions) -> Result<(), CliError> {
    let batch = BatchFile::load(path)?;
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;

    let report = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling batch");
                on_signal.cancel();
            }
        });

        Scheduler::new(options)
            .execute_detailed(&batch.invocations, DemoExecutor, cancel)
            .await
    })?;

    let summary = report.summary();
    tracing::info!(
        batch_id = %report.batch_id,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "Batch complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
