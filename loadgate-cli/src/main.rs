//! Loadgate - check whether an SDK module would pass the load-time trust gate
//!
//! Operator front end for `loadgate-core`. Verdicts go to stdout, logs to
//! stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use loadgate_core::trust::{FilePathResolver, ModuleTrustGate, RootConfig, TrustReport};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "loadgate",
    about = "Check SDK modules against the load-time trust gate",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// YAML file overriding the environment-provided roots
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// SDK directory name under Program Files
    #[clap(long, global = true)]
    product_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gate a module file on disk
    Verify {
        /// Path to the module
        path: PathBuf,

        /// Expected module file name (default: the path's file name)
        #[clap(long)]
        name: Option<String>,

        /// Print the full report as JSON
        #[clap(long)]
        json: bool,

        /// Give up if signature verification takes longer than this
        #[clap(long)]
        timeout_secs: Option<u64>,
    },

    /// Show the sanctioned install directories
    Roots {
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr) // stdout carries the verdict
        .init();
}

fn load_roots(config: Option<&Path>, product_dir: Option<&str>) -> Result<RootConfig> {
    let roots = match config {
        Some(path) => RootConfig::load(path)?,
        None => RootConfig::from_env(),
    };

    Ok(match product_dir {
        Some(dir) => roots.with_product_dir(dir),
        None => roots,
    })
}

/// Exit code for a module that did not pass the gate
const EXIT_NOT_TRUSTED: u8 = 1;
/// Exit code for a usage or resolution error
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let result = build_runtime().and_then(|runtime| {
        let result = runtime.block_on(run(cli));
        // Don't wait on a verification abandoned by --timeout-secs
        runtime.shutdown_background();
        result
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NOT_TRUSTED),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the selected command; `Ok(false)` means a module was not trusted
async fn run(cli: Cli) -> Result<bool> {
    let roots = load_roots(cli.config.as_deref(), cli.product_dir.as_deref())?;
    debug!("Using roots: {:?}", roots);

    match cli.command {
        Command::Verify {
            path,
            name,
            json,
            timeout_secs,
        } => {
            let report = verify_command(path, name, roots, timeout_secs).await?;
            print_report(&report, json)?;
            Ok(report.is_trusted())
        }
        Command::Roots { json } => {
            roots_command(&roots, json)?;
            Ok(true)
        }
    }
}

async fn verify_command(
    path: PathBuf,
    name: Option<String>,
    roots: RootConfig,
    timeout_secs: Option<u64>,
) -> Result<TrustReport> {
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("Failed to determine current directory")?
            .join(path)
    };

    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Cannot derive module name from {}", path.display()))?,
    };

    // Verification blocks on file I/O and chain building
    let report = run_blocking(
        move || {
            ModuleTrustGate::platform().verify_with_roots(&FilePathResolver, &path, &name, &roots)
        },
        timeout_secs.map(Duration::from_secs),
    )
    .await??;

    Ok(report)
}

/// Run blocking work off the async threads, giving up after `limit`.
///
/// A blocking task cannot be cancelled. On timeout it keeps running, which
/// is why `main` shuts the runtime down without waiting for it.
async fn run_blocking<T, F>(work: F, limit: Option<Duration>) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);

    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| anyhow!("Signature verification timed out after {limit:?}"))?,
        None => task.await,
    };

    result.context("Verification task failed")
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn print_report(report: &TrustReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.is_trusted() { "TRUSTED" } else { "NOT TRUSTED" };
    println!("{status}: {}", report.module.resolved_path.display());
    println!("  verdict:   {}", report.verdict);
    println!("  signature: {}", report.outcome);
    match report.matched_root {
        Some(root) => println!("  location:  {root} directory"),
        None if report.outcome.is_valid() => println!("  location:  not a sanctioned directory"),
        None => println!("  location:  not checked"),
    }
    Ok(())
}

#[derive(Tabled)]
struct RootRow {
    #[tabled(rename = "Root")]
    label: String,
    #[tabled(rename = "Directory")]
    path: String,
}

fn roots_command(roots: &RootConfig, json: bool) -> Result<()> {
    let sanctioned = roots.sanctioned_roots();

    if json {
        println!("{}", serde_json::to_string_pretty(&sanctioned)?);
        return Ok(());
    }

    let rows: Vec<RootRow> = sanctioned
        .iter()
        .map(|root| RootRow {
            label: root.label.to_string(),
            path: root
                .absolute_path
                .clone()
                .unwrap_or_else(|| "<absent>".to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}
