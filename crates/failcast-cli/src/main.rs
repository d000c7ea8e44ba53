//! failcast - forward failing tests to an error-tracking backend
//!
//! ## Commands
//!
//! - `report`: replay a recorded test run through the reporter
//! - `detect`: print the CI context resolved from the environment

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use failcast_ci::{CiContext, EnvVars};
use failcast_core::config::DEFAULT_CONFIG_FILE;
use failcast_core::{Reporter, ReporterConfig, TaskUpdatePack, TestModule};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "failcast")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forward failing tests to an error-tracking backend", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the failures of a recorded test run
    Report(ReportArgs),

    /// Show the CI provider and build identity detected from the environment
    Detect {
        /// Print the context as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ReportArgs {
    /// Run file (`{updates, files, unhandledErrors}` JSON), `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Config file (default: ./failcast.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend DSN
    #[arg(long, env = "SENTRY_DSN")]
    dsn: Option<String>,

    /// Force reporting on or off
    #[arg(long)]
    enabled: Option<bool>,

    #[arg(long, env = "SENTRY_ENVIRONMENT")]
    environment: Option<String>,

    #[arg(long, env = "SENTRY_RELEASE")]
    release: Option<String>,

    /// Log events instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Maximum number of events sent for this run
    #[arg(long)]
    max_events: Option<u64>,

    /// Static tag, repeatable
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Version of the test framework that produced the run
    #[arg(long)]
    framework_version: Option<String>,
}

impl ReportArgs {
    /// Flags as a config layer; unset flags leave lower layers alone.
    fn overrides(&self) -> ReporterConfig {
        ReporterConfig {
            dsn: self.dsn.clone(),
            enabled: self.enabled,
            environment: self.environment.clone(),
            release: self.release.clone(),
            dry_run: self.dry_run.then_some(true),
            max_events_per_run: self.max_events,
            framework_version: self.framework_version.clone(),
            tags: self
                .tags
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect(),
            ..ReporterConfig::default()
        }
    }
}

/// A recorded test run, as produced by a host runner adapter.
///
/// Updates and files stay raw so one malformed entry cannot sink the run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RunInput {
    updates: Vec<Value>,
    files: Vec<Value>,
    unhandled_errors: Vec<Value>,
    framework_version: Option<String>,
}

/// Decode entries one by one, skipping those that do not fit.
fn decode_entries<T: DeserializeOwned>(kind: &str, raw: Vec<Value>) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(kind, index, error = %err, "skipping malformed run entry");
                None
            }
        })
        .collect()
}

fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    failcast_core::init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Report(args) => cmd_report(&args).await,
        Commands::Detect { json } => cmd_detect(json),
    }
}

/// Config file, then flags and their env vars.
fn load_config(args: &ReportArgs, default_file: &Path) -> Result<ReporterConfig> {
    let base = match &args.config {
        Some(path) => ReporterConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None if default_file.exists() => ReporterConfig::load(default_file)
            .with_context(|| format!("Failed to load config {}", default_file.display()))?,
        None => ReporterConfig::default(),
    };
    Ok(base.merge(args.overrides()))
}

fn read_input(source: &str) -> Result<RunInput> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read run from stdin")?;
        text
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read run file {}", source))?
    };
    serde_json::from_str(&text).context("Run file is not a valid test run")
}

async fn cmd_report(args: &ReportArgs) -> Result<()> {
    let input = read_input(&args.input)?;
    let mut options = load_config(args, Path::new(DEFAULT_CONFIG_FILE))?.into_options();
    if options.framework_version.is_none() {
        options.framework_version = input.framework_version.clone();
    }

    let updates: Vec<TaskUpdatePack> = decode_entries("update", input.updates);
    let files: Vec<TestModule> = decode_entries("file", input.files);

    let mut reporter = Reporter::new(options);
    reporter.on_init();
    reporter.on_task_update(&updates);
    reporter.on_test_run_end(&files, &input.unhandled_errors).await;

    let metrics = reporter.metrics();
    info!(run_id = %reporter.run_id(), enabled = reporter.is_enabled(), "report finished");
    println!(
        "failcast: {} queued, {} reported, {} dropped, {} capped, {} failed to send",
        metrics.queued, metrics.captured, metrics.dropped, metrics.capped, metrics.capture_failures
    );
    Ok(())
}

fn cmd_detect(json: bool) -> Result<()> {
    let env = EnvVars::from_process();
    let ci = CiContext::from_env(&env);

    if json {
        println!("{}", serde_json::to_string_pretty(&ci)?);
        return Ok(());
    }

    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("Provider:    {}", ci.provider_name().unwrap_or("none"));
    println!("Environment: {}", ci.infer_environment(&env));
    println!("Repository:  {}", show(&ci.repository));
    println!("Branch:      {}", show(&ci.branch));
    println!("Commit:      {}", show(&ci.commit_sha));
    println!("Run URL:     {}", show(&ci.run_url));
    println!("Workflow:    {}", show(&ci.workflow_id));
    Ok(())
}
