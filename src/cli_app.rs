//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use squad::backend::{ApiClient, Backend};
use squad::core::config::Config;
use squad::core::errors::SquadError;
use squad::dashboard::{RefreshMode, Services};
use squad::logger::{LogTarget, Verbosity, init_logging};
use squad::topics::TopicId;
use squad::topics::catalog::definitions;
use squad::topics::source::RefreshReport;
use squad::tui::{self, ColorMode, DashboardOptions};

/// SquAd: live tables of Squonk2 Account Server and Data Manager objects.
#[derive(Debug, Parser)]
#[command(
    name = "squad",
    author,
    version,
    about = "SquAd - Squonk2 administration dashboard",
    long_about = None
)]
pub struct Cli {
    /// Override environments file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute; defaults to `dashboard`.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Interactive dashboard.
    Dashboard(DashboardArgs),
    /// Show environment, authentication and backend versions.
    Status(StatusArgs),
    /// Fetch one topic once and print its table.
    Snapshot(SnapshotArgs),
    /// List topics, their backends and default sort.
    Topics(TopicsArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct DashboardArgs {
    /// Topic shown first (overrides `dashboard.initial_topic`).
    #[arg(long, value_name = "TOPIC")]
    topic: Option<TopicId>,
    /// Tick period in milliseconds (overrides `dashboard.tick_ms`).
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: Option<u64>,
    /// Log file for the dashboard session.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct StatusArgs {
    /// Emit JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct SnapshotArgs {
    /// Topic to fetch.
    topic: TopicId,
    /// Emit the projected grid as JSON.
    #[arg(long)]
    json: bool,
    /// Column key to sort by (defaults to the topic's default sort).
    #[arg(long, value_name = "COLUMN")]
    sort: Option<String>,
    /// Sort ascending.
    #[arg(long)]
    asc: bool,
}

#[derive(Debug, Clone, Args)]
struct TopicsArgs {
    /// Emit JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Squad(#[from] SquadError),
    /// A one-shot fetch did not produce rows.
    #[error("{topic}: {reason}")]
    Refresh { topic: TopicId, reason: String },
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);

    match &cli.command {
        None => run_dashboard(cli, verbosity, &DashboardArgs::default()),
        Some(Command::Dashboard(args)) => run_dashboard(cli, verbosity, args),
        Some(Command::Status(args)) => {
            init_logging(verbosity, &LogTarget::Stderr)?;
            run_status(cli, args)
        }
        Some(Command::Snapshot(args)) => {
            init_logging(verbosity, &LogTarget::Stderr)?;
            run_snapshot(cli, args)
        }
        Some(Command::Topics(args)) => run_topics(args),
        Some(Command::Completions(args)) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_dashboard(cli: &Cli, verbosity: Verbosity, args: &DashboardArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(tick_ms) = args.tick_ms {
        config.dashboard.tick_ms = tick_ms;
    }
    let log_file = args.log_file.clone().unwrap_or_else(Config::default_log_file);
    init_logging(verbosity, &LogTarget::File(log_file))?;

    let initial = args.topic.unwrap_or_else(|| config.dashboard.initial_topic());
    let services = Services::connect(&config)?;
    let mut controller = services.controller(&config, initial, RefreshMode::Background)?;
    let options = DashboardOptions {
        environment: config.environment.name.clone(),
        tick: config.dashboard.tick(),
        color: ColorMode::from_environment(cli.no_color),
    };
    tui::run(&mut controller, &options)?;
    Ok(())
}

// ──────────────────── status ────────────────────

fn probe(client: &ApiClient) -> Value {
    match client.version() {
        Ok(version) => json!({"url": client.base_url(), "version": version}),
        Err(err) => json!({"url": client.base_url(), "version": null, "error": err.to_string()}),
    }
}

fn mark(ok: bool) -> String {
    if ok {
        "\u{2713}".green().to_string()
    } else {
        "\u{2717}".red().to_string()
    }
}

fn run_status(cli: &Cli, args: &StatusArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let services = Services::connect(&config)?;
    let authenticated = services
        .credentials
        .get_token(Backend::DataManager, None)
        .is_some();
    let account_server = probe(&services.clients.account_server);
    let data_manager = probe(&services.clients.data_manager);
    let env = &config.environment;

    if args.json {
        let payload = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "config": config.path,
            "environment": env.name,
            "keycloak": {"url": env.keycloak_url, "realm": env.keycloak_realm, "authenticated": authenticated},
            "account_server": account_server,
            "data_manager": data_manager,
        });
        return write_json_line(&payload);
    }

    println!("{} v{}", "SquAd".bold(), env!("CARGO_PKG_VERSION"));
    println!("  Config:      {}", config.path.display());
    println!("  Environment: {}", env.name.cyan());
    println!("  Keycloak:    {} {}", env.keycloak_url, mark(authenticated));
    for (label, reply) in [("AS", &account_server), ("DM", &data_manager)] {
        let url = reply["url"].as_str().unwrap_or_default();
        match reply["version"].as_str() {
            Some(version) => println!("  {label}:          {url} {} ({version})", mark(true)),
            None => println!(
                "  {label}:          {url} {} {}",
                mark(false),
                reply["error"].as_str().unwrap_or_default().dimmed()
            ),
        }
    }
    Ok(())
}

// ──────────────────── snapshot ────────────────────

fn run_snapshot(cli: &Cli, args: &SnapshotArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let services = Services::connect(&config)?;
    let source = services.source(&config, args.topic)?;
    match &args.sort {
        Some(key) => source.set_sort_by_key(key, args.asc)?,
        None if args.asc => source.set_sort(source.sort_state().column, true)?,
        None => {}
    }

    let now = Instant::now();
    if let RefreshReport::Failed(reason) = source.maybe_refresh(now) {
        return Err(CliError::Refresh {
            topic: args.topic,
            reason: reason.to_string(),
        });
    }
    let snapshot = source.snapshot(now);
    let grid = source.definition().projection().project(&snapshot.rows);

    if args.json {
        let payload = json!({
            "topic": snapshot.topic,
            "state": snapshot.state,
            "sort": {"column": snapshot.sort_key, "ascending": snapshot.sort.ascending},
            "grid": grid,
        });
        return write_json_line(&payload);
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", grid.title.bold())?;
    if grid.is_empty() {
        writeln!(stdout, "(no rows)")?;
    } else {
        for line in grid.lines() {
            writeln!(stdout, "{line}")?;
        }
    }
    Ok(())
}

// ──────────────────── topics ────────────────────

fn run_topics(args: &TopicsArgs) -> Result<(), CliError> {
    let summaries: Vec<_> = definitions().iter().map(|d| d.describe()).collect();
    if args.json {
        return write_json_line(&serde_json::to_value(&summaries)?);
    }
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "{:<26} {:<3} {:<3} {:<26} {}",
        "TOPIC", "KEY", "API", "LABEL", "DEFAULT SORT"
    )?;
    for summary in &summaries {
        let direction = if summary.ascending { "asc" } else { "desc" };
        writeln!(
            stdout,
            "{:<26} {:<3} {:<3} {:<26} {} {direction}",
            summary.topic.name(),
            summary.hotkey,
            summary.backend,
            summary.label,
            summary.default_sort,
        )?;
    }
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}
