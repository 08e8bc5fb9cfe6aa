//! statewatch CLI
//!
//! Command-line interface for the statewatch monitoring daemon.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use statewatch::config::Config;
use statewatch::notify::NtfySender;
use statewatch::probes;
use statewatch::store::{PgStateStore, StateStore};
use statewatch::watch::{SystemClock, Watcher};

/// statewatch - state-change watcher with push notifications
#[derive(Parser)]
#[command(name = "statewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "STATEWATCH_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watcher scheduling loop
    Serve,

    /// Run one check pass immediately
    Check {
        /// Only check this target
        #[arg(long)]
        target: Option<String>,
    },

    /// Show recent check history for a target
    History {
        /// Target name
        target: String,

        /// Maximum number of records
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// List configured targets
    Targets,

    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => run_serve(config).await,
        Commands::Check { target } => run_check(config, target.as_deref()).await,
        Commands::History { target, limit } => {
            run_history(config, &target, limit, cli.format).await
        }
        Commands::Targets => run_targets(&config, cli.format),
        Commands::Db { command } => run_db(config, command).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Connect the store and assemble a watcher over the configured targets
async fn build_watcher(config: &Config, only_target: Option<&str>) -> anyhow::Result<Watcher> {
    let store = Arc::new(PgStateStore::new(&config.database).await?);
    store.migrate().await?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("statewatch/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut config = config.clone();
    if let Some(name) = only_target {
        config.targets.retain(|t| t.name == name);
        if config.targets.is_empty() {
            anyhow::bail!("no such target: {name}");
        }
    }

    let probes = probes::registry(&config, &client)?;
    let dispatcher = Arc::new(NtfySender::new(&config.notify)?);
    let debug_channel = config.notify.debug_topic.is_some();

    Ok(Watcher::new(
        store,
        dispatcher,
        probes,
        Arc::new(SystemClock),
        config.watcher.interval_seconds,
        debug_channel,
    ))
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    let watcher = build_watcher(&config, None).await?;

    tokio::select! {
        () = watcher.start() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

async fn run_check(config: Config, target: Option<&str>) -> anyhow::Result<()> {
    let watcher = build_watcher(&config, target).await?;
    watcher.run_pass().await;
    Ok(())
}

async fn run_history(
    config: Config,
    target: &str,
    limit: i64,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = PgStateStore::new(&config.database).await?;
    store.migrate().await?;

    let records = store.recent_checks(target, limit).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            for record in records {
                println!(
                    "{}  {:<24} notified={:<5} {}",
                    record.checked_at.format("%Y-%m-%d %H:%M:%S"),
                    record.target,
                    record.notified,
                    record.state,
                );
            }
        }
    }

    Ok(())
}

fn run_targets(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config.targets)?),
        OutputFormat::Text => {
            for target in &config.targets {
                let flag = if target.enabled { "enabled" } else { "disabled" };
                println!("{:<24} {:<9} {}", target.name, flag, target.url);
            }
        }
    }

    Ok(())
}

async fn run_db(config: Config, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let store = PgStateStore::new(&config.database).await?;
            store.migrate().await?;
            println!("Migrations applied");
        }
    }

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "statewatch", &mut io::stdout());
}
