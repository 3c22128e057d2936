//! `ofl` - Open Flight Log
//!
//! This binary runs the logbook web application and offers a few offline
//! commands over the same database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};

use flightlog::cli::output::{flights_plain, flights_table, summary_text, StatusReport};
use flightlog::cli::{Cli, Command, ConfigCommand, OutputFormat};
use flightlog::web::{self, AppState};
use flightlog::{export, init_logging, Config, FlightRepository, StatsAggregator, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Initialize logging based on verbosity
    let _log_guard = init_logging(cli.verbosity(), config.logging.file.as_deref())?;

    // Only commands that read the logbook open the store.
    let store = Store::new(config.database_path(), config.schema_source());
    let result = execute(&cli, &config, &store).await;

    debug!("Closing logbook");
    if let Err(e) = store.dispose().await {
        error!("Failed to close database: {}", e);
    }
    result
}

async fn open_logbook(store: &Store) -> anyhow::Result<()> {
    if let Err(e) = store.initialize().await {
        if e.is_setup_error() {
            error!("Logbook setup failed: {}", e);
        }
        return Err(anyhow::Error::from(e).context(format!(
            "cannot open logbook at {}",
            store.path().display()
        )));
    }
    Ok(())
}

async fn execute(cli: &Cli, config: &Config, store: &Store) -> anyhow::Result<()> {
    let repo = FlightRepository::new(store.clone());
    match &cli.command {
        Command::Serve(cmd) => {
            let mut config = config.clone();
            if let Some(host) = &cmd.host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = cmd.port {
                config.server.port = port;
            }
            config.validate()?;
            open_logbook(store).await?;

            info!("Starting Open Flight Log...");
            let state = AppState::new(repo, config.export_path(), config.quotes_path());
            web::serve(&config.bind_address(), state, web::shutdown_signal())
                .await
                .map_err(anyhow::Error::from)
        }
        Command::Stats(cmd) => {
            open_logbook(store).await?;
            let summary = StatsAggregator::new(repo).summary().await?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary_text(&summary));
            }
            Ok(())
        }
        Command::List(cmd) => {
            open_logbook(store).await?;
            let flights = repo.list_all().await?;
            match cmd.format {
                OutputFormat::Plain => print!("{}", flights_plain(&flights)),
                OutputFormat::Table => print!("{}", flights_table(&flights)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&flights)?),
            }
            Ok(())
        }
        Command::Export(cmd) => {
            open_logbook(store).await?;
            let path = cmd.output.clone().unwrap_or_else(|| config.export_path());
            let written = export::export_csv(&repo, &path).await?;
            println!("Exported flights to {}", written.display());
            Ok(())
        }
        Command::Status(cmd) => {
            open_logbook(store).await?;
            let report = StatusReport {
                config_path: cli.config.clone().unwrap_or_else(Config::default_config_path),
                database_path: store.path().to_path_buf(),
                schema_version: store.schema_version().await?,
                total_flights: repo.count().await?,
                export_path: config.export_path(),
                quotes_path: config.quotes_path(),
            };
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.to_text());
            }
            Ok(())
        }
        Command::Config(cmd) => handle_config(config, cli.config.as_ref(), cmd),
    }
}

fn handle_config(
    config: &Config,
    config_path: Option<&PathBuf>,
    cmd: &ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Address:        {}", config.bind_address());
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                match &config.storage.schema_path {
                    Some(path) => println!("  Schema:         {}", path.display()),
                    None => println!("  Schema:         built-in"),
                }
                println!();
                println!("[Export]");
                println!("  Path:           {}", config.export_path().display());
                println!();
                println!("[Quotes]");
                println!("  Path:           {}", config.quotes_path().display());
                println!();
                println!("[Logging]");
                match &config.logging.file {
                    Some(path) => println!("  File:           {}", path.display()),
                    None => println!("  File:           console only"),
                }
            }
        }
        ConfigCommand::Path => {
            let path = config_path.cloned().unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .clone()
                .or_else(|| config_path.cloned())
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
