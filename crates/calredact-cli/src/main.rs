//! calredact CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::debug;

use calredact_caldav::SyncPipeline;
use calredact_caldav::caldav::CalDavTransport;
use calredact_cli::cli::{Cli, Command, ConfigAction};
use calredact_cli::commands;
use calredact_cli::commands::create::NewEvent;
use calredact_cli::config::AppConfig;
use calredact_cli::error::{CliError, CliResult};
use calredact_core::{EventProjector, TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::debug()
    } else if cli.log_json {
        TracingConfig::structured()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = if cli.config.is_some() {
        AppConfig::load_from(&config_path).map_err(CliError::Config)?
    } else {
        AppConfig::load().map_err(CliError::Config)?
    };
    config.apply_overrides(cli.url, cli.user, cli.password);

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Command::Create {
            summary,
            sender_id,
            calendar,
            dry_run,
        } => {
            let event = NewEvent::new(summary, sender_id);
            if dry_run {
                return commands::create::dry_run(&event);
            }
            let pipeline = pipeline(&config)?;
            let selector = calendar.or(config.query.calendar.clone());
            commands::create::run(&pipeline, selector.as_deref(), &event).await?;
            Ok(())
        }
        Command::Discover => {
            let transport = transport(&config)?;
            commands::discover::run(&transport).await
        }
        Command::Sync { calendar, json } => {
            let pipeline = pipeline(&config)?;
            let selector = calendar.or(config.query.calendar.clone());
            let query = config
                .query
                .to_query(chrono::Utc::now())
                .map_err(CliError::Config)?;

            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupt received, cancelling sync");
                    let _ = cancel_tx.send(true);
                }
            });

            commands::sync::run(&pipeline, selector.as_deref(), &query, json, cancel_rx).await
        }
    }
}

fn transport(config: &AppConfig) -> CliResult<CalDavTransport> {
    let transport_config = config.caldav.to_transport_config().map_err(CliError::Config)?;
    Ok(CalDavTransport::new(transport_config)?)
}

fn pipeline(config: &AppConfig) -> CliResult<SyncPipeline<CalDavTransport>> {
    let zone = config.projection.zone().map_err(CliError::Config)?;
    Ok(SyncPipeline::new(
        transport(config)?,
        config.policy.to_policy(),
        EventProjector::new(zone),
    ))
}
