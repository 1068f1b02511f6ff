//! coursecal CLI entry point.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;

use coursecal_client::cli::{Cli, Command, ConfigAction};
use coursecal_client::commands::{self, Context, Overrides};
use coursecal_client::config::ClientConfig;
use coursecal_client::error::ClientResult;
use coursecal_core::{LoggingConfig, init_logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)?
    } else {
        ClientConfig::load()?
    };
    config.validate()?;

    let logging = LoggingConfig::for_cli(cli.debug || config.debug)
        .with_format(cli.log_format.unwrap_or(config.logging.format))
        .with_filter(config.logging.filter.clone());
    init_logging(&logging)?;
    tracing::debug!(path = %config_path.display(), "Configuration loaded");

    let overrides = Overrides {
        events_path: cli.events,
        catalog_path: cli.catalog,
        locale: cli.locale,
        json: cli.json,
    };

    let output = match cli.command {
        Command::Config { action } => {
            return match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path),
                ConfigAction::Validate => commands::config::validate(&config),
                ConfigAction::Path => commands::config::path(&config, &config_path),
            };
        }
        Command::Expand { series_id, weeks } => {
            let ctx = Context::load(&config, overrides)?;
            commands::events::expand(&ctx, &series_id, weeks)?
        }
        Command::Validate { candidate } => {
            let ctx = Context::load(&config, overrides)?;
            commands::events::validate(&ctx, &candidate)?
        }
        Command::Add { event, force } => {
            let mut ctx = Context::load(&config, overrides)?;
            commands::events::add(&mut ctx, &event, force)?
        }
        Command::Shift {
            event_id,
            minutes,
            force,
        } => {
            let mut ctx = Context::load(&config, overrides)?;
            commands::events::shift(&mut ctx, &event_id, minutes, force)?
        }
        Command::Resize {
            event_id,
            end,
            force,
        } => {
            let mut ctx = Context::load(&config, overrides)?;
            commands::events::resize(&mut ctx, &event_id, end, force)?
        }
        Command::Occurrence {
            series_id,
            date,
            action,
        } => {
            let mut ctx = Context::load(&config, overrides)?;
            commands::events::occurrence(
                &mut ctx,
                &series_id,
                date,
                &action.to_action(),
                action.force(),
            )?
        }
        Command::Agenda { from, days } => {
            let ctx = Context::load(&config, overrides)?;
            let from = from.unwrap_or_else(|| Utc::now().date_naive());
            commands::events::agenda(&ctx, from, days)?
        }
    };

    println!("{}", output);
    Ok(())
}
