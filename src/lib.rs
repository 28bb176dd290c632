pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod recent;
pub mod sync;

pub use config::Config;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RefreshCommands};
use clients::RefreshKind;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();

    match args.command {
        Some(Commands::Show { query, follow }) => {
            cli::cmd_show(&config, &query.join(" "), follow).await
        }

        Some(Commands::Search { query }) => cli::cmd_search(&config, &query.join(" ")).await,

        Some(Commands::Recent) => cli::cmd_recent(&config),

        Some(Commands::Refresh { command }) => match command {
            RefreshCommands::Missing { id } => {
                cli::cmd_refresh(&config, RefreshKind::Missing, &id).await
            }
            RefreshCommands::All { id } => cli::cmd_refresh(&config, RefreshKind::Show, &id).await,
            RefreshCommands::Metadata { id } => {
                cli::cmd_refresh(&config, RefreshKind::Metadata, &id).await
            }
        },

        Some(Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
