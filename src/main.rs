use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use formo_sync::analytics::{ConsoleAnalytics, UpdateSupport};
use formo_sync::channels::run_repl;
use formo_sync::cli::{Cli, Command, run_doctor_command};
use formo_sync::config::Config;

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("formo_sync=info"));
    let json = std::env::var("FORMO_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if json {
        Box::new(fmt::layer().json().with_writer(std::io::stderr))
    } else {
        Box::new(fmt::layer().with_target(false).with_writer(std::io::stderr))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Env files first so RUST_LOG and FORMO_LOG_FORMAT from .env apply.
    formo_sync::bootstrap::load_env_files();
    init_logging();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.selected() {
        Command::Doctor { strict } => run_doctor_command(config_path, strict).await,
        Command::Repl {
            reinit_on_change,
            auto_connect,
        } => {
            let config = Config::from_env_with_toml(config_path)?;
            let support = if reinit_on_change {
                UpdateSupport::Reinit
            } else {
                UpdateSupport::InPlace
            };
            run_repl(Arc::new(ConsoleAnalytics::new(support)), &config, auto_connect).await
        }
    }
}
