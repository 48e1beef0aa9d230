use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use fabric_cli::auth::{AadExchanger, AuthManager, EnvSecrets, TokenStore};
use fabric_cli::commands;
use fabric_cli::config::{CliArgs, Config};
use fabric_cli::http_client::FabricHttpClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = Config::from_args(&args)?;

    // Initialize logging with the configured level; RUST_LOG wins when set
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Configuration: {:?}", config);

    let exchanger = AadExchanger::new(config.http_request_timeout)?;
    let auth_manager = Arc::new(
        AuthManager::new(
            TokenStore::new(config.auth_file.clone()),
            Arc::new(exchanger),
            Arc::new(EnvSecrets::default()),
        )
        .with_refresh_threshold(config.token_refresh_threshold),
    );

    let http_client = FabricHttpClient::new(auth_manager.clone(), &config)?;

    let mut stdout = std::io::stdout();
    commands::run(args.command, &config, &auth_manager, &http_client, &mut stdout).await
}
