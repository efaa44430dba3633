use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

use session_dispatch::auth::{HttpAuthService, SessionManager};
use session_dispatch::config::Config;
use session_dispatch::hooks::{LogNotifier, LogRedirect};
use session_dispatch::store::{self, CredentialStore, MemoryStore, SqliteStore};
use session_dispatch::transport::HttpTransport;
use session_dispatch::{Dispatcher, Response};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, args) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Base URL: {}", config.base_url);

    let credentials: Arc<dyn CredentialStore> = match config.credential_db_file {
        Some(ref path) => {
            tracing::info!("Using credential database: {}", path.display());
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::debug!("Using in-memory credential store");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(ref token) = args.access_token {
        credentials.set(store::ACCESS_TOKEN_KEY, token)?;
    }
    if let Some(ref token) = args.refresh_token {
        credentials.set(store::REFRESH_TOKEN_KEY, token)?;
    }

    let transport = HttpTransport::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let auth = HttpAuthService::new(
        transport.client().clone(),
        &config.base_url,
        &config.refresh_path,
        &config.logout_path,
    )?;

    let session = Arc::new(SessionManager::new(
        credentials,
        Arc::new(auth),
        Arc::new(LogRedirect),
        config.login_route.clone(),
    ));

    let dispatcher = Dispatcher::new(
        config.base_url.clone(),
        Arc::new(transport),
        session,
        Arc::new(LogNotifier),
    );

    let description = args.request_description()?;
    let response: Response<Value> = dispatcher.settle(&description).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
