use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;

use crate::models::request::{Method, RequestDescription};

/// Session Dispatch - send one authenticated request and print the normalized response
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL relative request URLs are joined onto
    #[arg(short = 'b', long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Path to the SQLite credential database (in-memory store when omitted)
    #[arg(short = 'd', long, env = "CREDENTIAL_DB_FILE")]
    pub db_file: Option<String>,

    /// Auth service refresh endpoint
    #[arg(long, env = "AUTH_REFRESH_PATH", default_value = "/api/auth/refresh")]
    pub refresh_path: String,

    /// Auth service logout endpoint
    #[arg(long, env = "AUTH_LOGOUT_PATH", default_value = "/api/auth/logout")]
    pub logout_path: String,

    /// Route the login redirect points at
    #[arg(long, env = "LOGIN_ROUTE", default_value = "/login")]
    pub login_route: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// Max idle connections per host
    #[arg(long, env = "HTTP_MAX_CONNECTIONS", default_value = "20")]
    pub max_connections: usize,

    /// Seed the credential store with this access token
    #[arg(long, env = "ACCESS_TOKEN")]
    pub access_token: Option<String>,

    /// Seed the credential store with this refresh token
    #[arg(long, env = "REFRESH_TOKEN")]
    pub refresh_token: Option<String>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// URL template, e.g. /api/users/:id
    pub url: String,

    /// Path variable binding (name=value), repeatable
    #[arg(short = 'p', long = "path-var", value_parser = parse_key_value)]
    pub path_vars: Vec<(String, String)>,

    /// Query parameter (name=value), repeatable
    #[arg(short = 'q', long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// Extra header (name=value), repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Send without a bearer credential
    #[arg(long)]
    pub ignore_auth: bool,

    /// Suppress error surfacing
    #[arg(long)]
    pub silent_error: bool,

    /// Reject with the server message for explicit handling
    #[arg(long)]
    pub throw_error: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Endpoints
    pub base_url: Url,
    pub refresh_path: String,
    pub logout_path: String,
    pub login_route: String,

    // Credential storage
    pub credential_db_file: Option<PathBuf>,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, CliArgs)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args))
    }

    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let base_url = args
            .base_url
            .as_deref()
            .context("BASE_URL is required (use -b or set BASE_URL env var)")?;
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid BASE_URL: {}", base_url))?;

        Ok(Config {
            base_url,
            refresh_path: args.refresh_path.clone(),
            logout_path: args.logout_path.clone(),
            login_route: args.login_route.clone(),
            credential_db_file: args.db_file.as_deref().map(expand_tilde),
            http_max_connections: args.max_connections,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level.clone(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.cannot_be_a_base() {
            anyhow::bail!("BASE_URL cannot be used as a base: {}", self.base_url);
        }
        if self.http_connect_timeout == 0 || self.http_request_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }
        Ok(())
    }
}

impl CliArgs {
    /// Request description assembled from the command line
    pub fn request_description(&self) -> Result<RequestDescription> {
        let method: Method = self.method.parse().map_err(anyhow::Error::msg)?;
        let mut description = RequestDescription::new(method, self.url.clone());

        for (name, value) in &self.path_vars {
            description = description.path_var(name.clone(), value.as_str());
        }
        for (name, value) in &self.query {
            description = description.query(name.clone(), value);
        }
        for (name, value) in &self.headers {
            description = description.header(name.clone(), value.clone());
        }
        if let Some(ref body) = self.body {
            let body = serde_json::from_str(body).context("--body must be valid JSON")?;
            description = description.json(body);
        }
        if self.ignore_auth {
            description = description.ignore_auth();
        }
        if self.silent_error {
            description = description.silent_error();
        }
        if self.throw_error {
            description = description.throw_error();
        }

        Ok(description)
    }
}

/// Parse a `name=value` argument
fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
