use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Password;
use std::path::PathBuf;

use crate::auth::{Provider, TokenStore, CLIENT_SECRET_ENV, DEFAULT_AUTHORITY, DEFAULT_REFRESH_THRESHOLD};

/// Fabric CLI - manage Microsoft Fabric workspaces, lakehouses, warehouses and capacities
#[derive(Parser, Debug)]
#[command(name = "fabric", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Path to the token file
    #[arg(long, global = true, env = "FABRIC_CLI_AUTH_FILE")]
    pub auth_file: Option<String>,

    /// Identity provider authority
    #[arg(long, global = true, env = "FABRIC_AUTHORITY", default_value = DEFAULT_AUTHORITY)]
    pub authority: String,

    /// Fabric REST API base URL
    #[arg(
        long,
        global = true,
        env = "FABRIC_API_URL",
        default_value = "https://api.fabric.microsoft.com/v1"
    )]
    pub fabric_api_url: String,

    /// Azure resource-management API base URL
    #[arg(
        long,
        global = true,
        env = "MANAGEMENT_API_URL",
        default_value = "https://management.azure.com"
    )]
    pub management_api_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store credentials for later commands
    #[command(subcommand)]
    Login(LoginCommand),

    /// Inspect stored credentials
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Create Fabric resources
    #[command(subcommand)]
    Create(CreateCommand),

    /// Display Fabric resources
    #[command(subcommand)]
    Display(DisplayCommand),

    /// Suspend or resume a Fabric capacity
    #[command(subcommand)]
    Capacity(CapacityCommand),

    /// Git integration for workspaces
    #[command(subcommand)]
    Git(GitCommand),

    /// Manage Spark environments
    #[command(subcommand)]
    Environment(EnvironmentCommand),
}

#[derive(Subcommand, Debug)]
pub enum LoginCommand {
    /// Use a bearer token obtained elsewhere (valid for one hour)
    Token {
        /// Access token; prompted for when omitted
        #[arg(short, long)]
        token: Option<String>,

        /// Audience the token is for
        #[arg(short, long, default_value = "fabric")]
        provider: Provider,
    },

    /// Use a service principal (client-credentials flow)
    Spn(SpnArgs),
}

#[derive(Args, Debug)]
pub struct SpnArgs {
    /// Application (client) ID
    #[arg(long)]
    pub client_id: String,

    /// Directory (tenant) ID
    #[arg(long)]
    pub tenant_id: String,

    /// Client secret; read from FABRIC_CLIENT_SECRET or prompted for when omitted
    #[arg(long, env = "FABRIC_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Show cached tokens and the stored service principal
    Status,
}

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a new workspace
    Workspace {
        name: String,

        /// Capacity ID for the workspace
        #[arg(long)]
        capacity_id: Option<String>,

        /// Provision identity for the workspace after creation
        #[arg(long)]
        provision_identity: bool,
    },

    /// Create a new lakehouse in a workspace
    Lakehouse {
        name: String,

        /// Workspace ID where to create the lakehouse
        #[arg(long)]
        workspace_id: String,

        /// Optional description for the lakehouse
        #[arg(long)]
        description: Option<String>,
    },

    /// Create a new warehouse in a workspace
    Warehouse {
        name: String,

        /// Workspace ID where to create the warehouse
        #[arg(long)]
        workspace_id: String,

        /// Optional description for the warehouse
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DisplayCommand {
    /// List all workspaces
    Workspaces,

    /// List all lakehouses in a workspace
    Lakehouses {
        #[arg(long)]
        workspace_id: String,
    },

    /// List all warehouses in a workspace
    Warehouses {
        #[arg(long)]
        workspace_id: String,
    },

    /// List all Spark environments in a workspace
    Environments {
        #[arg(long)]
        workspace_id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CapacityArgs {
    #[arg(long)]
    pub subscription_id: String,

    #[arg(long)]
    pub resource_group: String,

    /// Dedicated capacity name
    #[arg(long)]
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum CapacityCommand {
    Suspend(CapacityArgs),
    Resume(CapacityArgs),
}

#[derive(Subcommand, Debug)]
pub enum GitCommand {
    /// Connect a workspace to a Git repository
    Connect(GitConnectArgs),
}

#[derive(Args, Debug)]
pub struct GitConnectArgs {
    #[arg(long)]
    pub workspace_id: String,

    /// AzureDevOps or GitHub
    #[arg(long, default_value = "AzureDevOps")]
    pub provider_type: String,

    /// Azure DevOps organization
    #[arg(long)]
    pub organization: Option<String>,

    /// GitHub repository owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Azure DevOps project
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub repository: String,

    #[arg(long, default_value = "main")]
    pub branch: String,

    #[arg(long, default_value = "/")]
    pub directory: String,
}

#[derive(Subcommand, Debug)]
pub enum EnvironmentCommand {
    /// Publish staged changes of an environment
    Publish {
        #[arg(long)]
        workspace_id: String,

        #[arg(long)]
        environment_id: String,
    },

    /// Upload a library to an environment and publish it
    Upload {
        #[arg(long)]
        workspace_id: String,

        /// Environment display name
        #[arg(long)]
        environment: String,

        /// Path to the library file
        library: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub auth_file: PathBuf,

    // Endpoints
    pub authority: String,
    pub fabric_api_url: String,
    pub management_api_url: String,

    // Timeouts
    pub token_refresh_threshold: u64,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Resolve configuration with priority: CLI > ENV > defaults
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let auth_file = match args.auth_file.as_deref() {
            Some(path) => expand_tilde(path),
            None => TokenStore::default_path()
                .context("Could not determine home directory (set FABRIC_CLI_AUTH_FILE)")?,
        };

        Ok(Config {
            auth_file,

            authority: args.authority.trim_end_matches('/').to_string(),
            fabric_api_url: args.fabric_api_url.trim_end_matches('/').to_string(),
            management_api_url: args.management_api_url.trim_end_matches('/').to_string(),

            token_refresh_threshold: env_or("TOKEN_REFRESH_THRESHOLD", DEFAULT_REFRESH_THRESHOLD),
            http_connect_timeout: env_or("HTTP_CONNECT_TIMEOUT", 30),
            http_request_timeout: env_or("HTTP_REQUEST_TIMEOUT", 120),

            log_level: args.log_level.clone(),
        })
    }
}

/// Numeric setting from the environment, falling back on absent or malformed values
fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
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

/// Use the given value or prompt for it without echo
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    let value = match value {
        Some(v) => v,
        None => Password::new()
            .with_prompt(prompt)
            .interact()
            .with_context(|| format!("Failed to read {}", prompt))?,
    };

    let value = value.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", prompt);
    }
    Ok(value)
}

/// Prompt text for the client secret
pub fn client_secret_prompt() -> String {
    format!("Client secret ({})", CLIENT_SECRET_ENV)
}
