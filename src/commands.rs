// Command handlers
//
// Each handler resolves credentials through the shared auth manager and
// writes user-facing output to `out`; diagnostics go through tracing.

use anyhow::{Context, Result};
use std::io::Write;

use crate::api::{capacity, environments, git, lakehouses, warehouses, workspaces};
use crate::auth::{AuthManager, FullConfig, Provider};
use crate::config::{
    client_secret_prompt, value_or_prompt, AuthCommand, CapacityArgs, CapacityCommand, Command,
    Config, CreateCommand, DisplayCommand, EnvironmentCommand, GitCommand, GitConnectArgs,
    LoginCommand, SpnArgs,
};
use crate::http_client::FabricHttpClient;
use crate::models::fabric::GitProviderDetails;

/// Dispatch a parsed command
pub async fn run<W: Write>(
    command: Command,
    config: &Config,
    auth: &AuthManager,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Login(login) => run_login(login, config, auth, out).await,
        Command::Auth(AuthCommand::Status) => auth_status(auth, out).await,
        Command::Create(create) => run_create(create, client, out).await,
        Command::Display(display) => run_display(display, client, out).await,
        Command::Capacity(command) => run_capacity(command, client, out).await,
        Command::Git(GitCommand::Connect(args)) => git_connect(args, client, out).await,
        Command::Environment(command) => run_environment(command, client, out).await,
    }
}

async fn run_login<W: Write>(
    command: LoginCommand,
    config: &Config,
    auth: &AuthManager,
    out: &mut W,
) -> Result<()> {
    match command {
        LoginCommand::Token { token, provider } => {
            let token = value_or_prompt(token, "Access token")?;
            auth.set_token(&token, provider).await;
            writeln!(out, "Successfully logged in")?;
        }
        LoginCommand::Spn(SpnArgs {
            client_id,
            tenant_id,
            client_secret,
        }) => {
            let secret = value_or_prompt(client_secret, &client_secret_prompt())?;
            let spn = FullConfig::new(client_id, secret, tenant_id)
                .with_authority(config.authority.clone());

            auth.set_credential_config(&spn)
                .await
                .context("Error logging in")?;
            writeln!(out, "Successfully logged in as service principal {}", spn.client_id)?;
        }
    }
    Ok(())
}

async fn auth_status<W: Write>(auth: &AuthManager, out: &mut W) -> Result<()> {
    writeln!(out, "Token file: {}", auth.store_path().display())?;
    for provider in Provider::ALL {
        writeln!(out, "  {:<10} {}", provider, auth.token_status(provider).await)?;
    }

    match auth.get_state().await.spn_config {
        Some(spn) => writeln!(
            out,
            "Service principal: {} (tenant {}, authority {})",
            spn.client_id, spn.tenant_id, spn.authority
        )?,
        None => writeln!(out, "Service principal: not configured")?,
    }

    if auth.has_override_token() {
        writeln!(
            out,
            "Note: {} is set and overrides cached tokens",
            crate::auth::ACCESS_TOKEN_ENV
        )?;
    }
    Ok(())
}

async fn run_create<W: Write>(
    command: CreateCommand,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    match command {
        CreateCommand::Workspace {
            name,
            capacity_id,
            provision_identity,
        } => {
            let workspace_id =
                workspaces::create_workspace(client, &name, capacity_id.as_deref()).await?;
            writeln!(out, "Created workspace '{}' with ID: {}", name, workspace_id)?;

            if let Some(capacity_id) = capacity_id {
                workspaces::assign_to_capacity(client, &workspace_id, &capacity_id).await?;
                writeln!(out, "Assigned workspace to capacity {}", capacity_id)?;
            }

            if provision_identity {
                workspaces::provision_identity(client, &workspace_id).await?;
                writeln!(
                    out,
                    "Successfully provisioned identity for workspace '{}'",
                    name
                )?;
            }
        }
        CreateCommand::Lakehouse {
            name,
            workspace_id,
            description,
        } => {
            let id = lakehouses::create_lakehouse(
                client,
                &workspace_id,
                &name,
                description.as_deref(),
            )
            .await?;
            writeln!(out, "Created lakehouse '{}' with ID: {}", name, id)?;
        }
        CreateCommand::Warehouse {
            name,
            workspace_id,
            description,
        } => {
            let id = warehouses::create_warehouse(
                client,
                &workspace_id,
                &name,
                description.as_deref(),
            )
            .await?;
            writeln!(out, "Created warehouse '{}' with ID: {}", name, id)?;
        }
    }
    Ok(())
}

async fn run_display<W: Write>(
    command: DisplayCommand,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    match command {
        DisplayCommand::Workspaces => {
            let spaces = workspaces::list_workspaces(client)
                .await
                .context("Error listing workspaces")?;
            if spaces.is_empty() {
                writeln!(out, "No workspaces found")?;
                return Ok(());
            }

            writeln!(out, "\nWorkspaces:")?;
            for workspace in spaces {
                let capacity_info = workspace
                    .capacity_id
                    .map(|id| format!(" (Capacity ID: {})", id))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "  • {} (ID: {}){}",
                    workspace.display_name, workspace.id, capacity_info
                )?;
            }
        }
        DisplayCommand::Lakehouses { workspace_id } => {
            let items = lakehouses::list_lakehouses(client, &workspace_id)
                .await
                .context("Error listing lakehouses")?;
            print_items(out, "lakehouses", &workspace_id, &items)?;
        }
        DisplayCommand::Warehouses { workspace_id } => {
            let items = warehouses::list_warehouses(client, &workspace_id)
                .await
                .context("Error listing warehouses")?;
            print_items(out, "warehouses", &workspace_id, &items)?;
        }
        DisplayCommand::Environments { workspace_id } => {
            let items: Vec<(String, String)> =
                environments::list_environments(client, &workspace_id)
                    .await
                    .context("Error listing environments")?
                    .iter()
                    .filter_map(|item| item.id_and_name())
                    .collect();
            print_items(out, "environments", &workspace_id, &items)?;
        }
    }
    Ok(())
}

fn print_items<W: Write>(
    out: &mut W,
    kind: &str,
    workspace_id: &str,
    items: &[(String, String)],
) -> Result<()> {
    if items.is_empty() {
        writeln!(out, "No {} found in workspace {}", kind, workspace_id)?;
        return Ok(());
    }

    let mut title = kind.to_string();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    writeln!(out, "\n{} in workspace {}:", title, workspace_id)?;
    for (id, name) in items {
        writeln!(out, "  • {} (ID: {})", name, id)?;
    }
    Ok(())
}

async fn run_capacity<W: Write>(
    command: CapacityCommand,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    let (verb, args, result) = match command {
        CapacityCommand::Suspend(args) => {
            let result = capacity::suspend_capacity(
                client,
                &args.subscription_id,
                &args.resource_group,
                &args.name,
            )
            .await;
            ("suspend", args, result)
        }
        CapacityCommand::Resume(args) => {
            let result = capacity::resume_capacity(
                client,
                &args.subscription_id,
                &args.resource_group,
                &args.name,
            )
            .await;
            ("resume", args, result)
        }
    };

    let CapacityArgs { name, .. } = args;
    let body = result.with_context(|| format!("Error trying to {} capacity {}", verb, name))?;

    writeln!(out, "Requested {} of capacity '{}'", verb, name)?;
    if let Some(body) = body {
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    }
    Ok(())
}

async fn git_connect<W: Write>(
    args: GitConnectArgs,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    let workspace_id = args.workspace_id;
    let details = GitProviderDetails {
        git_provider_type: args.provider_type,
        organization_name: args.organization,
        owner_name: args.owner,
        project_name: args.project,
        repository_name: args.repository,
        branch_name: args.branch,
        directory_name: args.directory,
    };

    git::connect_git(client, &workspace_id, details).await?;
    writeln!(out, "Connected workspace {} to Git", workspace_id)?;
    Ok(())
}

async fn run_environment<W: Write>(
    command: EnvironmentCommand,
    client: &FabricHttpClient,
    out: &mut W,
) -> Result<()> {
    match command {
        EnvironmentCommand::Publish {
            workspace_id,
            environment_id,
        } => {
            environments::publish_environment(client, &workspace_id, &environment_id).await?;
            writeln!(out, "Published environment {}", environment_id)?;
        }
        EnvironmentCommand::Upload {
            workspace_id,
            environment,
            library,
        } => {
            environments::upload_staging_library(client, &workspace_id, &environment, &library)
                .await?;
            writeln!(
                out,
                "Uploaded {} to environment '{}' and published it",
                library.display(),
                environment
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StaticSecrets, TokenStore};
    use crate::test_support::{test_config, NoExchange};
    use mockito::Server;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup(server_url: &str, dir: &Path, bearer: Option<&str>) -> (Config, Arc<AuthManager>, FabricHttpClient) {
        let config = test_config(server_url, dir);
        let auth = Arc::new(AuthManager::new(
            TokenStore::new(config.auth_file.clone()),
            Arc::new(NoExchange),
            Arc::new(StaticSecrets {
                bearer_token: bearer.map(str::to_string),
                client_secret: None,
            }),
        ));
        let client = FabricHttpClient::new(auth.clone(), &config).unwrap();
        (config, auth, client)
    }

    async fn run_to_string(
        command: Command,
        config: &Config,
        auth: &AuthManager,
        client: &FabricHttpClient,
    ) -> Result<String> {
        let mut out = Vec::new();
        run(command, config, auth, client, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_login_token_persists_and_reports_status() {
        let temp = tempdir().unwrap();
        let (config, auth, client) = setup("http://localhost:9", temp.path(), None);

        let output = run_to_string(
            Command::Login(LoginCommand::Token {
                token: Some("eyJmanual".to_string()),
                provider: Provider::Management,
            }),
            &config,
            &auth,
            &client,
        )
        .await
        .unwrap();
        assert_eq!(output, "Successfully logged in\n");
        assert!(config.auth_file.exists());

        let status = run_to_string(Command::Auth(AuthCommand::Status), &config, &auth, &client)
            .await
            .unwrap();
        assert!(status.contains("fabric     not set"));
        assert!(status.contains("management valid until"));
        assert!(status.contains("Service principal: not configured"));
        assert!(!status.contains("Note:"));
    }

    #[tokio::test]
    async fn test_login_spn_failure_is_reported() {
        let temp = tempdir().unwrap();
        let (config, auth, client) = setup("http://localhost:9", temp.path(), None);

        let err = run_to_string(
            Command::Login(LoginCommand::Spn(SpnArgs {
                client_id: "cid".to_string(),
                tenant_id: "tid".to_string(),
                client_secret: Some("secret".to_string()),
            })),
            &config,
            &auth,
            &client,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Error logging in"));

        // The configuration is remembered even though the exchange failed
        let spn = auth.get_state().await.spn_config.unwrap();
        assert_eq!(spn.client_id, "cid");
        assert_eq!(spn.authority, "http://localhost:9");
    }

    #[tokio::test]
    async fn test_display_workspaces() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/workspaces")
            .with_status(200)
            .with_body(
                r#"{"value": [
                    {"id": "ws-1", "displayName": "Sales", "capacityId": "cap-9"},
                    {"id": "ws-2", "displayName": "Scratch"}
                ]}"#,
            )
            .create_async()
            .await;

        let (config, auth, client) = setup(&server.url(), temp.path(), Some("token"));
        let output = run_to_string(
            Command::Display(DisplayCommand::Workspaces),
            &config,
            &auth,
            &client,
        )
        .await
        .unwrap();

        assert_eq!(
            output,
            "\nWorkspaces:\n  • Sales (ID: ws-1) (Capacity ID: cap-9)\n  • Scratch (ID: ws-2)\n"
        );
    }

    #[tokio::test]
    async fn test_display_empty_lakehouses() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/workspaces/ws-1/lakehouses")
            .with_status(200)
            .with_body(r#"{"value": []}"#)
            .create_async()
            .await;

        let (config, auth, client) = setup(&server.url(), temp.path(), Some("token"));
        let output = run_to_string(
            Command::Display(DisplayCommand::Lakehouses {
                workspace_id: "ws-1".to_string(),
            }),
            &config,
            &auth,
            &client,
        )
        .await
        .unwrap();

        assert_eq!(output, "No lakehouses found in workspace ws-1\n");
    }

    #[tokio::test]
    async fn test_create_workspace_with_capacity() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/workspaces")
            .with_status(201)
            .with_header("location", "https://api.fabric.microsoft.com/v1/workspaces/ws-new")
            .create_async()
            .await;
        let assign = server
            .mock("POST", "/v1/workspaces/ws-new/assignToCapacity")
            .with_status(202)
            .create_async()
            .await;

        let (config, auth, client) = setup(&server.url(), temp.path(), Some("token"));
        let output = run_to_string(
            Command::Create(CreateCommand::Workspace {
                name: "Sales".to_string(),
                capacity_id: Some("cap-9".to_string()),
                provision_identity: false,
            }),
            &config,
            &auth,
            &client,
        )
        .await
        .unwrap();

        assign.assert_async().await;
        assert_eq!(
            output,
            "Created workspace 'Sales' with ID: ws-new\nAssigned workspace to capacity cap-9\n"
        );
    }

    #[tokio::test]
    async fn test_status_mentions_override_token() {
        let temp = tempdir().unwrap();
        let (config, auth, client) = setup("http://localhost:9", temp.path(), Some("env"));

        let status = run_to_string(Command::Auth(AuthCommand::Status), &config, &auth, &client)
            .await
            .unwrap();
        assert!(status.contains("POWER_BI_ACCESS_TOKEN is set"));
    }
}
