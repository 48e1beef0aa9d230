use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use std::io;
use std::path::Path;

use super::read_json;
use crate::auth::Provider;
use crate::error::{ApiError, Result};
use crate::http_client::FabricHttpClient;
use crate::models::fabric::{Item, ListResponse};

// Semantic version fragment inside a package file name
static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d+\.\d+").unwrap());

static DOUBLE_HYPHEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"--").unwrap());

/// Normalize a library file name for staging
///
/// Transformations:
/// - fabriccli-0.0.1-py3-none-any.whl → fabriccli-py3-none-any.whl
pub fn normalize_library_name(name: &str) -> String {
    let without_version = VERSION_PATTERN.replace_all(name, "");
    DOUBLE_HYPHEN_PATTERN
        .replace_all(&without_version, "-")
        .into_owned()
}

/// List all Spark environments in a workspace
pub async fn list_environments(client: &FabricHttpClient, workspace_id: &str) -> Result<Vec<Item>> {
    let url = client.fabric_url(&format!("workspaces/{}/environments", workspace_id));
    let response = client.send(Provider::Fabric, client.client().get(url)).await?;

    let list: ListResponse<Item> = read_json(response).await?;
    tracing::debug!("Found environments: {:?}", list.value);
    Ok(list.value)
}

/// Publish the staged changes of an environment
pub async fn publish_environment(
    client: &FabricHttpClient,
    workspace_id: &str,
    environment_id: &str,
) -> Result<()> {
    let url = client.fabric_url(&format!(
        "workspaces/{}/environments/{}/staging/publish",
        workspace_id, environment_id
    ));
    client.send(Provider::Fabric, client.client().post(url)).await?;
    Ok(())
}

/// Upload a library to the environment with the given display name, then publish it
pub async fn upload_staging_library(
    client: &FabricHttpClient,
    workspace_id: &str,
    environment_name: &str,
    library_path: &Path,
) -> Result<()> {
    let environments = list_environments(client, workspace_id).await?;
    let environment_id = environments
        .iter()
        .find(|env| env.display_name.as_deref() == Some(environment_name))
        .and_then(|env| env.id.clone())
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Environment with name '{}' is not known",
                environment_name
            ))
        })?;

    let library_name = library_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid library path: {}", library_path.display()),
            )
        })?;
    let content = tokio::fs::read(library_path).await?;
    let normalized = normalize_library_name(&library_name);

    let part = Part::bytes(content)
        .file_name(normalized.clone())
        .mime_str("application/octet-stream")?;
    let form = Form::new().part("file", part);

    tracing::debug!("Uploading library: {} as {}", library_name, normalized);
    let url = client.fabric_url(&format!(
        "workspaces/{}/environments/{}/staging/libraries",
        workspace_id, environment_id
    ));
    client
        .send_with_authorization(Provider::Fabric, client.client().post(url).multipart(form))
        .await?;

    publish_environment(client, workspace_id, &environment_id).await
}
