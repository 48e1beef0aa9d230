use reqwest::header::LOCATION;
use reqwest::Url;

use super::read_json;
use crate::auth::Provider;
use crate::error::{ApiError, Result};
use crate::http_client::FabricHttpClient;
use crate::models::fabric::{
    AssignToCapacityRequest, CreateWorkspaceRequest, CreatedItem, ListResponse, Workspace,
};

/// Create a workspace and return its ID
///
/// The ID is taken from the `Location` header, falling back to the body.
pub async fn create_workspace(
    client: &FabricHttpClient,
    display_name: &str,
    capacity_id: Option<&str>,
) -> Result<String> {
    let payload = CreateWorkspaceRequest {
        display_name: display_name.to_string(),
        capacity_id: capacity_id.map(str::to_string),
    };
    tracing::debug!("Creating workspace with payload: {:?}", payload);

    let url = client.fabric_url("workspaces");
    let response = client
        .send(Provider::Fabric, client.client().post(url).json(&payload))
        .await?;

    let from_location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(id_from_location);

    let workspace_id = match from_location {
        Some(id) => id,
        None => read_json::<CreatedItem>(response)
            .await
            .ok()
            .and_then(|item| item.id)
            .ok_or_else(|| {
                ApiError::UnexpectedResponse("No Location header or id in response".to_string())
            })?,
    };

    tracing::debug!("Workspace created with ID: {}", workspace_id);
    Ok(workspace_id)
}

/// Last path segment of a Location header value
fn id_from_location(location: &str) -> Option<String> {
    let path = match Url::parse(location) {
        Ok(url) => url.path().to_string(),
        Err(_) => location.to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// List all workspaces visible to the caller
pub async fn list_workspaces(client: &FabricHttpClient) -> Result<Vec<Workspace>> {
    let url = client.fabric_url("workspaces");
    let response = client.send(Provider::Fabric, client.client().get(url)).await?;

    let list: ListResponse<Workspace> = read_json(response).await?;
    tracing::info!("Number of workspaces found: {}", list.value.len());
    Ok(list.value)
}

pub async fn assign_to_capacity(
    client: &FabricHttpClient,
    workspace_id: &str,
    capacity_id: &str,
) -> Result<()> {
    let url = client.fabric_url(&format!("workspaces/{}/assignToCapacity", workspace_id));
    let payload = AssignToCapacityRequest {
        capacity_id: capacity_id.to_string(),
    };

    tracing::debug!(
        "Assigning workspace ID {} to capacity ID {}",
        workspace_id,
        capacity_id
    );
    client
        .send(Provider::Fabric, client.client().post(url).json(&payload))
        .await?;
    Ok(())
}

pub async fn provision_identity(client: &FabricHttpClient, workspace_id: &str) -> Result<()> {
    let url = client.fabric_url(&format!("workspaces/{}/provisionIdentity", workspace_id));

    tracing::debug!("Provisioning identity for workspace ID: {}", workspace_id);
    client.send(Provider::Fabric, client.client().post(url)).await?;
    Ok(())
}
