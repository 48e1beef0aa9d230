// Fabric and Azure management API operations
//
// One function per endpoint. Each obtains fresh headers through the HTTP
// client immediately before sending.

pub mod capacity;
pub mod environments;
pub mod git;
pub mod lakehouses;
pub mod warehouses;
pub mod workspaces;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::auth::Provider;
use crate::error::{ApiError, Result};
use crate::http_client::FabricHttpClient;
use crate::models::fabric::{CreateItemRequest, CreatedItem, Item, ListResponse};

/// Decode a JSON response body
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| ApiError::UnexpectedResponse(format!("{}: {}", e, body)))
}

/// Create a workspace item (`lakehouses`, `warehouses`, ...) and return its ID
pub(crate) async fn create_item(
    client: &FabricHttpClient,
    workspace_id: &str,
    collection: &str,
    display_name: &str,
    description: Option<&str>,
) -> Result<String> {
    let url = client.fabric_url(&format!("workspaces/{}/{}", workspace_id, collection));
    let payload = CreateItemRequest {
        display_name: display_name.to_string(),
        description: description.map(str::to_string),
    };
    tracing::debug!("Creating {} item with payload: {:?}", collection, payload);

    let response = client
        .send(Provider::Fabric, client.client().post(url).json(&payload))
        .await?;

    let created: CreatedItem = read_json(response).await?;
    let id = created
        .id
        .ok_or_else(|| ApiError::UnexpectedResponse(format!("No id in created {} item", collection)))?;

    tracing::debug!("Created {} item with ID: {}", collection, id);
    Ok(id)
}

/// List (id, display name) pairs of a workspace item collection
pub(crate) async fn list_items(
    client: &FabricHttpClient,
    workspace_id: &str,
    collection: &str,
) -> Result<Vec<(String, String)>> {
    let url = client.fabric_url(&format!("workspaces/{}/{}", workspace_id, collection));
    tracing::debug!("Fetching {} for workspace ID: {}", collection, workspace_id);

    let response = client.send(Provider::Fabric, client.client().get(url)).await?;
    let list: ListResponse<Item> = read_json(response).await?;

    let items: Vec<(String, String)> = list.value.iter().filter_map(Item::id_and_name).collect();
    tracing::debug!("Fetched {}: {:?}", collection, items);
    Ok(items)
}
