use super::{create_item, list_items};
use crate::error::Result;
use crate::http_client::FabricHttpClient;

pub async fn create_warehouse(
    client: &FabricHttpClient,
    workspace_id: &str,
    display_name: &str,
    description: Option<&str>,
) -> Result<String> {
    create_item(client, workspace_id, "warehouses", display_name, description).await
}

/// (id, display name) of every warehouse in a workspace
pub async fn list_warehouses(
    client: &FabricHttpClient,
    workspace_id: &str,
) -> Result<Vec<(String, String)>> {
    list_items(client, workspace_id, "warehouses").await
}
