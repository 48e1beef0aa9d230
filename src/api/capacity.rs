use reqwest::StatusCode;
use serde_json::Value;

use crate::auth::Provider;
use crate::error::{ApiError, Result};
use crate::http_client::FabricHttpClient;

/// Microsoft.Fabric resource provider API version
pub const API_VERSION: &str = "2022-07-01-preview";

/// Capacity state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityAction {
    Suspend,
    Resume,
}

impl CapacityAction {
    fn as_str(&self) -> &'static str {
        match self {
            CapacityAction::Suspend => "suspend",
            CapacityAction::Resume => "resume",
        }
    }
}

/// Management API path for a capacity action
fn capacity_action_path(
    subscription_id: &str,
    resource_group_name: &str,
    capacity_name: &str,
    action: CapacityAction,
) -> String {
    format!(
        "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Fabric/capacities/{}/{}?api-version={}",
        subscription_id,
        resource_group_name,
        capacity_name,
        action.as_str(),
        API_VERSION
    )
}

pub async fn suspend_capacity(
    client: &FabricHttpClient,
    subscription_id: &str,
    resource_group_name: &str,
    capacity_name: &str,
) -> Result<Option<Value>> {
    change_capacity_state(
        client,
        subscription_id,
        resource_group_name,
        capacity_name,
        CapacityAction::Suspend,
    )
    .await
}

pub async fn resume_capacity(
    client: &FabricHttpClient,
    subscription_id: &str,
    resource_group_name: &str,
    capacity_name: &str,
) -> Result<Option<Value>> {
    change_capacity_state(
        client,
        subscription_id,
        resource_group_name,
        capacity_name,
        CapacityAction::Resume,
    )
    .await
}

/// Returns `None` when the request was accepted for asynchronous processing
/// or the response has no body
async fn change_capacity_state(
    client: &FabricHttpClient,
    subscription_id: &str,
    resource_group_name: &str,
    capacity_name: &str,
    action: CapacityAction,
) -> Result<Option<Value>> {
    let url = client.management_url(&capacity_action_path(
        subscription_id,
        resource_group_name,
        capacity_name,
        action,
    ));
    tracing::info!("Attempting to {} capacity from URL: {}", action.as_str(), url);

    let response = client
        .send(Provider::Management, client.client().post(url))
        .await?;

    if response.status() == StatusCode::ACCEPTED {
        tracing::debug!("Request accepted and is being processed asynchronously");
        return Ok(None);
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        tracing::debug!("No content in response");
        return Ok(None);
    }

    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| ApiError::UnexpectedResponse(format!("{}: {}", e, body)))
}
