use crate::auth::Provider;
use crate::error::Result;
use crate::http_client::FabricHttpClient;
use crate::models::fabric::{GitConnectRequest, GitProviderDetails};

/// Connect a workspace to a Git repository
pub async fn connect_git(
    client: &FabricHttpClient,
    workspace_id: &str,
    details: GitProviderDetails,
) -> Result<()> {
    let url = client.fabric_url(&format!("workspaces/{}/git/connect", workspace_id));
    let payload = GitConnectRequest {
        git_provider_details: details,
    };

    tracing::debug!(
        "Connecting workspace {} to Git repository with payload: {:?}",
        workspace_id,
        payload
    );
    client
        .send(Provider::Fabric, client.client().post(url).json(&payload))
        .await?;

    tracing::debug!("Workspace {} successfully connected to Git repository", workspace_id);
    Ok(())
}
