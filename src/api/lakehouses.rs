use super::{create_item, list_items};
use crate::error::Result;
use crate::http_client::FabricHttpClient;

pub async fn create_lakehouse(
    client: &FabricHttpClient,
    workspace_id: &str,
    display_name: &str,
    description: Option<&str>,
) -> Result<String> {
    create_item(client, workspace_id, "lakehouses", display_name, description).await
}

/// (id, display name) of every lakehouse in a workspace
pub async fn list_lakehouses(
    client: &FabricHttpClient,
    workspace_id: &str,
) -> Result<Vec<(String, String)>> {
    list_items(client, workspace_id, "lakehouses").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::test_support::token_client;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_lakehouse() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workspaces/ws-1/lakehouses")
            .match_header("authorization", "Bearer token")
            .match_body(Matcher::Json(json!({"displayName": "bronze", "description": "raw"})))
            .with_status(201)
            .with_body(r#"{"id": "lh-1", "displayName": "bronze", "type": "Lakehouse"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url(), temp.path());
        let id = create_lakehouse(&client, "ws-1", "bronze", Some("raw"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "lh-1");
    }

    #[tokio::test]
    async fn test_list_lakehouses_skips_incomplete_entries() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/workspaces/ws-1/lakehouses")
            .with_status(200)
            .with_body(
                r#"{"value": [
                    {"id": "lh-1", "displayName": "bronze"},
                    {"id": "lh-2"},
                    {"id": "lh-3", "displayName": "gold"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = token_client(&server.url(), temp.path());
        let lakehouses = list_lakehouses(&client, "ws-1").await.unwrap();

        assert_eq!(
            lakehouses,
            vec![
                ("lh-1".to_string(), "bronze".to_string()),
                ("lh-3".to_string(), "gold".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_lakehouse_error() {
        let temp = tempdir().unwrap();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/workspaces/ws-1/lakehouses")
            .with_status(409)
            .with_body(r#"{"errorCode": "ItemDisplayNameAlreadyInUse"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url(), temp.path());
        let err = create_lakehouse(&client, "ws-1", "bronze", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream { status: 409, .. }));
    }
}
