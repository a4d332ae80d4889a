pub mod columns;

use anyhow::{Context, Result};
use async_trait::async_trait;
use avoda_sync_api::graphql::GraphQlClient;
use avoda_sync_core::{ImportError, ValidationError, config::BoardConfig};
use graphql_client::QueryBody;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

pub use crate::columns::{ColumnOptions, ColumnValue, ColumnValues, ItemPayload};

pub const CREATE_ITEM_MUTATION: &str = include_str!("../graphql/create_item.graphql");

/// Identifier of a created board item.
pub type ItemId = String;

/// The board the widget is attached to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BoardContext {
    pub board_id: u64,
}

/// Operations of the board platform used by the importer.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn context(&self) -> Result<BoardContext, ImportError>;

    async fn create_item(
        &self,
        board_id: u64,
        item_name: &str,
        column_values: &ColumnValues,
    ) -> Result<ItemId, ImportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemVariables<'a> {
    board_id: String,
    item_name: &'a str,
    /// The platform's `JSON` scalar takes the encoded object as a string.
    column_values: String,
}

#[derive(Deserialize)]
struct CreateItemData {
    create_item: Option<CreatedItem>,
}

#[derive(Deserialize)]
struct CreatedItem {
    id: String,
}

/// Board platform client speaking its GraphQL API.
#[derive(Clone)]
pub struct MondayClient {
    graphql: GraphQlClient,
    board_id: Option<u64>,
}

impl MondayClient {
    pub fn new(config: &BoardConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut token =
            HeaderValue::from_str(config.api_token.trim()).context("Invalid board API token")?;
        token.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, token);
        if let Some(version) = &config.api_version {
            headers.insert(
                "API-Version",
                HeaderValue::from_str(version).context("Invalid board API version")?,
            );
        }
        let graphql = GraphQlClient::new(config.api_url.clone(), headers)?;
        Ok(Self { graphql, board_id: config.board_id })
    }
}

#[async_trait]
impl BoardApi for MondayClient {
    async fn context(&self) -> Result<BoardContext, ImportError> {
        self.board_id
            .map(|board_id| BoardContext { board_id })
            .ok_or(ValidationError::MissingBoardContext.into())
    }

    async fn create_item(
        &self,
        board_id: u64,
        item_name: &str,
        column_values: &ColumnValues,
    ) -> Result<ItemId, ImportError> {
        let column_values = serde_json::to_string(column_values)
            .map_err(|e| ImportError::item_write(format!("Failed to encode columns: {e}")))?;
        tracing::debug!(board_id, item_name, "Sending create_item");
        let body = QueryBody {
            variables: CreateItemVariables {
                board_id: board_id.to_string(),
                item_name,
                column_values,
            },
            query: CREATE_ITEM_MUTATION,
            operation_name: "createItem",
        };
        let data: Option<CreateItemData> =
            self.graphql.run(None, &body).await.map_err(|e| match e {
                ImportError::Validation(_) | ImportError::ItemWrite { .. } => e,
                other => ImportError::item_write(other.to_string()),
            })?;
        data.and_then(|d| d.create_item)
            .map(|item| item.id)
            .ok_or_else(|| ImportError::item_write("No item returned"))
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn config(url: &str, board_id: Option<u64>) -> BoardConfig {
        BoardConfig {
            api_url: url.parse().unwrap(),
            api_token: "board-token".into(),
            api_version: Some("2024-10".into()),
            board_id,
            country_code: "IL".into(),
            default_job_name: "Job".into(),
        }
    }

    #[tokio::test]
    async fn test_context_requires_board() {
        let client = MondayClient::new(&config("http://localhost/", None)).unwrap();
        assert_eq!(client.context().await, Err(ValidationError::MissingBoardContext.into()));
        let client = MondayClient::new(&config("http://localhost/", Some(9))).unwrap();
        assert_eq!(client.context().await, Ok(BoardContext { board_id: 9 }));
    }

    #[tokio::test]
    async fn test_create_item_encodes_columns_once() {
        let mut server = mockito::Server::new_async().await;
        let columns = ColumnValues::from([
            ("text_a", ColumnValue::Text("x".into())),
            ("date_b", ColumnValue::Date { date: "2024-01-01".into() }),
        ]);
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "board-token")
            .match_header("api-version", "2024-10")
            .match_body(Matcher::PartialJson(json!({
                "operationName": "createItem",
                "variables": {
                    "boardId": "77",
                    "itemName": "Dana Mor",
                    "columnValues": r#"{"date_b":{"date":"2024-01-01"},"text_a":"x"}"#,
                }
            })))
            .with_status(200)
            .with_body(r#"{"data": {"create_item": {"id": "123"}}}"#)
            .create_async()
            .await;
        let client = MondayClient::new(&config(&server.url(), Some(77))).unwrap();
        let id = client.create_item(77, "Dana Mor", &columns).await.unwrap();
        assert_eq!(id, "123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_item_failures_are_item_scoped() {
        let mut server = mockito::Server::new_async().await;
        let client = MondayClient::new(&config(&server.url(), Some(77))).unwrap();
        let cases = [
            (200, r#"{"errors": [{"message": "ColumnValueException"}]}"#),
            (500, "oops"),
            (200, r#"{"data": {"create_item": null}}"#),
            (200, r#"{"error_message": "Internal server error", "status_code": 500}"#),
        ];
        for (status, body) in cases {
            let mock =
                server.mock("POST", "/").with_status(status).with_body(body).create_async().await;
            let result = client.create_item(77, "x", &ColumnValues::new()).await;
            assert!(matches!(result, Err(ImportError::ItemWrite { .. })), "{body}: {result:?}");
            mock.remove_async().await;
        }
    }
}
