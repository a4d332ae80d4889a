use anyhow::{Context, Result};
use avoda_sync_core::ImportError;
use graphql_client::{QueryBody, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

/// Executes fixed GraphQL documents against a single HTTP endpoint.
#[derive(Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl GraphQlClient {
    pub fn new(endpoint: Url, mut headers: HeaderMap) -> Result<Self> {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, endpoint })
    }

    /// Run a query and return its `data` member.
    ///
    /// A non-empty `errors` array fails with [`ImportError::Remote`] even when partial data is
    /// present. A response with neither data nor errors yields `Ok(None)`.
    pub async fn run<V, D>(
        &self,
        authorization: Option<&str>,
        body: &QueryBody<V>,
    ) -> Result<Option<D>, ImportError>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let mut request = self.http.post(self.endpoint.clone()).json(body);
        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ImportError::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("{} returned {}: {}", body.operation_name, status, text);
            return Err(ImportError::transport(
                Some(status.as_u16()),
                format!("{} returned HTTP {}", body.operation_name, status),
            ));
        }
        let response: Response<D> = response.json().await.map_err(|e| {
            ImportError::transport(
                Some(status.as_u16()),
                format!("Invalid response to {}: {}", body.operation_name, e),
            )
        })?;
        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            return Err(ImportError::Remote {
                messages: errors.into_iter().map(|error| error.message).collect(),
            });
        }
        Ok(response.data)
    }
}
