pub mod graphql;

use anyhow::Result;
use async_trait::async_trait;
use avoda_sync_core::{
    Collection, Credential, ImportError, RemoteRecord, ValidationError,
    config::RemoteConfig,
    models::{EmployerRecord, JobRecord},
};
use graphql_client::QueryBody;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::graphql::GraphQlClient;

pub const JOB_LISTINGS_QUERY: &str = include_str!("../graphql/job_listings.graphql");
pub const EMPLOYERS_QUERY: &str = include_str!("../graphql/employers.graphql");

/// One page of a remote collection as the API returned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RemoteRecord>,
    /// Entries in the returned list, null entries included.
    pub len: usize,
}

impl Page {
    /// An empty list is the only end-of-collection signal; a page of nulls is not.
    pub fn is_end(&self) -> bool { self.len == 0 }
}

impl From<Vec<RemoteRecord>> for Page {
    fn from(records: Vec<RemoteRecord>) -> Self { Self { len: records.len(), records } }
}

#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &Collection,
        page: u32,
        page_size: u32,
    ) -> Result<Page, ImportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobListingsVariables<'a> {
    limit: u32,
    page: u32,
    is_blocked: bool,
    approval_status: &'a str,
}

#[derive(Serialize)]
struct UsersVariables {
    limit: u32,
    page: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobListingsData {
    job_listings: Option<JobListingsPage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobListingsPage {
    job_listings: Option<Vec<Option<JobRecord>>>,
}

#[derive(Deserialize)]
struct UsersData {
    users: Option<UsersPage>,
}

#[derive(Deserialize)]
struct UsersPage {
    users: Option<Vec<Option<EmployerRecord>>>,
}

/// Client for the job-listing API's paginated collections.
#[derive(Clone)]
pub struct RemoteClient {
    graphql: GraphQlClient,
    credential: Credential,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig, credential: Credential) -> Result<Self> {
        let graphql = GraphQlClient::new(config.endpoint.clone(), HeaderMap::new())?;
        Ok(Self { graphql, credential })
    }

    async fn fetch_jobs(
        &self,
        authorization: &str,
        variables: JobListingsVariables<'_>,
    ) -> Result<Page, ImportError> {
        let body = QueryBody {
            variables,
            query: JOB_LISTINGS_QUERY,
            operation_name: "jobListings",
        };
        let data: Option<JobListingsData> = self.graphql.run(Some(authorization), &body).await?;
        let items = data.and_then(|d| d.job_listings).and_then(|p| p.job_listings);
        Ok(collect_records(items, RemoteRecord::Job))
    }

    async fn fetch_employers(
        &self,
        authorization: &str,
        variables: UsersVariables,
    ) -> Result<Page, ImportError> {
        let body = QueryBody { variables, query: EMPLOYERS_QUERY, operation_name: "users" };
        let data: Option<UsersData> = self.graphql.run(Some(authorization), &body).await?;
        let items = data.and_then(|d| d.users).and_then(|p| p.users);
        Ok(collect_records(items, RemoteRecord::Employer))
    }
}

fn collect_records<T>(items: Option<Vec<Option<T>>>, wrap: impl Fn(T) -> RemoteRecord) -> Page {
    let items = items.unwrap_or_default();
    let len = items.len();
    let records = items.into_iter().flatten().map(wrap).collect::<Vec<_>>();
    if records.len() != len {
        tracing::warn!("Skipped {} null records in page", len - records.len());
    }
    Page { records, len }
}

#[async_trait]
impl CollectionSource for RemoteClient {
    async fn fetch_page(
        &self,
        collection: &Collection,
        page: u32,
        page_size: u32,
    ) -> Result<Page, ImportError> {
        if page == 0 || page_size == 0 {
            return Err(ValidationError::InvalidPage { page, page_size }.into());
        }
        let authorization = format!("Bearer {}", self.credential.bearer()?);
        tracing::debug!("Fetching {} page {} (size {})", collection.kind(), page, page_size);
        match collection {
            Collection::Jobs(filters) => {
                self.fetch_jobs(&authorization, JobListingsVariables {
                    limit: page_size,
                    page,
                    is_blocked: filters.is_blocked,
                    approval_status: &filters.approval_status,
                })
                .await
            }
            Collection::Employers => {
                self.fetch_employers(&authorization, UsersVariables { limit: page_size, page })
                    .await
            }
        }
    }
}
