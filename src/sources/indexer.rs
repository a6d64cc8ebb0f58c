//! Gardens subgraph client
//!
//! Lists gardens and fetches single gardens over GraphQL. The sort
//! parameters are forwarded as query variables without interpretation.

use crate::address;
use crate::config::IndexerConfig;
use crate::error::{GardenError, Result};
use crate::types::{Network, OrgRecord, QueryParams};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// On-chain indexing collaborator
#[async_trait]
pub trait Indexer: Send + Sync {
    /// List gardens of a network, ordered as requested
    async fn list_organizations(&self, network: &Network, query: &QueryParams) -> Result<Vec<OrgRecord>>;

    /// Fetch one garden; a missing garden is `GardenError::GardenNotFound`
    async fn get_organization(&self, network: &Network, id: &str) -> Result<OrgRecord>;
}

const GARDEN_FIELDS: &str = r#"
    id
    active
    createdAt
    proposalCount
    supporterCount
    honeyLiquidity
    token { id name symbol decimals }
    wrappableToken { id name symbol decimals }
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GardensData {
    organizations: Vec<OrgRecord>,
}

#[derive(Debug, Deserialize)]
struct GardenData {
    organization: Option<OrgRecord>,
}

/// Indexer backed by the gardens subgraph
pub struct SubgraphIndexer {
    page_size: u32,
    http_client: reqwest::Client,
}

impl SubgraphIndexer {
    pub fn new(config: &IndexerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            page_size: config.page_size,
            http_client,
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        network: &Network,
        query: String,
        variables: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .http_client
            .post(&network.subgraph_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GardenError::Network(format!("HTTP {} - {}", status, body)));
        }

        let payload: GraphQlResponse<T> = response.json().await?;
        if !payload.errors.is_empty() {
            let messages: Vec<_> = payload.errors.into_iter().map(|e| e.message).collect();
            return Err(GardenError::Indexer(messages.join("; ")));
        }

        payload
            .data
            .ok_or_else(|| GardenError::Indexer("response carried no data".into()))
    }
}

#[async_trait]
impl Indexer for SubgraphIndexer {
    async fn list_organizations(&self, network: &Network, query: &QueryParams) -> Result<Vec<OrgRecord>> {
        let gql = format!(
            "query Gardens($first: Int!, $orderBy: Organization_orderBy, $orderDirection: OrderDirection) {{
                organizations(first: $first, orderBy: $orderBy, orderDirection: $orderDirection) {{ {} }}
            }}",
            GARDEN_FIELDS
        );
        let variables = serde_json::json!({
            "first": self.page_size,
            "orderBy": query.sorting.order_by,
            "orderDirection": query.sorting.order_direction.as_str(),
        });

        let data: GardensData = self.query(network, gql, variables).await?;
        Ok(data
            .organizations
            .into_iter()
            .map(|mut record| {
                record.chain_id = network.chain_id;
                record
            })
            .collect())
    }

    async fn get_organization(&self, network: &Network, id: &str) -> Result<OrgRecord> {
        let gql = format!(
            "query Garden($id: ID!) {{ organization(id: $id) {{ {} }} }}",
            GARDEN_FIELDS
        );
        let variables = serde_json::json!({ "id": address::normalize(id) });

        let data: GardenData = self.query(network, gql, variables).await?;
        let mut record = data
            .organization
            .ok_or_else(|| GardenError::GardenNotFound(id.to_string()))?;
        record.chain_id = network.chain_id;
        Ok(record)
    }
}
