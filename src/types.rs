//! Data model shared by the sources, the merger and the consumers
//!
//! On-chain records come from the indexer, curated metadata from the
//! metadata host. Both are immutable once fetched; a refetch replaces the
//! whole collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A network the directory can target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    /// Chain identifier (e.g., 100 for Gnosis)
    pub chain_id: u64,
    /// Human readable name
    pub name: String,
    /// GraphQL endpoint of the gardens subgraph
    pub subgraph_url: String,
    /// Overrides the metadata URL template for this network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

/// ERC20 token descriptor as reported by the indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Partial token descriptor supplied by curated metadata
///
/// Every present field shadows the on-chain value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl TokenOverride {
    /// Overlay this override on top of an on-chain token
    pub fn apply(&self, mut token: Token) -> Token {
        if let Some(id) = &self.id {
            token.id = id.clone();
        }
        if let Some(name) = &self.name {
            token.name = name.clone();
        }
        if let Some(symbol) = &self.symbol {
            token.symbol = symbol.clone();
        }
        if let Some(decimals) = self.decimals {
            token.decimals = decimals;
        }
        if let Some(logo) = &self.logo {
            token.logo = Some(logo.clone());
        }
        token
    }
}

/// On-chain garden record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRecord {
    /// Garden address, primary key
    pub id: String,
    /// Network the record was fetched from
    #[serde(default)]
    pub chain_id: u64,
    pub token: Token,
    #[serde(default)]
    pub wrappable_token: Option<Token>,
    #[serde(default)]
    pub active: bool,
    /// Creation timestamp (seconds, as delivered by the subgraph)
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub proposal_count: u64,
    #[serde(default)]
    pub supporter_count: u64,
    #[serde(default)]
    pub honey_liquidity: Option<String>,
}

/// Labelled link in curated metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub link: String,
}

/// Documentation and community links of a garden
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GardenLinks {
    #[serde(default)]
    pub documentation: Vec<LinkEntry>,
    #[serde(default)]
    pub community: Vec<LinkEntry>,
}

/// Curated off-chain attributes for one garden
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgMetadata {
    /// Garden address, matched case-insensitively against `OrgRecord::id`
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, alias = "logotype", skip_serializing_if = "Option::is_none")]
    pub logo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_logo: Option<String>,
    /// Forum location: absolute URL or bare host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<GardenLinks>,
    #[serde(default, rename = "wrappableToken", skip_serializing_if = "Option::is_none")]
    pub wrappable_token: Option<TokenOverride>,
    /// Any other curated attribute, preserved verbatim
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Metadata document served per network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default, alias = "organizations")]
    pub gardens: Vec<OrgMetadata>,
}

/// On-chain record overlaid with its curated metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedOrg {
    pub id: String,
    /// Normalized (lowercase) form of `id`
    pub address: String,
    pub chain_id: u64,
    pub token: Token,
    pub wrappable_token: Option<Token>,
    pub active: bool,
    pub created_at: Option<String>,
    pub proposal_count: u64,
    pub supporter_count: u64,
    pub honey_liquidity: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub logo_type: Option<String>,
    pub forum_url: Option<String>,
    pub links: Option<GardenLinks>,
    /// Curated attributes, spread onto the garden when serialized
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl MergedOrg {
    /// Name shown in the directory, falling back to the address
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Sort direction passed to the indexer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort key and direction, not interpreted by the directory itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sorting {
    pub order_by: String,
    pub order_direction: SortDirection,
}

impl Default for Sorting {
    fn default() -> Self {
        Self {
            order_by: "createdAt".to_string(),
            order_direction: SortDirection::Desc,
        }
    }
}

/// Filters that require a refetch from the indexer
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParams {
    pub sorting: Sorting,
}

impl QueryParams {
    pub fn sorted_by(order_by: impl Into<String>, order_direction: SortDirection) -> Self {
        Self {
            sorting: Sorting {
                order_by: order_by.into(),
                order_direction,
            },
        }
    }
}

/// Filters applied client-side after the fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalFilters {
    /// Raw, undebounced name filter text
    pub name: String,
}
