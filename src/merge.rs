//! Merging on-chain records with curated metadata
//!
//! This is the only place overlay precedence is defined:
//! - token logo comes from metadata when present
//! - wrappable-token fields from metadata shadow the on-chain ones, field
//!   by field, but only when the garden has an on-chain wrappable token
//! - the forum URL is derived from metadata alone

use crate::address::{self, addresses_equal};
use crate::types::{MergedOrg, OrgMetadata, OrgRecord};

/// Find the metadata entry for a garden address
pub fn find_metadata<'a>(id: &str, metadata: &'a [OrgMetadata]) -> Option<&'a OrgMetadata> {
    metadata.iter().find(|m| addresses_equal(&m.address, id))
}

/// Merge one record with the matching entry of a metadata collection
///
/// Every record yields exactly one merged view; a missing entry behaves
/// as empty metadata.
pub fn merge_garden_metadata(record: &OrgRecord, metadata: &[OrgMetadata]) -> MergedOrg {
    let empty = OrgMetadata::default();
    let meta = find_metadata(&record.id, metadata).unwrap_or(&empty);

    let mut token = record.token.clone();
    if let Some(logo) = &meta.token_logo {
        token.logo = Some(logo.clone());
    }

    let wrappable_token = record.wrappable_token.clone().map(|wrappable| {
        match &meta.wrappable_token {
            Some(overrides) => overrides.apply(wrappable),
            None => wrappable,
        }
    });

    MergedOrg {
        id: record.id.clone(),
        address: address::normalize(&record.id),
        chain_id: record.chain_id,
        token,
        wrappable_token,
        active: record.active,
        created_at: record.created_at.clone(),
        proposal_count: record.proposal_count,
        supporter_count: record.supporter_count,
        honey_liquidity: record.honey_liquidity.clone(),
        name: meta.name.clone(),
        description: meta.description.clone(),
        logo: meta.logo.clone(),
        logo_type: meta.logo_type.clone(),
        forum_url: forum_url(meta),
        links: meta.links.clone(),
        attributes: meta.attributes.clone(),
    }
}

/// Merge a whole collection, preserving order
pub fn merge_all(records: &[OrgRecord], metadata: &[OrgMetadata]) -> Vec<MergedOrg> {
    records
        .iter()
        .map(|record| merge_garden_metadata(record, metadata))
        .collect()
}

/// Forum URL of a garden; bare hosts are promoted to https
pub fn forum_url(metadata: &OrgMetadata) -> Option<String> {
    let forum = metadata.forum.as_deref()?.trim();
    if forum.is_empty() {
        return None;
    }
    if forum.starts_with("https://") || forum.starts_with("http://") {
        Some(forum.to_string())
    } else {
        Some(format!("https://{}", forum.trim_start_matches('/')))
    }
}
