//! Directory aggregation integration tests
//!
//! Exercises the aggregator against fake indexer and metadata hosts:
//! - merge of list and metadata, voided exclusion
//! - debounced name filter
//! - degradation on source failures
//! - reload, query and network changes
//! - stale fetch rejection

mod common;

use common::{metadata, network, until, FakeIndexer, FakeMetadataHost};
use garden_directory::{
    AggregatorOptions, DirectoryAggregator, DirectorySource, DirectoryView, FilterEngine,
    MetadataSource, QueryParams, SortDirection, VoidedRegistry,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn aggregator(
    indexer: &Arc<FakeIndexer>,
    host: &Arc<FakeMetadataHost>,
    voided: VoidedRegistry,
) -> DirectoryAggregator {
    DirectoryAggregator::new(
        network(100),
        Arc::new(MetadataSource::new(host.clone())),
        DirectorySource::new(indexer.clone(), Arc::new(voided)),
        FilterEngine::default(),
        AggregatorOptions::default(),
    )
}

async fn ready(aggregator: &DirectoryAggregator) -> DirectoryView {
    tokio::time::timeout(Duration::from_secs(5), aggregator.ready())
        .await
        .expect("directory settles")
}

fn ids(view: &DirectoryView) -> Vec<String> {
    view.gardens.iter().map(|g| g.id.clone()).collect()
}

fn two_gardens() -> (Arc<FakeIndexer>, Arc<FakeMetadataHost>) {
    (
        Arc::new(FakeIndexer::with(100, &["0xA", "0xB"])),
        Arc::new(FakeMetadataHost::with(100, vec![metadata("0xA", Some("logoA.png"))])),
    )
}

// =============================================================================
// Merge and exclusion
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_merges_list_with_metadata() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());

    let view = ready(&aggregator).await;
    assert!(!view.loading);
    assert_eq!(ids(&view), vec!["0xA", "0xB"]);

    let a = &view.gardens[0];
    assert_eq!(a.token.logo.as_deref(), Some("logoA.png"));
    assert_eq!(a.name.as_deref(), Some("Garden 0xA"));

    let b = &view.gardens[1];
    assert_eq!(b.token.logo, None);
    assert_eq!(b.name, None);
    assert_eq!(b.forum_url, None);

    assert_eq!(view.metadata.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_voided_gardens_never_listed() {
    let (indexer, host) = two_gardens();
    let voided = VoidedRegistry::from_entries([(100, vec!["0xb"])]);
    let aggregator = aggregator(&indexer, &host, voided);

    let view = ready(&aggregator).await;
    assert_eq!(ids(&view), vec!["0xA"]);

    aggregator.set_query(QueryParams::sorted_by("proposalCount", SortDirection::Desc));
    let view = ready(&aggregator).await;
    assert_eq!(ids(&view), vec!["0xA"]);
}

// =============================================================================
// Name filter
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_name_filter_without_match_is_empty() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;

    aggregator.set_name_filter("xyz");

    let mut views = aggregator.subscribe();
    let view = views
        .wait_for(|view| view.applied_filter == "xyz")
        .await
        .unwrap()
        .clone();
    assert!(view.gardens.is_empty());
    assert_eq!(view.internal_filters.name, "xyz");

    aggregator.set_name_filter("");
    let view = views
        .wait_for(|view| view.applied_filter.is_empty())
        .await
        .unwrap()
        .clone();
    assert_eq!(view.gardens.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_name_filter_waits_for_settling_delay() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;
    let list_calls = indexer.list_calls.load(Ordering::SeqCst);

    aggregator.set_name_filter("garden 0xa");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(aggregator.view().gardens.len(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let view = aggregator.view();
    assert_eq!(ids(&view), vec!["0xA"]);

    // Filtering never refetches
    assert_eq!(indexer.list_calls.load(Ordering::SeqCst), list_calls);
}

// =============================================================================
// Failures degrade
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_metadata_failure_degrades_to_records_only() {
    let (indexer, host) = two_gardens();
    host.fail.store(true, Ordering::SeqCst);
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());

    let view = ready(&aggregator).await;
    assert_eq!(ids(&view), vec!["0xA", "0xB"]);
    assert!(view.metadata.is_empty());
    assert!(view.gardens.iter().all(|g| g.token.logo.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_list_failure_degrades_to_empty_directory() {
    let (indexer, host) = two_gardens();
    indexer.fail_list.store(true, Ordering::SeqCst);
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());

    let view = ready(&aggregator).await;
    assert!(!view.loading);
    assert!(view.gardens.is_empty());
    assert_eq!(view.metadata.len(), 1);

    indexer.fail_list.store(false, Ordering::SeqCst);
    aggregator.reload();
    assert_eq!(ready(&aggregator).await.gardens.len(), 2);
}

// =============================================================================
// Refetch triggers
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reload_refetches_both_sources() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;

    indexer.set(100, &["0xA", "0xB", "0xC"]);
    aggregator.reload();
    assert!(aggregator.loading());

    let view = ready(&aggregator).await;
    assert_eq!(ids(&view), vec!["0xA", "0xB", "0xC"]);
    assert_eq!(host.calls.load(Ordering::SeqCst), 2);
    assert_eq!(indexer.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_query_change_refetches_list_only() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;

    let query = QueryParams::sorted_by("supporterCount", SortDirection::Asc);
    aggregator.set_query(query.clone());
    let view = ready(&aggregator).await;

    assert_eq!(view.external_filters, query);
    assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    assert_eq!(indexer.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(indexer.queries.lock().unwrap().last(), Some(&query));

    // Same query again is not a new key
    aggregator.set_query(query);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(indexer.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_network_switch_replaces_directory() {
    let (indexer, host) = two_gardens();
    indexer.set(137, &["0xP"]);
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;

    aggregator.switch_network(network(137));
    let view = ready(&aggregator).await;

    assert_eq!(view.network.chain_id, 137);
    assert_eq!(ids(&view), vec!["0xP"]);
    assert!(view.metadata.is_empty());
}

// =============================================================================
// Stale results
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_superseded_metadata_fetch_is_discarded() {
    let (indexer, host) = two_gardens();
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    ready(&aggregator).await;

    host.gated.store(true, Ordering::SeqCst);
    aggregator.reload();
    aggregator.reload();
    until(|| host.pending() == 2).await;

    // Second (latest) reload answers first
    host.release(1, vec![metadata("0xA", Some("second.png"))]);
    let view = ready(&aggregator).await;
    assert_eq!(view.gardens[0].token.logo.as_deref(), Some("second.png"));

    // First reload answers late and must not overwrite
    host.release(0, vec![metadata("0xA", Some("first.png"))]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let view = aggregator.view();
    assert!(!view.loading);
    assert_eq!(view.gardens[0].token.logo.as_deref(), Some("second.png"));
}

#[tokio::test(start_paused = true)]
async fn test_loading_is_or_of_both_sources() {
    let (indexer, host) = two_gardens();
    host.gated.store(true, Ordering::SeqCst);
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());

    until(|| host.pending() == 1).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    // List is in, metadata is not
    let view = aggregator.view();
    assert!(view.loading);
    assert!(aggregator.loading());
    assert_eq!(view.gardens.len(), 2);

    host.release(0, vec![]);
    let view = ready(&aggregator).await;
    assert!(!view.loading);
}

#[tokio::test(start_paused = true)]
async fn test_old_network_metadata_discarded_after_switch() {
    let (indexer, host) = two_gardens();
    indexer.set(137, &["0xP"]);
    host.gated.store(true, Ordering::SeqCst);
    let aggregator = aggregator(&indexer, &host, VoidedRegistry::empty());
    until(|| host.pending() == 1).await;

    aggregator.switch_network(network(137));
    until(|| host.pending() == 2).await;

    let mut views = aggregator.subscribe();
    let recorder = tokio::spawn(async move {
        let mut seen = vec![views.borrow_and_update().clone()];
        while views.changed().await.is_ok() {
            seen.push(views.borrow_and_update().clone());
        }
        seen
    });

    host.release(1, vec![metadata("0xP", Some("logoP.png"))]);
    let view = ready(&aggregator).await;
    assert_eq!(ids(&view), vec!["0xP"]);
    assert_eq!(view.gardens[0].token.logo.as_deref(), Some("logoP.png"));

    // Chain 100 answers late
    host.release(0, vec![metadata("0xA", Some("logoA.png"))]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let view = aggregator.view();
    assert_eq!(view.network.chain_id, 137);
    assert_eq!(ids(&view), vec!["0xP"]);
    assert_eq!(view.metadata.len(), 1);
    assert_eq!(view.metadata[0].address, "0xP");

    drop(aggregator);
    let seen = recorder.await.unwrap();
    let on_new_chain: Vec<_> = seen.iter().filter(|v| v.network.chain_id == 137).collect();
    assert!(!on_new_chain.is_empty());
    for view in on_new_chain {
        assert!(view.gardens.iter().all(|g| g.id == "0xP"));
        assert!(view.metadata.iter().all(|m| m.address == "0xP"));
    }
}
