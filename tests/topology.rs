//! End-to-end tests: mock engine through rebuild, enumeration, diffing and
//! the background change loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use topomirror::adapter::{RequestKind, TopologyAdapter};
use topomirror::config::AdapterConfig;
use topomirror::filter::{Criterion, FilterOp, RelationField, ResourceField};
use topomirror::interfaces::event_sink::{EventReason, TopologyEvent};
use topomirror::model::{
    ActivationState, CommunicationState, CompoundState, Domain, DomainState, OperationalState,
    PolicyInfo, RelationKind, ResourceKey, ResourceType,
};
use topomirror::store::TopologyStore;
use topomirror::sync::TopologySynchronizer;
use topomirror::test_utils::{
    CollectingEventSink, ControlCommand, MockClusterQuery, MockControlChannel, MockNotifier,
    NotifierHandle,
};

fn empty_domain() -> Domain {
    let now = Utc::now();
    Domain {
        name: String::new(),
        state: DomainState::Offline,
        communication: CommunicationState::Ok,
        automation_product: String::new(),
        automation_version: String::new(),
        automation_startup: now,
        adapter_product: String::new(),
        adapter_version: String::new(),
        adapter_location: String::new(),
        adapter_startup: now,
        policy: PolicyInfo {
            name: String::new(),
            activation_time: now,
        },
    }
}

/// Two online nodes, natives rA (running on n1 via location constraint) and
/// rB (stopped, target stopped), group g1 = { rA }.
async fn seeded_query() -> Arc<MockClusterQuery> {
    let query = Arc::new(MockClusterQuery::new("cluster1", "2.1.3"));
    query.add_node("n1", true, false).await;
    query.add_node("n2", true, false).await;
    query.add_native("rA", "running", "started").await;
    query.add_native("rB", "stopped", "stopped").await;
    query.add_group("g1", &["rA"]).await;
    query
        .add_location("loc1", "rA", "100", &[("#uname", "eq", "n1")])
        .await;
    query
}

struct Harness {
    query: Arc<MockClusterQuery>,
    sync: Arc<TopologySynchronizer>,
    sink: Arc<CollectingEventSink>,
    notify: NotifierHandle,
}

async fn harness() -> Harness {
    let query = seeded_query().await;
    let (notifier, notify) = MockNotifier::new();
    let sink = Arc::new(CollectingEventSink::new());
    let sync = Arc::new(TopologySynchronizer::new(
        query.clone(),
        Arc::new(notifier),
        Some(sink.clone()),
        Arc::new(TopologyStore::new(empty_domain())),
        AdapterConfig::default(),
    ));
    Harness {
        query,
        sync,
        sink,
        notify,
    }
}

#[tokio::test]
async fn initial_rebuild_mirrors_the_cluster() {
    let h = harness().await;
    let domain = h.sync.initialize().await.unwrap();
    assert_eq!(domain.name, "cluster1");
    assert_eq!(domain.automation_version, "2.1.3");
    assert_eq!(domain.state, DomainState::Online);

    let store = h.sync.store();
    let resources = store.resources().await;
    assert_eq!(resources.len(), 5);

    for node in ["n1", "n2"] {
        let rsc = store.find_resource_by_identity(node).await.unwrap();
        assert_eq!(rsc.resource_type(), ResourceType::Node);
        assert_eq!(rsc.observed, ActivationState::Online);
        assert_eq!(rsc.desired, ActivationState::Online);
        assert!(rsc.included);
        assert!(rsc.top_level);
    }

    // rA runs on n1: placed there by the location constraint.
    let ra = store.find_resource_by_identity("rA").await.unwrap();
    assert_eq!(ra.node, "n1");
    assert_eq!(ra.observed, ActivationState::Online);
    assert_eq!(ra.desired, ActivationState::Online);
    assert_eq!(ra.operational, OperationalState::Ok);
    assert_eq!(ra.compound, CompoundState::Ok);
    assert!(!ra.top_level, "group members are not top-level");

    let rb = store.find_resource_by_identity("rB").await.unwrap();
    assert_eq!(rb.observed, ActivationState::Offline);
    assert_eq!(rb.desired, ActivationState::Offline);
    assert_eq!(rb.compound, CompoundState::Ok);

    // g1 aggregates its single running member.
    let g1 = store.find_resource_by_identity("g1").await.unwrap();
    assert_eq!(g1.resource_type(), ResourceType::ResourceGroup);
    assert_eq!(g1.observed, ActivationState::Online);
    assert_eq!(g1.desired, ActivationState::Online);
    assert_eq!(g1.node, "n1");

    let relations = store.relations().await;
    assert_eq!(relations.len(), 2);
    let has_member = relations
        .iter()
        .find(|r| r.kind == RelationKind::HasMember)
        .unwrap();
    assert_eq!(has_member.source.name, "g1");
    assert_eq!(has_member.target.name, "rA");
    let hosted_by = relations
        .iter()
        .find(|r| r.kind == RelationKind::HostedBy)
        .unwrap();
    assert_eq!(hosted_by.source.name, "rA");
    assert_eq!(hosted_by.target.name, "n1");
    assert_eq!(hosted_by.target.node, "n1");
}

#[tokio::test]
async fn rebuild_from_unchanged_cluster_is_diff_empty() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();

    h.sync.handle_change().await.unwrap();
    assert!(h.sink.take_events().await.is_empty());
}

#[tokio::test]
async fn resource_events_precede_relation_events() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();

    // One resource change and one new relation in the same cycle.
    h.query.set_native_status("rA", "stopped", "started").await;
    h.query.add_colocation("col1", "rB", "g1", "INFINITY").await;
    h.sync.handle_change().await.unwrap();

    let events = h.sink.take_events().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, TopologyEvent::Resource { .. })));
    let first_relation = events
        .iter()
        .position(|e| matches!(e, TopologyEvent::Relation { .. }))
        .unwrap();
    assert!(events[first_relation..]
        .iter()
        .all(|e| matches!(e, TopologyEvent::Relation { .. })));
}

#[tokio::test]
async fn cluster_changes_surface_as_add_and_delete_events() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();

    h.query.add_native("rC", "running", "started").await;
    h.sync.handle_change().await.unwrap();

    let events = h.sink.take_events().await;
    let added: Vec<_> = events
        .iter()
        .filter(|e| e.reason() == EventReason::Added)
        .collect();
    assert_eq!(added.len(), 1);
    match added[0] {
        TopologyEvent::Resource { resource, .. } => assert_eq!(resource.name, "rC"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(events.iter().all(|e| e.reason() != EventReason::Deleted));
}

#[tokio::test]
async fn enumeration_and_filters_read_the_snapshot() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();
    let adapter = TopologyAdapter::new(
        h.sync.store().clone(),
        Arc::new(MockControlChannel::new()),
    );

    let top = adapter.enumerate_by_filter(&[Criterion::TopLevel]).await;
    let names: Vec<_> = top.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["n1", "n2", "rB", "g1"]);

    let natives = adapter
        .enumerate_by_filter(&[
            Criterion::resource(ResourceField::Type, FilterOp::Equal, &["RESOURCE"]),
            Criterion::resource(ResourceField::Name, FilterOp::Equal, &["r*"]),
        ])
        .await;
    assert_eq!(natives.len(), 2);

    let g1_key = ResourceKey::new("cluster1", "n1", "g1", "collection");
    let members = adapter.enumerate_group_members(&g1_key).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "rA");

    let hosted = adapter
        .enumerate_relations(&[Criterion::relation(
            RelationField::Name,
            FilterOp::Equal,
            &["HOSTED_BY"],
        )])
        .await;
    assert_eq!(hosted.len(), 1);
    assert_eq!(hosted[0].target.name, "n1");
}

#[tokio::test]
async fn group_request_reaches_members_and_next_rebuild_reports_it() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();
    let control = Arc::new(MockControlChannel::new());
    let adapter = TopologyAdapter::new(h.sync.store().clone(), control.clone());

    let g1_key = ResourceKey::new("cluster1", "n1", "g1", "collection");
    adapter.request(&g1_key, RequestKind::Offline).await.unwrap();
    assert_eq!(
        control.take_commands().await,
        vec![
            ControlCommand::TargetRole {
                resource: "rA".into(),
                online: false,
            },
            ControlCommand::TargetRole {
                resource: "g1".into(),
                online: false,
            },
        ]
    );

    // The store is untouched until the engine reports the effect.
    let g1 = h.sync.store().find_resource_by_identity("g1").await.unwrap();
    assert_eq!(g1.desired, ActivationState::Online);

    h.query.set_native_status("rA", "stopped", "stopped").await;
    h.sync.handle_change().await.unwrap();

    let g1 = h.sync.store().find_resource_by_identity("g1").await.unwrap();
    assert_eq!(g1.observed, ActivationState::Offline);
    assert_eq!(g1.desired, ActivationState::Offline);
}

#[tokio::test]
async fn readers_never_observe_a_partial_snapshot() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();
    h.query.set_delay(Duration::from_millis(50)).await;

    let store = h.sync.store().clone();
    let reader = tokio::spawn(async move {
        for _ in 0..20 {
            let (domain, resources, relations) = store.snapshot().await;
            assert_eq!(domain.name, "cluster1");
            assert_eq!(resources.len(), 5);
            assert_eq!(relations.len(), 2);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    h.sync.handle_change().await.unwrap();
    reader.await.unwrap();
}

#[tokio::test]
async fn background_loop_rebuilds_on_notification_and_stops_on_shutdown() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = h.sync.spawn(shutdown_rx);

    h.query.add_native("rC", "running", "started").await;
    h.notify.notify("cib-changed").await.unwrap();

    // Wait for the cycle to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if h.sync
            .store()
            .find_resource_by_identity("rC")
            .await
            .is_some()
        {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "rebuild never ran");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = h.sink.take_events().await;
    assert!(events
        .iter()
        .any(|e| e.reason() == EventReason::Added));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn background_loop_survives_a_failed_cycle() {
    let h = harness().await;
    h.sync.initialize().await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = h.sync.spawn(shutdown_rx);

    h.query.set_fail(true).await;
    h.notify.notify("cib-changed").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The failed cycle kept the previous snapshot and the loop is still
    // alive to serve the next notification.
    assert_eq!(h.sync.store().resources().await.len(), 5);
    assert!(h.sink.take_events().await.is_empty());

    h.query.set_fail(false).await;
    h.query.add_native("rC", "running", "started").await;
    h.notify.notify("cib-changed").await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if h.sync
            .store()
            .find_resource_by_identity("rC")
            .await
            .is_some()
        {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "loop did not recover");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn colocation_and_order_constraints_become_relations() {
    let query = Arc::new(MockClusterQuery::new("cluster1", "2.1.3"));
    query.add_node("n1", true, false).await;
    query.add_native("rA", "running", "started").await;
    query.add_native("rB", "running", "started").await;
    query.add_colocation("col1", "rA", "rB", "INFINITY").await;
    query.add_order("ord1", "rA", "after", "rB").await;

    let (notifier, _notify) = MockNotifier::new();
    let sync = Arc::new(TopologySynchronizer::new(
        query,
        Arc::new(notifier),
        None,
        Arc::new(TopologyStore::new(empty_domain())),
        AdapterConfig::default(),
    ));
    sync.initialize().await.unwrap();

    let relations = sync.store().relations().await;
    assert_eq!(relations.len(), 2);
    let col = relations
        .iter()
        .find(|r| r.kind == RelationKind::Collocated)
        .unwrap();
    assert_eq!((col.source.name.as_str(), col.target.name.as_str()), ("rA", "rB"));
    // "rA after rB": rA starts after rB.
    let ord = relations
        .iter()
        .find(|r| r.kind == RelationKind::StartsAfter)
        .unwrap();
    assert_eq!((ord.source.name.as_str(), ord.target.name.as_str()), ("rA", "rB"));
}
