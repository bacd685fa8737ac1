#![forbid(unsafe_code)]
//! End-to-end host orchestration: a live root container renders through
//! a real transport, the router commits the tree, requests sources for
//! new children, and its forwarded props land in a live child container.

use portal_engine::compile_cache::{ArtifactDescriptor, ArtifactStore, CacheRecord, CompileCache, MemoryArtifactStore};
use portal_engine::component_id::ComponentId;
use portal_engine::container::{Container, ContainerEvent};
use portal_engine::envelope::Envelope;
use portal_engine::node::{
    ComponentMarker, MarkerKind, PropValue, Props, Trust, VNode,
};
use portal_engine::transport::{SharedTransport, HOST_CONTEXT};
use portal_host::{HostRouter, MemoryRenderSink, RecordingSourceLoader, RouteOutcome};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ROOT_ID: &str = "acct.near/widget/App##null##null";

fn root_container(transport: &SharedTransport) -> Container {
    Container::new(
        ComponentId::from_raw(ROOT_ID),
        None,
        Trust::default(),
        Box::new(transport.clone()),
    )
}

fn child_marker(source: &str, instance: &str, props: Props) -> VNode {
    VNode::component(ComponentMarker {
        source: source.to_string(),
        instance_id: Some(instance.to_string()),
        props,
        trust: Trust::default(),
        marker: MarkerKind::Current,
    })
}

fn take_host_envelopes(transport: &SharedTransport) -> Vec<Envelope> {
    transport
        .take()
        .into_iter()
        .filter(|(target, _)| target == HOST_CONTEXT)
        .map(|(_, envelope)| envelope)
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn first_render_instantiates_children_and_delivers_initial_props() {
    let transport = SharedTransport::new();
    let mut app = root_container(&transport);

    let mut props = Props::new();
    props.insert("label".to_string(), PropValue::string("hello"));
    app.render(&child_marker("acct.near/widget/Item", "i", props))
        .expect("render");

    let mut router = HostRouter::new(
        MemoryRenderSink::new(),
        RecordingSourceLoader::new(),
        CompileCache::new(MemoryArtifactStore::new()),
        transport.clone(),
    );
    for envelope in take_host_envelopes(&transport) {
        assert_eq!(
            router.route(envelope),
            RouteOutcome::Committed {
                requested: 1,
                refreshed: 0
            }
        );
    }

    // The child context is recorded and its source requested.
    let child_id = ComponentId::from_raw(format!("acct.near/widget/Item##i##{ROOT_ID}"));
    assert!(router.knows_child(&child_id));
    assert_eq!(router.child_source(&child_id), Some("acct.near/widget/Item"));

    // The forwarded props reach a live child container.
    let mut child = Container::new(
        child_id.clone(),
        Some(ComponentId::from_raw(ROOT_ID)),
        Trust::default(),
        Box::new(transport.clone()),
    );
    let deliveries: Vec<ContainerEvent> = transport
        .take()
        .into_iter()
        .filter(|(target, _)| target == child_id.as_str())
        .map(|(_, envelope)| child.handle_message(envelope))
        .collect();

    assert_eq!(deliveries, vec![ContainerEvent::PropsUpdated]);
    assert_eq!(child.props()["label"].as_value(), Some(&json!("hello")));
}

#[test]
fn rerender_refreshes_live_children_in_place() {
    let transport = SharedTransport::new();
    let mut app = root_container(&transport);
    let mut router = HostRouter::new(
        MemoryRenderSink::new(),
        RecordingSourceLoader::new(),
        CompileCache::new(MemoryArtifactStore::new()),
        transport.clone(),
    );

    let render_with_label = |app: &mut Container, label: &str| {
        let mut props = Props::new();
        props.insert("label".to_string(), PropValue::string(label));
        app.render(&child_marker("acct.near/widget/Item", "i", props))
            .expect("render");
    };

    render_with_label(&mut app, "first");
    let first = take_host_envelopes(&transport)
        .into_iter()
        .map(|e| router.route(e))
        .collect::<Vec<_>>();
    transport.take();

    render_with_label(&mut app, "second");
    let second = take_host_envelopes(&transport)
        .into_iter()
        .map(|e| router.route(e))
        .collect::<Vec<_>>();

    assert_eq!(
        first,
        vec![RouteOutcome::Committed {
            requested: 1,
            refreshed: 0
        }]
    );
    assert_eq!(
        second,
        vec![RouteOutcome::Committed {
            requested: 0,
            refreshed: 1
        }]
    );
    assert_eq!(router.child_count(), 1);
}

#[test]
fn cached_sources_are_not_rerequested() {
    let transport = SharedTransport::new();
    let mut app = root_container(&transport);

    let mut store = MemoryArtifactStore::new();
    store
        .put(CacheRecord {
            key: "acct.near/widget/Item".to_string(),
            artifact: ArtifactDescriptor::new("precompiled"),
        })
        .expect("seed");

    let mut router = HostRouter::new(
        MemoryRenderSink::new(),
        RecordingSourceLoader::new(),
        CompileCache::new(store),
        transport.clone(),
    );

    app.render(&VNode::element(
        "div",
        Props::new(),
        vec![
            child_marker("acct.near/widget/Item", "cached", Props::new()),
            child_marker("acct.near/widget/Fresh", "new", Props::new()),
        ],
    ))
    .expect("render");

    for envelope in take_host_envelopes(&transport) {
        router.route(envelope);
    }

    assert_eq!(router.child_count(), 2);
    // Only the uncached component produced a loader round-trip; both are
    // known children either way.
    let requested: Vec<&str> = router
        .loader()
        .requests()
        .iter()
        .map(|(path, _)| path.as_str())
        .collect();
    assert_eq!(requested, vec!["acct.near/widget/Fresh"]);
    assert!(router.knows_child(&ComponentId::from_raw(format!(
        "acct.near/widget/Item##cached##{ROOT_ID}"
    ))));
    assert!(router.knows_child(&ComponentId::from_raw(format!(
        "acct.near/widget/Fresh##new##{ROOT_ID}"
    ))));
}

#[test]
fn non_render_traffic_passes_the_router_untouched() {
    let transport = SharedTransport::new();
    let mut router = HostRouter::new(
        MemoryRenderSink::new(),
        RecordingSourceLoader::new(),
        CompileCache::new(MemoryArtifactStore::new()),
        transport.clone(),
    );

    let outcome = router.route(Envelope::DomCallback {
        method: "onClick::b::r".to_string(),
        args: vec![json!(1)],
    });

    assert_eq!(outcome, RouteOutcome::Ignored);
    assert_eq!(router.child_count(), 0);
    assert!(transport.is_empty());
}
