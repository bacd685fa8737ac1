#![forbid(unsafe_code)]

//! Outer-host orchestration for sandboxed component containers.
//!
//! The host sits between the rendering surface and the container
//! protocol: it consumes render envelopes, commits host trees to a
//! pluggable [`RenderSink`], tracks which child contexts exist, requests
//! missing component sources through a [`SourceLoader`] (consulting the
//! local compile cache first), and forwards refreshed props to children
//! that are already live.

use std::collections::BTreeMap;

use thiserror::Error;

use portal_engine::compile_cache::{ArtifactStore, CompileCache};
use portal_engine::component_id::ComponentId;
use portal_engine::diagnostics::{DiagnosticCode, DiagnosticLog};
use portal_engine::envelope::Envelope;
use portal_engine::node::Trust;
use portal_engine::serializer::{ChildComponentMetadata, SerializedChild};
use portal_engine::transport::Transport;

// ---------------------------------------------------------------------------
// Host-side seams
// ---------------------------------------------------------------------------

/// Failure to commit a rendered tree to the surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("no mount point for component '{0}'")]
    MissingMountPoint(String),
}

/// Rendering surface the host commits serialized trees into.
pub trait RenderSink {
    fn commit(&mut self, component_id: &ComponentId, node: &SerializedChild)
        -> Result<(), MountError>;
}

/// Fire-and-forget source acquisition for components the host has never
/// instantiated. Completion arrives out of band (a later render).
pub trait SourceLoader {
    fn request_source(&mut self, path: &str, trust: &Trust);
}

// ---------------------------------------------------------------------------
// HostRouter
// ---------------------------------------------------------------------------

/// What the router did with one processed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The tree was committed; counts of children newly requested and
    /// children refreshed in place.
    Committed { requested: usize, refreshed: usize },
    /// The render had no mount point and was dropped.
    Unmounted,
    /// Not a host-directed envelope; ignored.
    Ignored,
}

/// One child context the host has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChildRecord {
    source: String,
    trust: Trust,
}

/// Routes render envelopes between containers and the host surface.
pub struct HostRouter<K, L, S, T> {
    sink: K,
    loader: L,
    cache: CompileCache<S>,
    transport: T,
    children: BTreeMap<ComponentId, ChildRecord>,
    diagnostics: DiagnosticLog,
}

impl<K, L, S, T> HostRouter<K, L, S, T>
where
    K: RenderSink,
    L: SourceLoader,
    S: ArtifactStore,
    T: Transport,
{
    pub fn new(sink: K, loader: L, cache: CompileCache<S>, transport: T) -> Self {
        Self {
            sink,
            loader,
            cache,
            transport,
            children: BTreeMap::new(),
            diagnostics: DiagnosticLog::new(),
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn knows_child(&self, id: &ComponentId) -> bool {
        self.children.contains_key(id)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Process one envelope addressed to the host. Only render envelopes
    /// have host semantics; anything else is ignored so a misrouted
    /// message cannot disturb the surface.
    pub fn route(&mut self, envelope: Envelope) -> RouteOutcome {
        match envelope {
            Envelope::Render {
                component_id,
                node,
                child_components,
                ..
            } => self.handle_render(component_id, node, child_components),
            _ => RouteOutcome::Ignored,
        }
    }

    fn handle_render(
        &mut self,
        component_id: ComponentId,
        node: SerializedChild,
        child_components: Vec<ChildComponentMetadata>,
    ) -> RouteOutcome {
        if let Err(err) = self.sink.commit(&component_id, &node) {
            self.diagnostics.error(
                DiagnosticCode::MissingMountPoint,
                Some(component_id.as_str().to_string()),
                format!("render dropped: {err}"),
            );
            return RouteOutcome::Unmounted;
        }

        let mut requested = 0;
        let mut refreshed = 0;
        for child in child_components {
            if self.children.contains_key(&child.component_id) {
                // Already live: forward the freshly serialized props.
                self.transport.send(
                    child.component_id.as_str(),
                    Envelope::Update {
                        component_id: child.component_id.clone(),
                        props: child.props,
                    },
                );
                refreshed += 1;
            } else {
                self.instantiate(&child);
                requested += 1;
            }
        }
        RouteOutcome::Committed {
            requested,
            refreshed,
        }
    }

    /// Record a new child context and acquire its source: a compile-cache
    /// hit makes the loader round-trip unnecessary.
    fn instantiate(&mut self, child: &ChildComponentMetadata) {
        self.children.insert(
            child.component_id.clone(),
            ChildRecord {
                source: child.source.clone(),
                trust: child.trust.clone(),
            },
        );
        if self
            .cache
            .lookup(&child.source, &mut self.diagnostics)
            .is_none()
        {
            self.loader.request_source(&child.source, &child.trust);
        }
        // Initial props travel with the instantiation rather than as a
        // separate update.
        self.transport.send(
            child.component_id.as_str(),
            Envelope::Update {
                component_id: child.component_id.clone(),
                props: child.props.clone(),
            },
        );
    }

    /// Forget a child context (its container was torn down).
    pub fn remove_child(&mut self, id: &ComponentId) -> bool {
        self.children.remove(id).is_some()
    }

    /// Source path a live child was instantiated from.
    pub fn child_source(&self, id: &ComponentId) -> Option<&str> {
        self.children.get(id).map(|record| record.source.as_str())
    }

    /// Trust tag a live child was instantiated with.
    pub fn child_trust(&self, id: &ComponentId) -> Option<&Trust> {
        self.children.get(id).map(|record| &record.trust)
    }
}

// ---------------------------------------------------------------------------
// In-memory seam implementations
// ---------------------------------------------------------------------------

/// Sink that stores the last committed tree per component.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderSink {
    committed: BTreeMap<ComponentId, SerializedChild>,
    missing: Vec<ComponentId>,
}

impl MemoryRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark components whose mount point is absent; commits for them fail.
    pub fn without_mount(mut self, id: ComponentId) -> Self {
        self.missing.push(id);
        self
    }

    pub fn committed(&self, id: &ComponentId) -> Option<&SerializedChild> {
        self.committed.get(id)
    }

    pub fn commit_count(&self) -> usize {
        self.committed.len()
    }
}

impl RenderSink for MemoryRenderSink {
    fn commit(
        &mut self,
        component_id: &ComponentId,
        node: &SerializedChild,
    ) -> Result<(), MountError> {
        if self.missing.contains(component_id) {
            return Err(MountError::MissingMountPoint(
                component_id.as_str().to_string(),
            ));
        }
        self.committed.insert(component_id.clone(), node.clone());
        Ok(())
    }
}

/// Loader that records every source request.
#[derive(Debug, Clone, Default)]
pub struct RecordingSourceLoader {
    requests: Vec<(String, Trust)>,
}

impl RecordingSourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[(String, Trust)] {
        &self.requests
    }
}

impl SourceLoader for RecordingSourceLoader {
    fn request_source(&mut self, path: &str, trust: &Trust) {
        self.requests.push((path.to_string(), trust.clone()));
    }
}
