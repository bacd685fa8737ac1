//! Depth-first node serialization.
//!
//! Walks a live component tree into a host-element-only wire tree while
//! extracting every nested component marker into a flat side list. Nested
//! components are never recursed into: each becomes its own sandboxed
//! context, so the walk replaces the marker with a placeholder mount
//! element carrying the child's component id. Pass-through wrapper
//! functions are invoked in place and their result flattened into the
//! current position.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback_registry::CallbackRegistry;
use crate::component_id::{build_component_id, ComponentId};
use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::error::EngineError;
use crate::node::{ComponentMarker, MarkerKind, NodeKind, PropValue, Props, Trust, VNode};
use crate::prop_codec::{serialize_props, SerializedProps};

/// Element tag used for placeholder mount points and generic containers.
pub const GENERIC_CONTAINER: &str = "div";

/// Prop key carrying the component id on a placeholder mount element.
pub const MOUNT_ID_PROP: &str = "id";

// ---------------------------------------------------------------------------
// Wire tree
// ---------------------------------------------------------------------------

/// A serialized host element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub props: SerializedProps,
    pub children: Vec<SerializedChild>,
}

/// A serialized child position: either a nested host element or a
/// primitive leaf carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedChild {
    Node(SerializedNode),
    Leaf(Value),
}

impl SerializedChild {
    pub fn as_node(&self) -> Option<&SerializedNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Leaf(_) => None,
        }
    }
}

/// One nested component discovered during serialization. Collected flat
/// regardless of nesting depth: each entry becomes an independent
/// sandboxed context, not a nested node in the host tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildComponentMetadata {
    pub component_id: ComponentId,
    pub source: String,
    pub trust: Trust,
    pub props: SerializedProps,
}

// ---------------------------------------------------------------------------
// Serializer — one render pass
// ---------------------------------------------------------------------------

/// State for one serialization pass over one container's rendered tree.
#[derive(Debug)]
pub struct Serializer<'a> {
    owner_id: ComponentId,
    owner_parent_id: Option<ComponentId>,
    registry: &'a mut CallbackRegistry,
    warned_legacy: &'a mut BTreeSet<ComponentId>,
    diagnostics: &'a mut DiagnosticLog,
    children: Vec<ChildComponentMetadata>,
    passthrough_seq: u32,
}

impl<'a> Serializer<'a> {
    pub fn new(
        owner_id: ComponentId,
        owner_parent_id: Option<ComponentId>,
        registry: &'a mut CallbackRegistry,
        warned_legacy: &'a mut BTreeSet<ComponentId>,
        diagnostics: &'a mut DiagnosticLog,
    ) -> Self {
        Self {
            owner_id,
            owner_parent_id,
            registry,
            warned_legacy,
            diagnostics,
            children: Vec::new(),
            passthrough_seq: 0,
        }
    }

    pub fn owner_id(&self) -> &ComponentId {
        &self.owner_id
    }

    pub fn owner_parent_id(&self) -> Option<&ComponentId> {
        self.owner_parent_id.as_ref()
    }

    pub(crate) fn registry_mut(&mut self) -> &mut CallbackRegistry {
        self.registry
    }

    /// Serialize a full rendered tree, with nested components parented to
    /// the serializing owner.
    pub fn serialize_tree(&mut self, node: &VNode) -> Result<SerializedChild, EngineError> {
        let owner = self.owner_id.clone();
        self.serialize_node(node, &owner)
    }

    /// Serialize a sub-tree passed as a prop value.
    pub(crate) fn serialize_prop_node(&mut self, node: &VNode) -> Result<SerializedChild, EngineError> {
        self.serialize_tree(node)
    }

    /// Consume the pass, yielding the flat child-component list.
    pub fn finish(self) -> Vec<ChildComponentMetadata> {
        self.children
    }

    /// Serialize one node. `parent_id` is the parent in the component
    /// chain for any nested component discovered at this position.
    pub fn serialize_node(
        &mut self,
        node: &VNode,
        parent_id: &ComponentId,
    ) -> Result<SerializedChild, EngineError> {
        match node {
            VNode::Leaf(value) => Ok(SerializedChild::Leaf(value.clone())),
            VNode::Node {
                kind,
                props,
                children,
            } => match kind {
                NodeKind::Element(tag) => self.serialize_element(tag, props, children, parent_id),
                NodeKind::Untyped => {
                    self.serialize_element(GENERIC_CONTAINER, props, children, parent_id)
                }
                NodeKind::Builtin(construct) => {
                    let (rewritten_kind, rewritten_props) = construct.rewrite(props.clone());
                    let rewritten = VNode::Node {
                        kind: rewritten_kind,
                        props: rewritten_props,
                        children: children.clone(),
                    };
                    self.serialize_node(&rewritten, parent_id)
                }
                NodeKind::Component(marker) => Ok(self.serialize_component(marker, parent_id)),
                NodeKind::Passthrough(func) => {
                    self.passthrough_seq += 1;
                    let mut inner_props = props.clone();
                    inner_props
                        .entry(MOUNT_ID_PROP.to_string())
                        .or_insert_with(|| {
                            PropValue::string(format!(
                                "{parent_id}-fn-{}",
                                self.passthrough_seq
                            ))
                        });
                    let produced = func(&inner_props);
                    self.serialize_node(&produced, parent_id)
                }
            },
        }
    }

    fn serialize_element(
        &mut self,
        tag: &str,
        props: &Props,
        children: &[VNode],
        parent_id: &ComponentId,
    ) -> Result<SerializedChild, EngineError> {
        let serialized_props = serialize_props(self, props)?;
        let mut serialized_children = Vec::with_capacity(children.len());
        for child in children {
            serialized_children.push(self.serialize_node(child, parent_id)?);
        }
        Ok(SerializedChild::Node(SerializedNode {
            node_type: tag.to_string(),
            props: serialized_props,
            children: serialized_children,
        }))
    }

    /// A nested component does not recurse: establish its metadata and
    /// return a placeholder mount element. Any failure while doing so is
    /// reported and that one component omitted; sibling subtrees are
    /// unaffected.
    fn serialize_component(
        &mut self,
        marker: &ComponentMarker,
        parent_id: &ComponentId,
    ) -> SerializedChild {
        let child_id = match build_component_id(
            &marker.source,
            marker.instance_id.as_deref(),
            Some(parent_id),
            self.diagnostics,
        ) {
            Ok(id) => id,
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticCode::ChildSerializationFailed,
                    Some(parent_id.as_str().to_string()),
                    format!("component '{}' omitted: {err}", marker.source),
                );
                return placeholder(None);
            }
        };

        if marker.marker == MarkerKind::LegacyAlias && self.warned_legacy.insert(child_id.clone())
        {
            self.diagnostics.warning(
                DiagnosticCode::LegacyComponentMarker,
                Some(child_id.as_str().to_string()),
                "deprecated component marker form; migrate to the current marker",
            );
        }

        match serialize_props(self, &marker.props) {
            Ok(serialized_props) => {
                self.children.push(ChildComponentMetadata {
                    component_id: child_id.clone(),
                    source: marker.source.clone(),
                    trust: marker.trust.clone(),
                    props: serialized_props,
                });
            }
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticCode::ChildSerializationFailed,
                    Some(child_id.as_str().to_string()),
                    format!("prop serialization failed, component omitted: {err}"),
                );
            }
        }

        placeholder(Some(&child_id))
    }
}

/// Placeholder mount element for a nested component.
fn placeholder(component_id: Option<&ComponentId>) -> SerializedChild {
    let mut props = SerializedProps::default();
    if let Some(id) = component_id {
        props
            .values
            .insert(MOUNT_ID_PROP.to_string(), Value::String(id.as_str().to_string()));
    }
    SerializedChild::Node(SerializedNode {
        node_type: GENERIC_CONTAINER.to_string(),
        props,
        children: Vec::new(),
    })
}
