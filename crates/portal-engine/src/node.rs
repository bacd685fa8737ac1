//! Live component-tree model on the sending side.
//!
//! The tree a component renders is classified once per node into an
//! explicit tagged union and dispatched by exhaustive matching:
//! - host elements (string-typed),
//! - built-in formatting constructs,
//! - nested sandboxed component markers (current plus a deprecated
//!   alias kept for compatibility),
//! - pass-through wrapper functions,
//! - primitive leaves.
//!
//! Function props are opaque capability tokens scoped to their owning
//! container; they are carried here as an invocable handle plus the
//! textual identity that participates in method-key derivation, and are
//! never serialized by value.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component_id::ComponentId;

// ---------------------------------------------------------------------------
// Trust — opaque pass-through tag
// ---------------------------------------------------------------------------

/// Opaque trust tag describing how much ambient capability a component's
/// context is granted. Carried through the protocol unmodified and never
/// interpreted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trust(String);

impl Trust {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Trust {
    fn default() -> Self {
        Self("sandboxed".to_string())
    }
}

impl fmt::Display for Trust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Callback props — invocable handle + textual identity
// ---------------------------------------------------------------------------

/// Invocable function value held by a prop.
pub type CallbackFn = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// A function-valued prop: the closure itself plus the textual identity
/// ("body") that participates in method-key derivation.
#[derive(Clone)]
pub struct CallbackProp {
    body: String,
    func: CallbackFn,
}

impl CallbackProp {
    pub fn new(
        body: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            body: body.into(),
            func: Rc::new(func),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn handle(&self) -> CallbackFn {
        Rc::clone(&self.func)
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for CallbackProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProp")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// A component-directed callback rebuilt on the receiving side from a
/// method-reference marker. Invoked through the owning
/// [`crate::container::Container`], which supplies the request map and
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRef {
    /// Prop name the callback was declared under.
    pub method: String,
    /// Registered method key inside the owning container.
    pub fn_key: String,
    /// Component id a later invocation must route its response to.
    pub target: Option<ComponentId>,
    /// Component id of the invoking side (envelope originator).
    pub originator: ComponentId,
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// One prop value in the live tree.
#[derive(Debug, Clone)]
pub enum PropValue {
    /// Plain transmissible data.
    Value(Value),
    /// A rendered sub-tree passed as a prop; recursively serialized.
    Node(Box<VNode>),
    /// Representational proxy: shallow-copied on serialization to strip
    /// live bindings.
    Proxy(BTreeMap<String, Value>),
    /// Function prop on the sending side.
    Callback(CallbackProp),
    /// Rebuilt component-directed callback on the receiving side.
    CallbackRef(CallbackRef),
}

impl PropValue {
    pub fn string(text: impl Into<String>) -> Self {
        Self::Value(Value::String(text.into()))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_callback_ref(&self) -> Option<&CallbackRef> {
        match self {
            Self::CallbackRef(r) => Some(r),
            _ => None,
        }
    }
}

/// Prop map in declaration order (deterministic iteration).
pub type Props = BTreeMap<String, PropValue>;

// ---------------------------------------------------------------------------
// Node kinds — the tagged union
// ---------------------------------------------------------------------------

/// Which marker form declared a nested component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Current,
    /// Deprecated alias; still honored, but serialization records a
    /// compatibility warning once per component instance.
    LegacyAlias,
}

/// Declaration of a nested sandboxed component inside a rendered tree.
#[derive(Debug, Clone)]
pub struct ComponentMarker {
    pub source: String,
    pub instance_id: Option<String>,
    pub props: Props,
    pub trust: Trust,
    pub marker: MarkerKind,
}

/// Built-in formatting constructs recognized by capability, not by name.
/// Each rewrites `(kind, props)` before serialization continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinConstruct {
    /// Grouping construct with no host element of its own; rewrites to a
    /// generic container.
    Fragment,
}

impl BuiltinConstruct {
    pub fn rewrite(self, props: Props) -> (NodeKind, Props) {
        match self {
            Self::Fragment => (NodeKind::Untyped, props),
        }
    }
}

/// Pass-through wrapper: invoked with its own props, its result flattened
/// into the current tree position rather than creating a component
/// boundary.
pub type PassthroughFn = Rc<dyn Fn(&Props) -> VNode>;

/// Classification of a non-leaf node, determined once and dispatched
/// exhaustively.
#[derive(Clone)]
pub enum NodeKind {
    /// Host element with a string tag.
    Element(String),
    /// Falsy type; renders as a generic container element.
    Untyped,
    /// Recognized built-in formatting construct.
    Builtin(BuiltinConstruct),
    /// Nested sandboxed component.
    Component(ComponentMarker),
    /// Any other function type.
    Passthrough(PassthroughFn),
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(tag) => f.debug_tuple("Element").field(tag).finish(),
            Self::Untyped => f.write_str("Untyped"),
            Self::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            Self::Component(marker) => f.debug_tuple("Component").field(marker).finish(),
            Self::Passthrough(_) => f.write_str("Passthrough(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// VNode — the live tree
// ---------------------------------------------------------------------------

/// A node of the live, sender-side tree.
#[derive(Debug, Clone)]
pub enum VNode {
    /// Primitive leaf (text, number, boolean); passes through
    /// serialization as-is.
    Leaf(Value),
    Node {
        kind: NodeKind,
        props: Props,
        children: Vec<VNode>,
    },
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Leaf(Value::String(text.into()))
    }

    pub fn element(tag: impl Into<String>, props: Props, children: Vec<VNode>) -> Self {
        Self::Node {
            kind: NodeKind::Element(tag.into()),
            props,
            children,
        }
    }

    pub fn untyped(children: Vec<VNode>) -> Self {
        Self::Node {
            kind: NodeKind::Untyped,
            props: Props::new(),
            children,
        }
    }

    pub fn fragment(children: Vec<VNode>) -> Self {
        Self::Node {
            kind: NodeKind::Builtin(BuiltinConstruct::Fragment),
            props: Props::new(),
            children,
        }
    }

    pub fn component(marker: ComponentMarker) -> Self {
        Self::Node {
            kind: NodeKind::Component(marker),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn passthrough(
        func: impl Fn(&Props) -> VNode + 'static,
        props: Props,
        children: Vec<VNode>,
    ) -> Self {
        Self::Node {
            kind: NodeKind::Passthrough(Rc::new(func)),
            props,
            children,
        }
    }
}
