//! Prop and argument codec: the transmissible form of component props.
//!
//! Primitive values pass through (strings via the whitespace codec);
//! rendered sub-tree props recurse into the node serializer; proxy props
//! are shallow-copied to strip live bindings; function props are replaced
//! by opaque method-reference markers and registered in the caller's
//! context-local [`CallbackRegistry`].
//!
//! Two marker families exist on the wire:
//! - `__domcallbacks` — the owning caller has no ancestor component, so a
//!   later invocation responds to the host directly;
//! - `__componentcallbacks` — the owner is itself a component, and the
//!   marker carries the id a response must be routed back to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback_registry::{
    argument_callback_key, component_callback_key, dom_callback_key, CallbackRegistry,
};
use crate::component_id::ComponentId;
use crate::error::EngineError;
use crate::json_string::{decode_json_string, encode_json_string};
use crate::node::{CallbackProp, CallbackRef, PropValue, Props};
use crate::serializer::Serializer;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Serialized stand-in for a function value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    /// Registered method key inside the owning context.
    #[serde(rename = "__componentMethod")]
    pub component_method: String,
    /// Routing destination for the eventual response; absent for
    /// host-directed callbacks.
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<String>,
}

/// Transmissible form of a prop map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedProps {
    /// Plain value props, flattened into the containing object.
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
    /// Host-directed callback markers.
    #[serde(
        rename = "__domcallbacks",
        skip_serializing_if = "BTreeMap::is_empty",
        default
    )]
    pub dom_callbacks: BTreeMap<String, MethodRef>,
    /// Component-directed callback markers.
    #[serde(
        rename = "__componentcallbacks",
        skip_serializing_if = "BTreeMap::is_empty",
        default
    )]
    pub component_callbacks: BTreeMap<String, MethodRef>,
}

impl SerializedProps {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.dom_callbacks.is_empty() && self.component_callbacks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Serialization (sending side)
// ---------------------------------------------------------------------------

/// Convert a live prop map into its transmissible form, registering every
/// function prop in the serializing container's registry.
///
/// Classification of function props follows the serializing owner: a root
/// owner produces `__domcallbacks` entries keyed by
/// `method::body::ownerId`; a nested owner produces
/// `__componentcallbacks` entries keyed by `method::ownerId`, with the
/// marker carrying the owner id for response routing.
pub fn serialize_props(
    ser: &mut Serializer<'_>,
    props: &Props,
) -> Result<SerializedProps, EngineError> {
    let mut out = SerializedProps::default();

    for (key, value) in props {
        match value {
            PropValue::Value(Value::String(text)) => {
                out.values
                    .insert(key.clone(), Value::String(encode_json_string(text)));
            }
            PropValue::Value(plain) => {
                out.values.insert(key.clone(), plain.clone());
            }
            PropValue::Node(node) => {
                let serialized = ser.serialize_prop_node(node)?;
                out.values.insert(key.clone(), serde_json::to_value(serialized)?);
            }
            PropValue::Proxy(fields) => {
                let copy: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.clone()))
                    .collect();
                out.values.insert(key.clone(), Value::Object(copy));
            }
            PropValue::Callback(callback) => {
                let owner = ser.owner_id().clone();
                if ser.owner_parent_id().is_none() {
                    let fn_key = dom_callback_key(key, callback.body(), &owner);
                    ser.registry_mut().register(fn_key.clone(), callback.handle());
                    out.dom_callbacks.insert(
                        key.clone(),
                        MethodRef {
                            component_method: fn_key,
                            parent_id: None,
                        },
                    );
                } else {
                    let fn_key = component_callback_key(key, &owner);
                    ser.registry_mut().register(fn_key.clone(), callback.handle());
                    out.component_callbacks.insert(
                        key.clone(),
                        MethodRef {
                            component_method: fn_key,
                            parent_id: Some(owner.as_str().to_string()),
                        },
                    );
                }
            }
            PropValue::CallbackRef(reference) => {
                // Forwarding an already-proxied callback: keep its key and
                // routing target so invocations reach the original owner.
                out.component_callbacks.insert(
                    key.clone(),
                    MethodRef {
                        component_method: reference.fn_key.clone(),
                        parent_id: reference.target.as_ref().map(|t| t.as_str().to_string()),
                    },
                );
            }
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Deserialization (receiving side)
// ---------------------------------------------------------------------------

/// Rebuild a live prop map inside a receiving container.
///
/// Only the `__componentcallbacks` family is rebuilt here; the
/// `__domcallbacks` family is resolved by the local DOM-event layer.
/// A prop name present both as a plain value and as a component callback
/// is a naming conflict in the component's own declaration and fails
/// fast.
pub fn deserialize_props(
    serialized: &SerializedProps,
    component_id: &ComponentId,
) -> Result<Props, EngineError> {
    let mut props = Props::new();

    for (key, value) in &serialized.values {
        let restored = match value {
            Value::String(text) => Value::String(decode_json_string(text)),
            other => other.clone(),
        };
        props.insert(key.clone(), PropValue::Value(restored));
    }

    for (key, marker) in &serialized.component_callbacks {
        if serialized.values.contains_key(key) {
            return Err(EngineError::DuplicatePropKey {
                key: key.clone(),
                component_id: component_id.as_str().to_string(),
            });
        }
        props.insert(
            key.clone(),
            PropValue::CallbackRef(CallbackRef {
                method: key.clone(),
                fn_key: marker.component_method.clone(),
                target: marker.parent_id.as_deref().map(ComponentId::from_raw),
                originator: component_id.clone(),
            }),
        );
    }

    Ok(props)
}

// ---------------------------------------------------------------------------
// Argument serialization
// ---------------------------------------------------------------------------

/// One argument of a cross-context callback invocation on the sending
/// side. Lists and records recurse; function leaves are registered and
/// replaced by method-reference markers keyed by `body::componentId`.
#[derive(Clone)]
pub enum ArgValue {
    Value(Value),
    List(Vec<ArgValue>),
    Record(BTreeMap<String, ArgValue>),
    Callback(CallbackProp),
}

impl ArgValue {
    pub fn json(value: Value) -> Self {
        Self::Value(value)
    }
}

impl std::fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            Self::Callback(cb) => f.debug_tuple("Callback").field(cb).finish(),
        }
    }
}

/// Serialize a call's argument list for transport.
pub fn serialize_args(
    args: &[ArgValue],
    component_id: &ComponentId,
    registry: &mut CallbackRegistry,
) -> Vec<Value> {
    args.iter()
        .map(|arg| serialize_arg(arg, component_id, registry))
        .collect()
}

fn serialize_arg(arg: &ArgValue, component_id: &ComponentId, registry: &mut CallbackRegistry) -> Value {
    match arg {
        ArgValue::Value(value) => value.clone(),
        ArgValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| serialize_arg(item, component_id, registry))
                .collect(),
        ),
        ArgValue::Record(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), serialize_arg(field, component_id, registry)))
                .collect(),
        ),
        ArgValue::Callback(callback) => {
            let fn_key = argument_callback_key(callback.body(), component_id);
            registry.register(fn_key.clone(), callback.handle());
            let marker = MethodRef {
                component_method: fn_key,
                parent_id: None,
            };
            serde_json::to_value(marker).unwrap_or(Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticLog;
    use crate::node::{ComponentMarker, MarkerKind, Trust, VNode};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn component() -> ComponentId {
        ComponentId::from_raw("a/widget##x##null")
    }

    struct Pass {
        registry: CallbackRegistry,
        warned: BTreeSet<ComponentId>,
        diagnostics: DiagnosticLog,
    }

    impl Pass {
        fn new() -> Self {
            Self {
                registry: CallbackRegistry::new(),
                warned: BTreeSet::new(),
                diagnostics: DiagnosticLog::new(),
            }
        }

        fn serializer(&mut self, owner: &str) -> Serializer<'_> {
            Serializer::new(
                ComponentId::from_raw(owner),
                None,
                &mut self.registry,
                &mut self.warned,
                &mut self.diagnostics,
            )
        }
    }

    // -- Wire shapes --

    #[test]
    fn method_ref_wire_field_names() {
        let with_parent = MethodRef {
            component_method: "onClick::owner".to_string(),
            parent_id: Some("owner".to_string()),
        };
        let json = serde_json::to_value(&with_parent).expect("serialize");
        assert_eq!(
            json,
            json!({ "__componentMethod": "onClick::owner", "parentId": "owner" })
        );

        let without_parent = MethodRef {
            component_method: "k".to_string(),
            parent_id: None,
        };
        let json = serde_json::to_value(&without_parent).expect("serialize");
        assert_eq!(json, json!({ "__componentMethod": "k" }));
    }

    #[test]
    fn serialized_props_flatten_values_and_nest_callbacks() {
        let mut props = SerializedProps::default();
        props.values.insert("title".to_string(), json!("hello"));
        props.dom_callbacks.insert(
            "onClick".to_string(),
            MethodRef {
                component_method: "onClick::body::owner".to_string(),
                parent_id: None,
            },
        );

        let json = serde_json::to_value(&props).expect("serialize");
        assert_eq!(json["title"], json!("hello"));
        assert_eq!(
            json["__domcallbacks"]["onClick"]["__componentMethod"],
            json!("onClick::body::owner")
        );
        assert!(json.get("__componentcallbacks").is_none());

        let restored: SerializedProps = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, props);
    }

    #[test]
    fn empty_props_report_empty() {
        assert!(SerializedProps::default().is_empty());
    }

    // -- Serialization --

    #[test]
    fn node_props_recurse_and_collect_nested_components() {
        let mut pass = Pass::new();
        let mut ser = pass.serializer("root##null##null");

        let sub_tree = VNode::element(
            "h1",
            Props::new(),
            vec![VNode::component(ComponentMarker {
                source: "s/nested".to_string(),
                instance_id: Some("n".to_string()),
                props: Props::new(),
                trust: Trust::default(),
                marker: MarkerKind::Current,
            })],
        );
        let mut props = Props::new();
        props.insert("header".to_string(), PropValue::Node(Box::new(sub_tree)));

        let out = serialize_props(&mut ser, &props).expect("props");
        let children = ser.finish();

        // The sub-tree serialized into the prop value, marker replaced by
        // a placeholder mount element.
        let header = &out.values["header"];
        assert_eq!(header["type"], json!("h1"));
        assert_eq!(header["children"][0]["type"], json!("div"));
        assert_eq!(
            header["children"][0]["props"]["id"],
            json!("s/nested##n##root##null##null")
        );

        // The nested component reached the pass accumulator.
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].source, "s/nested");
        assert_eq!(
            children[0].component_id,
            ComponentId::from_raw("s/nested##n##root##null##null")
        );
    }

    #[test]
    fn proxy_props_shallow_copy_to_plain_objects() {
        let mut pass = Pass::new();
        let mut ser = pass.serializer("root##null##null");

        let mut fields = BTreeMap::new();
        fields.insert("accountId".to_string(), json!("alice.near"));
        fields.insert("balance".to_string(), json!(125));
        let mut props = Props::new();
        props.insert("profile".to_string(), PropValue::Proxy(fields));

        let out = serialize_props(&mut ser, &props).expect("props");

        assert_eq!(
            out.values["profile"],
            json!({ "accountId": "alice.near", "balance": 125 })
        );
        assert!(out.dom_callbacks.is_empty());
        assert!(out.component_callbacks.is_empty());
        assert!(ser.finish().is_empty());
    }

    // -- Deserialization --

    #[test]
    fn plain_values_pass_through_with_string_decoding() {
        let mut serialized = SerializedProps::default();
        serialized
            .values
            .insert("text".to_string(), Value::String(encode_json_string("a\nb")));
        serialized.values.insert("count".to_string(), json!(3));

        let props = deserialize_props(&serialized, &component()).expect("props");
        assert_eq!(props["text"].as_value(), Some(&json!("a\nb")));
        assert_eq!(props["count"].as_value(), Some(&json!(3)));
    }

    #[test]
    fn component_callbacks_become_callback_refs() {
        let mut serialized = SerializedProps::default();
        serialized.component_callbacks.insert(
            "onSelect".to_string(),
            MethodRef {
                component_method: "onSelect::owner-id".to_string(),
                parent_id: Some("owner-id".to_string()),
            },
        );

        let props = deserialize_props(&serialized, &component()).expect("props");
        let reference = props["onSelect"].as_callback_ref().expect("callback ref");
        assert_eq!(reference.method, "onSelect");
        assert_eq!(reference.fn_key, "onSelect::owner-id");
        assert_eq!(
            reference.target,
            Some(ComponentId::from_raw("owner-id"))
        );
        assert_eq!(reference.originator, component());
    }

    #[test]
    fn dom_callbacks_are_not_rebuilt() {
        let mut serialized = SerializedProps::default();
        serialized.dom_callbacks.insert(
            "onClick".to_string(),
            MethodRef {
                component_method: "onClick::body::root".to_string(),
                parent_id: None,
            },
        );

        let props = deserialize_props(&serialized, &component()).expect("props");
        assert!(props.is_empty());
    }

    #[test]
    fn duplicate_value_and_callback_key_fails_fast() {
        let mut serialized = SerializedProps::default();
        serialized.values.insert("onClick".to_string(), json!("a value"));
        serialized.component_callbacks.insert(
            "onClick".to_string(),
            MethodRef {
                component_method: "onClick::owner".to_string(),
                parent_id: Some("owner".to_string()),
            },
        );

        let err = deserialize_props(&serialized, &component()).unwrap_err();
        match err {
            EngineError::DuplicatePropKey { key, component_id } => {
                assert_eq!(key, "onClick");
                assert_eq!(component_id, "a/widget##x##null");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // -- Argument serialization --

    #[test]
    fn plain_args_pass_through() {
        let mut registry = CallbackRegistry::new();
        let args = serialize_args(
            &[ArgValue::json(json!(1)), ArgValue::json(json!("two"))],
            &component(),
            &mut registry,
        );
        assert_eq!(args, vec![json!(1), json!("two")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn function_leaves_register_and_become_markers() {
        let mut registry = CallbackRegistry::new();
        let callback = CallbackProp::new("(v) => v", |args| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        });

        let args = serialize_args(&[ArgValue::Callback(callback)], &component(), &mut registry);

        let expected_key = "(v) => v::a/widget##x##null";
        assert_eq!(args, vec![json!({ "__componentMethod": expected_key })]);
        assert!(registry.contains(expected_key));
    }

    #[test]
    fn lists_and_records_recurse() {
        let mut registry = CallbackRegistry::new();
        let mut record = BTreeMap::new();
        record.insert(
            "handler".to_string(),
            ArgValue::Callback(CallbackProp::new("() => {}", |_| Ok(Value::Null))),
        );
        record.insert("label".to_string(), ArgValue::json(json!("ok")));

        let args = serialize_args(
            &[ArgValue::List(vec![
                ArgValue::json(json!(0)),
                ArgValue::Record(record),
            ])],
            &component(),
            &mut registry,
        );

        assert_eq!(args.len(), 1);
        let list = args[0].as_array().expect("array");
        assert_eq!(list[0], json!(0));
        assert_eq!(list[1]["label"], json!("ok"));
        assert_eq!(
            list[1]["handler"]["__componentMethod"],
            json!("() => {}::a/widget##x##null")
        );
        assert_eq!(registry.len(), 1);
    }
}
