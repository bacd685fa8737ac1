//! Typed message envelopes exchanged between contexts.
//!
//! Every envelope carries enough information to be processed statelessly
//! by the receiver; the `type` discriminant travels on the wire alongside
//! camelCase field names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component_id::ComponentId;
use crate::correlation::RequestId;
use crate::node::Trust;
use crate::prop_codec::SerializedProps;
use crate::serializer::{ChildComponentMetadata, SerializedChild};

/// One cross-context message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Child → parent/host: a rendered host tree plus the nested
    /// components to instantiate.
    #[serde(rename = "component.render")]
    Render {
        #[serde(rename = "componentId")]
        component_id: ComponentId,
        node: SerializedChild,
        #[serde(rename = "childComponents")]
        child_components: Vec<ChildComponentMetadata>,
        trust: Trust,
    },

    /// Callee-side child → parent: invoke a registered callback.
    #[serde(rename = "component.callbackInvocation")]
    CallbackInvocation {
        originator: ComponentId,
        #[serde(rename = "targetId")]
        target_id: ComponentId,
        method: String,
        #[serde(rename = "requestId")]
        request_id: RequestId,
        args: Vec<Value>,
    },

    /// Parent → child: settle a pending invocation. `result` is the
    /// stringified [`CallbackOutcome`].
    #[serde(rename = "component.callbackResponse")]
    CallbackResponse {
        #[serde(rename = "componentId")]
        component_id: ComponentId,
        #[serde(rename = "targetId")]
        target_id: ComponentId,
        #[serde(rename = "requestId")]
        request_id: RequestId,
        result: String,
    },

    /// Host → component: a local DOM event firing a registered callback.
    /// No response envelope is produced.
    #[serde(rename = "component.domCallback")]
    DomCallback { method: String, args: Vec<Value> },

    /// Parent → child: prop refresh.
    #[serde(rename = "component.update")]
    Update {
        #[serde(rename = "componentId")]
        component_id: ComponentId,
        props: SerializedProps,
    },
}

impl Envelope {
    /// The wire discriminant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Render { .. } => "component.render",
            Self::CallbackInvocation { .. } => "component.callbackInvocation",
            Self::CallbackResponse { .. } => "component.callbackResponse",
            Self::DomCallback { .. } => "component.domCallback",
            Self::Update { .. } => "component.update",
        }
    }
}

/// Result/error union carried (stringified) by a callback response.
/// Exactly one side is populated; `error` wins if both somehow appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackOutcome {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl CallbackOutcome {
    pub fn success(value: Value) -> Self {
        Self {
            result: Some(value),
            error: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(reason.into()),
        }
    }

    /// Stringify for the response envelope's `result` field.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(reason) => Err(reason),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
