//! Per-component execution context.
//!
//! A container owns the callback registry, request map, and diagnostic
//! log for exactly one sandboxed component. It is logically
//! single-threaded and cooperative: one incoming message is processed at
//! a time, to completion, in delivery order. Nothing in the message path
//! may panic the loop — unexpected failures become diagnostics plus,
//! where a requester is waiting, a failure response envelope.

use std::collections::BTreeSet;

use crate::callback_registry::CallbackRegistry;
use crate::component_id::ComponentId;
use crate::correlation::{CallbackFuture, RequestId, RequestMap, SettleOutcome};
use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::envelope::{CallbackOutcome, Envelope};
use crate::error::EngineError;
use crate::node::{CallbackFn, CallbackRef, Props, Trust, VNode};
use crate::prop_codec::{deserialize_props, serialize_args, ArgValue, SerializedProps};
use crate::serializer::Serializer;
use crate::transport::{Transport, HOST_CONTEXT};

/// What a processed message amounted to. Returned for observability;
/// every protocol effect has already happened by the time this is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    /// An invocation was looked up, run, and answered with exactly one
    /// response envelope.
    InvocationAnswered { request_id: RequestId },
    /// A response settled its pending request.
    ResponseSettled { request_id: RequestId },
    /// A response referenced no pending request and was dropped.
    ResponseDropped { request_id: RequestId },
    /// A prop refresh was applied.
    PropsUpdated,
    /// A local DOM callback ran to completion.
    DomCallbackFired { method: String },
    /// The message had no effect (details in the diagnostic log).
    Dropped,
}

/// Execution context for one component instance.
pub struct Container {
    id: ComponentId,
    parent_id: Option<ComponentId>,
    trust: Trust,
    callbacks: CallbackRegistry,
    requests: RequestMap,
    warned_legacy: BTreeSet<ComponentId>,
    diagnostics: DiagnosticLog,
    transport: Box<dyn Transport>,
    props: Props,
    torn_down: bool,
}

impl Container {
    pub fn new(
        id: ComponentId,
        parent_id: Option<ComponentId>,
        trust: Trust,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            id,
            parent_id,
            trust,
            callbacks: CallbackRegistry::new(),
            requests: RequestMap::new(),
            warned_legacy: BTreeSet::new(),
            diagnostics: DiagnosticLog::new(),
            transport,
            props: Props::new(),
            torn_down: false,
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&ComponentId> {
        self.parent_id.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn trust(&self) -> &Trust {
        &self.trust
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn outstanding_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Register a callback directly (used by the local DOM-event layer;
    /// render passes register prop callbacks themselves).
    pub fn register_callback(&mut self, key: impl Into<String>, func: CallbackFn) {
        self.callbacks.register(key, func);
    }

    pub fn has_callback(&self, key: &str) -> bool {
        self.callbacks.contains(key)
    }

    /// Apply the props this container was instantiated with. Fails fast
    /// on a declared value/callback naming conflict (programmer error).
    pub fn apply_initial_props(&mut self, serialized: &SerializedProps) -> Result<(), EngineError> {
        self.props = deserialize_props(serialized, &self.id)?;
        Ok(())
    }

    /// Serialize the rendered tree and send it upstream as a render
    /// envelope. The root container addresses the host context.
    pub fn render(&mut self, node: &VNode) -> Result<(), EngineError> {
        let mut serializer = Serializer::new(
            self.id.clone(),
            self.parent_id.clone(),
            &mut self.callbacks,
            &mut self.warned_legacy,
            &mut self.diagnostics,
        );
        let tree = serializer.serialize_tree(node)?;
        let child_components = serializer.finish();

        let target = self
            .parent_id
            .as_ref()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| HOST_CONTEXT.to_string());
        self.transport.send(
            &target,
            Envelope::Render {
                component_id: self.id.clone(),
                node: tree,
                child_components,
                trust: self.trust.clone(),
            },
        );
        Ok(())
    }

    /// Invoke a deserialized component-directed callback.
    ///
    /// Root containers have nowhere to route the invocation: the attempt
    /// is reported, no envelope is sent, and the returned future is
    /// already rejected. Otherwise the call allocates a fresh request id,
    /// records the pending request, sends exactly one invocation
    /// envelope, and returns the unsettled future.
    pub fn call(&mut self, reference: &CallbackRef, args: &[ArgValue]) -> CallbackFuture {
        let parent = match &self.parent_id {
            Some(parent) => parent.clone(),
            None => {
                self.diagnostics.error(
                    DiagnosticCode::RootCallbackAttempt,
                    Some(self.id.as_str().to_string()),
                    format!(
                        "root container cannot invoke parent-directed callback '{}'",
                        reference.method
                    ),
                );
                return CallbackFuture::rejected("root container has no parent to invoke");
            }
        };

        let target = reference.target.clone().unwrap_or(parent);
        let serialized_args = serialize_args(args, &self.id, &mut self.callbacks);
        let (request_id, future) = self.requests.create(&self.id);

        self.transport.send(
            target.as_str(),
            Envelope::CallbackInvocation {
                originator: self.id.clone(),
                target_id: target.clone(),
                method: reference.fn_key.clone(),
                request_id,
                args: serialized_args,
            },
        );
        future
    }

    /// Process one delivered envelope to completion.
    pub fn handle_message(&mut self, envelope: Envelope) -> ContainerEvent {
        match envelope {
            Envelope::CallbackInvocation {
                originator,
                target_id: _,
                method,
                request_id,
                args,
            } => self.handle_invocation(originator, method, request_id, args),
            Envelope::CallbackResponse {
                request_id, result, ..
            } => self.handle_response(request_id, &result),
            Envelope::Update { props, .. } => self.handle_update(&props),
            Envelope::DomCallback { method, args } => self.handle_dom_callback(&method, &args),
            Envelope::Render { .. } => {
                // Render envelopes are consumed by hosts, not containers.
                ContainerEvent::Dropped
            }
        }
    }

    fn handle_invocation(
        &mut self,
        originator: ComponentId,
        method: String,
        request_id: RequestId,
        args: Vec<serde_json::Value>,
    ) -> ContainerEvent {
        let outcome = match self.callbacks.get(&method) {
            None => {
                self.diagnostics.error(
                    DiagnosticCode::UnknownMethod,
                    Some(self.id.as_str().to_string()),
                    format!("invocation of unknown method reference '{method}'"),
                );
                CallbackOutcome::failure(format!("unknown method reference '{method}'"))
            }
            Some(func) => match func(&args) {
                Ok(value) => CallbackOutcome::success(value),
                Err(reason) => CallbackOutcome::failure(reason),
            },
        };

        let result = self.encode_outcome(&outcome);
        self.transport.send(
            originator.as_str(),
            Envelope::CallbackResponse {
                component_id: self.id.clone(),
                target_id: originator.clone(),
                request_id: request_id.clone(),
                result,
            },
        );
        ContainerEvent::InvocationAnswered { request_id }
    }

    fn handle_response(&mut self, request_id: RequestId, result: &str) -> ContainerEvent {
        let outcome = match CallbackOutcome::decode(result) {
            Ok(outcome) => outcome.into_result(),
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticCode::MalformedResponse,
                    Some(self.id.as_str().to_string()),
                    format!("undecodable response for request '{request_id}': {err}"),
                );
                Err(format!("malformed response payload: {err}"))
            }
        };

        match self.requests.settle(&request_id, outcome) {
            SettleOutcome::Settled => ContainerEvent::ResponseSettled { request_id },
            SettleOutcome::AlreadySettled => {
                self.diagnostics.warning(
                    DiagnosticCode::DuplicateSettle,
                    Some(self.id.as_str().to_string()),
                    format!("duplicate response for request id '{request_id}' ignored"),
                );
                ContainerEvent::ResponseDropped { request_id }
            }
            SettleOutcome::Unknown => {
                self.diagnostics.warning(
                    DiagnosticCode::UnknownRequest,
                    Some(self.id.as_str().to_string()),
                    format!("response for unknown request id '{request_id}' dropped"),
                );
                ContainerEvent::ResponseDropped { request_id }
            }
        }
    }

    fn handle_update(&mut self, serialized: &SerializedProps) -> ContainerEvent {
        match deserialize_props(serialized, &self.id) {
            Ok(props) => {
                self.props = props;
                ContainerEvent::PropsUpdated
            }
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticCode::PropDeserializationFailed,
                    Some(self.id.as_str().to_string()),
                    format!("prop refresh dropped: {err}"),
                );
                ContainerEvent::Dropped
            }
        }
    }

    fn handle_dom_callback(&mut self, method: &str, args: &[serde_json::Value]) -> ContainerEvent {
        match self.callbacks.get(method) {
            None => {
                self.diagnostics.error(
                    DiagnosticCode::UnknownMethod,
                    Some(self.id.as_str().to_string()),
                    format!("DOM callback for unknown method reference '{method}'"),
                );
                ContainerEvent::Dropped
            }
            Some(func) => match func(args) {
                Ok(_) => ContainerEvent::DomCallbackFired {
                    method: method.to_string(),
                },
                Err(reason) => {
                    self.diagnostics.error(
                        DiagnosticCode::DomCallbackFailed,
                        Some(self.id.as_str().to_string()),
                        format!("DOM callback '{method}' failed: {reason}"),
                    );
                    ContainerEvent::Dropped
                }
            },
        }
    }

    fn encode_outcome(&mut self, outcome: &CallbackOutcome) -> String {
        match outcome.encode() {
            Ok(text) => text,
            Err(err) => {
                self.diagnostics.error(
                    DiagnosticCode::MalformedResponse,
                    Some(self.id.as_str().to_string()),
                    format!("response encoding failed: {err}"),
                );
                r#"{"error":"response encoding failed"}"#.to_string()
            }
        }
    }

    /// Tear the context down, rejecting all outstanding requests.
    /// Returns how many were rejected.
    pub fn teardown(&mut self) -> usize {
        self.torn_down = true;
        self.requests.reject_all("container torn down")
    }
}
