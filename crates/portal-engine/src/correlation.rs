//! Pending-request records for cross-context callback invocations.
//!
//! Each invocation allocates a fresh request id and an unsettled future.
//! The future settles exactly once, when the matching response envelope
//! arrives, and never by any other path. The protocol has no timeouts:
//! an unanswered request stays pending until its container is torn down,
//! at which point all outstanding requests are rejected.
//!
//! Request ids derive from a per-container monotonic counter hashed with
//! the container id, so they are unique within a context and stable
//! across replays of the same message order.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::component_id::ComponentId;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Correlation key for one callback invocation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Derive the id for the `seq`-th request issued by `container`.
    pub fn derive(container: &ComponentId, seq: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(container.as_str().as_bytes());
        hasher.update(b"::");
        hasher.update(seq.to_be_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(32);
        for byte in &digest[..16] {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    /// Wrap an id taken off the wire.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CallbackFuture — settle-once result handle
// ---------------------------------------------------------------------------

/// Observable state of a pending callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureState {
    Pending,
    Resolved(Value),
    Rejected(String),
}

impl FutureState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Shared handle to the eventual result of a cross-context call.
///
/// Cheap to clone; all clones observe the same settlement. Settling is
/// terminal: later attempts are ignored.
#[derive(Debug, Clone)]
pub struct CallbackFuture {
    state: Rc<RefCell<FutureState>>,
}

impl CallbackFuture {
    pub(crate) fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(FutureState::Pending)),
        }
    }

    /// A future that is already rejected. Used for calls that can never
    /// be routed (a root container invoking upward).
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(FutureState::Rejected(reason.into()))),
        }
    }

    pub fn state(&self) -> FutureState {
        self.state.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.state.borrow().is_settled()
    }

    /// Settle with a success value. Returns false if already settled.
    pub(crate) fn resolve(&self, value: Value) -> bool {
        let mut state = self.state.borrow_mut();
        if state.is_settled() {
            return false;
        }
        *state = FutureState::Resolved(value);
        true
    }

    /// Settle with a failure reason. Returns false if already settled.
    pub(crate) fn reject(&self, reason: impl Into<String>) -> bool {
        let mut state = self.state.borrow_mut();
        if state.is_settled() {
            return false;
        }
        *state = FutureState::Rejected(reason.into());
        true
    }
}

// ---------------------------------------------------------------------------
// RequestMap
// ---------------------------------------------------------------------------

/// Outcome of attempting to settle a request by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled,
    /// The request was already settled; the duplicate changes nothing.
    AlreadySettled,
    /// The id was never issued here.
    Unknown,
}

/// Context-local map of outstanding requests.
#[derive(Debug, Default)]
pub struct RequestMap {
    next_seq: u64,
    pending: BTreeMap<RequestId, CallbackFuture>,
    /// Ids already settled, retained to tell duplicate responses apart
    /// from responses for ids this context never issued.
    settled: BTreeSet<RequestId>,
}

impl RequestMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh request id and its pending future.
    pub fn create(&mut self, container: &ComponentId) -> (RequestId, CallbackFuture) {
        let id = RequestId::derive(container, self.next_seq);
        self.next_seq += 1;
        let future = CallbackFuture::pending();
        self.pending.insert(id.clone(), future.clone());
        (id, future)
    }

    /// Settle the request with the given outcome, removing its record.
    pub fn settle(&mut self, id: &RequestId, outcome: Result<Value, String>) -> SettleOutcome {
        match self.pending.remove(id) {
            Some(future) => {
                match outcome {
                    Ok(value) => future.resolve(value),
                    Err(reason) => future.reject(reason),
                };
                self.settled.insert(id.clone());
                SettleOutcome::Settled
            }
            None if self.settled.contains(id) => SettleOutcome::AlreadySettled,
            None => SettleOutcome::Unknown,
        }
    }

    /// Reject every outstanding request (container teardown). Returns the
    /// number rejected.
    pub fn reject_all(&mut self, reason: &str) -> usize {
        let count = self.pending.len();
        for (id, future) in std::mem::take(&mut self.pending) {
            future.reject(reason.to_string());
            self.settled.insert(id);
        }
        count
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
