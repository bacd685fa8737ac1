//! Transport seam between contexts.
//!
//! Delivery is asynchronous and at-most-once per send; the core does not
//! implement retries. The in-memory implementations here back the test
//! suites and simple single-process embeddings.

use std::cell::RefCell;
use std::rc::Rc;

use crate::envelope::Envelope;

/// Context id the root container addresses its renders to.
pub const HOST_CONTEXT: &str = "host";

/// Message-passing primitive connecting one container to the outside.
pub trait Transport {
    fn send(&mut self, target: &str, envelope: Envelope);
}

/// Transport that records every send in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingTransport {
    sent: Vec<(String, Envelope)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[(String, Envelope)] {
        &self.sent
    }

    pub fn take(&mut self) -> Vec<(String, Envelope)> {
        std::mem::take(&mut self.sent)
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, target: &str, envelope: Envelope) {
        self.sent.push((target.to_string(), envelope));
    }
}

/// Clonable handle over a shared [`RecordingTransport`], letting a test
/// keep inspecting messages after handing the transport to a container.
#[derive(Debug, Clone, Default)]
pub struct SharedTransport {
    inner: Rc<RefCell<RecordingTransport>>,
}

impl SharedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, Envelope)> {
        self.inner.borrow().sent().to_vec()
    }

    pub fn take(&self) -> Vec<(String, Envelope)> {
        self.inner.borrow_mut().take()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl Transport for SharedTransport {
    fn send(&mut self, target: &str, envelope: Envelope) {
        self.inner.borrow_mut().send(target, envelope);
    }
}
