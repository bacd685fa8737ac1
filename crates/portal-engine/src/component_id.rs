//! Stable component identity derivation.
//!
//! A [`ComponentId`] is structurally `sourcePath##instanceId##parentId`,
//! unique per (source, declared instance key, position in the parent
//! chain). Ids are recomputed fresh on every render pass from the same
//! inputs and never persisted, so identical inputs always yield the
//! identical id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::error::EngineError;

/// Segment separator in the wire form of a component id.
pub const ID_SEPARATOR: &str = "##";

/// Placeholder for an absent instance id or parent id segment.
pub const NULL_SEGMENT: &str = "null";

/// Globally unique identifier for one component instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Wrap an already-formed id taken off the wire.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The source path segment (everything before the first separator).
    pub fn source_path(&self) -> &str {
        match self.0.find(ID_SEPARATOR) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a component id from its source path, declared instance id, and
/// parent id.
///
/// Pure and deterministic apart from the missing-instance-id warning: an
/// absent instance id is tolerated but recorded, since omission collapses
/// identity for sibling instances of the same source under the same
/// parent.
pub fn build_component_id(
    component_path: &str,
    instance_id: Option<&str>,
    parent_id: Option<&ComponentId>,
    diagnostics: &mut DiagnosticLog,
) -> Result<ComponentId, EngineError> {
    if component_path.is_empty() {
        return Err(EngineError::EmptyComponentPath);
    }
    if instance_id.is_none() {
        diagnostics.warning(
            DiagnosticCode::MissingInstanceId,
            parent_id.map(|p| p.as_str().to_string()),
            format!("component '{component_path}' declared without an instance id"),
        );
    }

    let instance = instance_id.unwrap_or(NULL_SEGMENT);
    let parent = parent_id.map(ComponentId::as_str).unwrap_or(NULL_SEGMENT);
    Ok(ComponentId(format!(
        "{component_path}{ID_SEPARATOR}{instance}{ID_SEPARATOR}{parent}"
    )))
}
