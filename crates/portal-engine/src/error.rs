//! Typed errors surfaced by codec entry points.
//!
//! Programmer errors (duplicate prop keys, empty source paths) come back
//! as `Err` and surface to the component author. Protocol errors never
//! take this path; they are recorded as [`crate::diagnostics::Diagnostic`]
//! entries instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A component id cannot be derived from an empty source path.
    #[error("component path must not be empty")]
    EmptyComponentPath,

    /// The same prop name is declared both as a plain value and as a
    /// callback on one component. Naming conflict in the component's own
    /// declaration, not a runtime condition.
    #[error("prop '{key}' on component '{component_id}' is declared as both a value and a callback")]
    DuplicatePropKey { key: String, component_id: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
