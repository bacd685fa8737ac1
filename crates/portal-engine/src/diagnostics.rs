//! Structured, non-fatal diagnostic reporting.
//!
//! Protocol errors never crash a container's message loop; they are
//! recorded here as typed, serializable entries and mirrored through the
//! `log` facade. Tests assert on recorded codes rather than parsing log
//! output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Stable code identifying each reportable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Component declared without an instance id; sibling instances of the
    /// same source under the same parent collapse to one identity.
    MissingInstanceId,
    /// Deprecated component marker alias used; emitted once per instance.
    LegacyComponentMarker,
    /// Establishing one nested component's metadata failed; that component
    /// was omitted from the render without affecting siblings.
    ChildSerializationFailed,
    /// Callback invocation referenced a method key absent from the local
    /// registry (stale or unknown method reference).
    UnknownMethod,
    /// Callback response referenced a request id with no pending record.
    UnknownRequest,
    /// A settled request received a second settle attempt.
    DuplicateSettle,
    /// Root container attempted a parent-directed callback invocation.
    RootCallbackAttempt,
    /// Incoming prop refresh could not be deserialized.
    PropDeserializationFailed,
    /// A callback response payload could not be decoded.
    MalformedResponse,
    /// A host-directed DOM callback handler returned an error; there is
    /// no response path, so the failure is only reported.
    DomCallbackFailed,
    /// Render targeted a host container that does not exist.
    MissingMountPoint,
    /// Cache store access failed; treated as a miss.
    CacheUnavailable,
}

impl DiagnosticCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingInstanceId => "missing_instance_id",
            Self::LegacyComponentMarker => "legacy_component_marker",
            Self::ChildSerializationFailed => "child_serialization_failed",
            Self::UnknownMethod => "unknown_method",
            Self::UnknownRequest => "unknown_request",
            Self::DuplicateSettle => "duplicate_settle",
            Self::RootCallbackAttempt => "root_callback_attempt",
            Self::PropDeserializationFailed => "prop_deserialization_failed",
            Self::MalformedResponse => "malformed_response",
            Self::DomCallbackFailed => "dom_callback_failed",
            Self::MissingMountPoint => "missing_mount_point",
            Self::CacheUnavailable => "cache_unavailable",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Component the condition was observed for, when one is identifiable.
    pub component_id: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component_id {
            Some(id) => write!(f, "{} [{}] {}: {}", self.severity, self.code, id, self.message),
            None => write!(f, "{} [{}] {}", self.severity, self.code, self.message),
        }
    }
}

/// Append-only log of diagnostics for one container or host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic, mirroring it through the `log` facade.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Error => log::error!("{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub fn warning(
        &mut self,
        code: DiagnosticCode,
        component_id: Option<String>,
        message: impl Into<String>,
    ) {
        self.record(Diagnostic {
            severity: Severity::Warning,
            code,
            component_id,
            message: message.into(),
        });
    }

    pub fn error(
        &mut self,
        code: DiagnosticCode,
        component_id: Option<String>,
        message: impl Into<String>,
    ) {
        self.record(Diagnostic {
            severity: Severity::Error,
            code,
            component_id,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
