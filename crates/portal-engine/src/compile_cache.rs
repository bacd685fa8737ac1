//! Local cache of compiled component artifacts.
//!
//! The cache is strictly an optimization: a read-through/write-through
//! wrapper over a pluggable store. Store failures are recorded and
//! treated exactly as a miss so an unavailable backing store can never
//! block rendering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::diagnostics::{DiagnosticCode, DiagnosticLog};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Identity and text of one compiled component artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Hex sha-256 of the artifact text.
    pub content_hash: String,
    /// The compiled output itself.
    pub artifact: String,
}

impl ArtifactDescriptor {
    pub fn new(artifact: impl Into<String>) -> Self {
        let artifact = artifact.into();
        Self {
            content_hash: content_hash(&artifact),
            artifact,
        }
    }

    /// Whether the stored hash still matches the artifact text.
    pub fn verify(&self) -> bool {
        content_hash(&self.artifact) == self.content_hash
    }
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// One cache entry, keyed by component source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub artifact: ArtifactDescriptor,
}

// ---------------------------------------------------------------------------
// Store abstraction
// ---------------------------------------------------------------------------

/// Failure talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache record corrupt for '{key}'")]
    Corrupt { key: String },
}

/// Pluggable artifact storage. `put` is an upsert; last write wins.
pub trait ArtifactStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>, StoreError>;
    fn put(&mut self, record: CacheRecord) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process embeddings.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    records: BTreeMap<String, CacheRecord>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, record: CacheRecord) -> Result<(), StoreError> {
        self.records.insert(record.key.clone(), record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CompileCache
// ---------------------------------------------------------------------------

/// Read-through/write-through wrapper over an [`ArtifactStore`].
#[derive(Debug)]
pub struct CompileCache<S> {
    store: S,
}

impl<S: ArtifactStore> CompileCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Look up the artifact for a component source path. A store error
    /// or an entry that fails hash verification is reported and counts
    /// as a miss.
    pub fn lookup(&self, key: &str, diagnostics: &mut DiagnosticLog) -> Option<ArtifactDescriptor> {
        let record = match self.store.get(key) {
            Ok(found) => found?,
            Err(err) => {
                diagnostics.warning(
                    DiagnosticCode::CacheUnavailable,
                    None,
                    format!("lookup for '{key}' failed, treating as miss: {err}"),
                );
                return None;
            }
        };
        if !record.artifact.verify() {
            diagnostics.warning(
                DiagnosticCode::CacheUnavailable,
                None,
                format!("hash mismatch for '{key}', treating as miss"),
            );
            return None;
        }
        Some(record.artifact)
    }

    /// Store a freshly compiled artifact. A store error is reported and
    /// otherwise ignored.
    pub fn store(&mut self, key: &str, artifact: ArtifactDescriptor, diagnostics: &mut DiagnosticLog) {
        let record = CacheRecord {
            key: key.to_string(),
            artifact,
        };
        if let Err(err) = self.store.put(record) {
            diagnostics.warning(
                DiagnosticCode::CacheUnavailable,
                None,
                format!("store for '{key}' failed: {err}"),
            );
        }
    }
}
