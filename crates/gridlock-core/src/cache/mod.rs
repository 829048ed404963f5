//! Content-addressed result cache for pipeline stages.
//!
//! Every expensive stage goes through [`memoize`]: look the key up in an
//! [`ArtifactStore`], decode on a hit, otherwise compute and persist. Keys are
//! scoped to a graph version (the [`RoadGraph::fingerprint`] of the analyzed
//! graph), so an entry written for one graph can never answer a lookup for
//! another.
//!
//! # Corruption
//!
//! A corrupt entry (bad checksum, truncated file, payload that no longer
//! decodes into the expected type) is logged at `warn` and treated as a miss.
//! It is never returned to the caller.
//!
//! # Write-once
//!
//! Stores write a key at most once per graph version. A second `put` for a
//! key that already holds a valid artifact is a no-op reporting
//! [`PutOutcome::AlreadyPresent`].
//!
//! [`RoadGraph::fingerprint`]: crate::graph::RoadGraph::fingerprint

pub mod store;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::CacheError;

pub use store::{DirStore, MemoryStore, NullStore};

// ---------------------------------------------------------------------------
// Keys and artifacts
// ---------------------------------------------------------------------------

/// Identifies one stage output for one graph version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    graph_version: String,
    stage: String,
}

impl CacheKey {
    /// Build a key. `stage` is a `/`-separated name such as `ranking/degree`.
    pub fn new(graph_version: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            graph_version: graph_version.into(),
            stage: stage.into(),
        }
    }

    #[must_use]
    pub fn graph_version(&self) -> &str {
        &self.graph_version
    }

    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Filesystem-safe name for the graph version directory.
    #[must_use]
    pub fn version_dir(&self) -> String {
        sanitize(&self.graph_version)
    }

    /// Filesystem-safe file name for this stage.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", sanitize(&self.stage))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.graph_version, self.stage)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// An encoded stage output (JSON bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    payload: Vec<u8>,
}

impl Artifact {
    /// Wrap raw payload bytes.
    #[must_use]
    pub const fn from_bytes(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// Encode a value as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Encode`] if serialization fails.
    pub fn encode<T: Serialize>(key: &CacheKey, value: &T) -> Result<Self, CacheError> {
        serde_json::to_vec(value)
            .map(Self::from_bytes)
            .map_err(|source| CacheError::Encode {
                key: key.to_string(),
                source,
            })
    }

    /// Decode the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload does not describe a `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    /// `blake3:<hex>` checksum of the payload.
    #[must_use]
    pub fn checksum(&self) -> String {
        format!("blake3:{}", blake3::hash(&self.payload))
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Result of [`ArtifactStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// A valid artifact was already stored under the key; nothing changed.
    AlreadyPresent,
    /// An existing entry under the key was overwritten.
    Replaced,
}

/// Two-operation persistence contract shared by every backend.
pub trait ArtifactStore: Send + Sync {
    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Corrupt`] for an unreadable or partial entry and
    /// other variants for I/O or lock failures.
    fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError>;

    /// Store `artifact` under `key` unless a valid entry already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the entry cannot be written.
    fn put(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError>;

    /// Store `artifact` under `key`, overwriting whatever is there.
    ///
    /// Used when a stored entry is intact but no longer decodes as the
    /// expected type.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the entry cannot be written.
    fn replace(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for Arc<S> {
    fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        (**self).put(key, artifact)
    }

    fn replace(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        (**self).replace(key, artifact)
    }
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Where a memoized value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Decoded from a valid cached artifact.
    Cache,
    /// Computed and persisted.
    Computed,
    /// Computed, but persisting failed (non-fatal; logged).
    ComputedUnstored,
}

/// A value returned by [`memoize`], with provenance.
#[derive(Debug, Clone)]
pub struct Memoized<T> {
    pub value: T,
    pub source: LoadSource,
}

impl<T> Memoized<T> {
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self.source, LoadSource::Cache)
    }
}

/// Return the cached value for `key`, or compute, persist, and return it.
///
/// Corrupt or undecodable entries count as misses; an undecodable entry is
/// overwritten with the recomputed value. A failed write after a
/// successful compute is logged and does not fail the stage.
///
/// # Errors
///
/// Returns the error from `compute`, or a store error other than corruption
/// raised by the lookup.
pub fn memoize<T, F>(store: &dyn ArtifactStore, key: &CacheKey, compute: F) -> Result<Memoized<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    let mut stale = false;
    match store.get(key) {
        Ok(Some(artifact)) => match artifact.decode::<T>() {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                return Ok(Memoized {
                    value,
                    source: LoadSource::Cache,
                });
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cached artifact does not decode, recomputing");
                stale = true;
            }
        },
        Ok(None) => debug!(key = %key, "cache miss"),
        Err(CacheError::Corrupt { reason, .. }) => {
            warn!(key = %key, %reason, "corrupt cache entry, recomputing");
        }
        Err(err) => {
            return Err(err).with_context(|| format!("cache lookup for {key}"));
        }
    }

    let value = compute().with_context(|| format!("stage {}", key.stage()))?;

    let stored = Artifact::encode(key, &value).and_then(|artifact| {
        if stale {
            store.replace(key, &artifact)
        } else {
            store.put(key, &artifact)
        }
    });
    let source = match stored {
        Ok(outcome) => {
            debug!(key = %key, ?outcome, "artifact persisted");
            LoadSource::Computed
        }
        Err(err) => {
            warn!(key = %key, error = %err, code = %err.code(), "failed to persist artifact");
            LoadSource::ComputedUnstored
        }
    };
    Ok(Memoized { value, source })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    #[test]
    fn key_file_names_are_filesystem_safe() {
        let key = CacheKey::new("blake3:abc", "ranking/degree");
        assert_eq!(key.version_dir(), "blake3_abc");
        assert_eq!(key.file_name(), "ranking_degree.json");
        assert_eq!(key.to_string(), "blake3:abc#ranking/degree");
    }

    #[test]
    fn memoize_computes_once_then_hits() -> Result<()> {
        let store = MemoryStore::default();
        let key = CacheKey::new("v1", "centrality");
        let calls = Cell::new(0);

        let first = memoize(&store, &key, || {
            calls.set(calls.get() + 1);
            Ok(vec![1_u32, 2, 3])
        })?;
        assert_eq!(first.source, LoadSource::Computed);

        let second: Memoized<Vec<u32>> = memoize(&store, &key, || {
            calls.set(calls.get() + 1);
            Ok(vec![9])
        })?;
        assert!(second.is_hit());
        assert_eq!(second.value, vec![1, 2, 3]);
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[test]
    fn other_graph_version_is_a_miss() -> Result<()> {
        let store = MemoryStore::default();
        memoize(&store, &CacheKey::new("v1", "bridges"), || Ok(1_u8))?;
        let other = memoize(&store, &CacheKey::new("v2", "bridges"), || Ok(2_u8))?;
        assert!(!other.is_hit());
        assert_eq!(other.value, 2);
        Ok(())
    }

    #[test]
    fn undecodable_entry_is_recomputed() -> Result<()> {
        let store = MemoryStore::default();
        let key = CacheKey::new("v1", "graph");
        store.put(&key, &Artifact::from_bytes(b"\"not a number\"".to_vec()))?;

        let value = memoize(&store, &key, || Ok(42_u64))?;
        assert_eq!(value.value, 42);
        assert!(!value.is_hit());

        let again = memoize(&store, &key, || Ok(7_u64))?;
        assert!(again.is_hit());
        assert_eq!(again.value, 42);
        Ok(())
    }

    #[test]
    fn compute_errors_propagate() {
        let store = MemoryStore::default();
        let key = CacheKey::new("v1", "centrality");
        let result: Result<Memoized<u8>> = memoize(&store, &key, || anyhow::bail!("boom"));
        assert!(result.is_err());
        assert!(store.get(&key).expect("lookup").is_none());
    }

    struct CorruptStore {
        puts: Mutex<usize>,
    }

    impl ArtifactStore for CorruptStore {
        fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
            Err(CacheError::Corrupt {
                key: key.to_string(),
                reason: "checksum mismatch".into(),
            })
        }

        fn put(&self, _key: &CacheKey, _artifact: &Artifact) -> Result<PutOutcome, CacheError> {
            *self.puts.lock().expect("mutex") += 1;
            Ok(PutOutcome::Written)
        }

        fn replace(
            &self,
            _key: &CacheKey,
            _artifact: &Artifact,
        ) -> Result<PutOutcome, CacheError> {
            panic!("corrupt entries go through put");
        }
    }

    #[test]
    fn corrupt_entry_is_treated_as_miss() -> Result<()> {
        let store = CorruptStore {
            puts: Mutex::new(0),
        };
        let value = memoize(&store, &CacheKey::new("v1", "graph"), || Ok("fresh".to_string()))?;
        assert_eq!(value.value, "fresh");
        assert_eq!(value.source, LoadSource::Computed);
        assert_eq!(*store.puts.lock().expect("mutex"), 1);
        Ok(())
    }

    #[test]
    fn null_store_never_hits() -> Result<()> {
        let key = CacheKey::new("v1", "graph");
        memoize(&NullStore, &key, || Ok(1_u8))?;
        let again = memoize(&NullStore, &key, || Ok(2_u8))?;
        assert_eq!(again.value, 2);
        Ok(())
    }
}
