//! [`ArtifactStore`] backends.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, instrument};

use crate::cache::{Artifact, ArtifactStore, CacheKey, PutOutcome};
use crate::error::CacheError;
use crate::lock::DirLock;

/// First token of every artifact file header.
const HEADER_MAGIC: &str = "gridlock-artifact";
/// Format version written to new artifact files.
const FORMAT_VERSION: u32 = 1;
const LOCK_FILE: &str = ".lock";

// ---------------------------------------------------------------------------
// DirStore
// ---------------------------------------------------------------------------

/// One file per key under `<root>/<graph version>/`.
///
/// File layout: a single header line
/// `gridlock-artifact <version> <blake3 checksum> <payload length>` followed
/// by the JSON payload. Writes go to a temp file that is renamed into place
/// while holding an exclusive `fs2` lock on the version directory, so readers
/// never observe a partial entry.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.version_dir())
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.version_dir(key).join(key.file_name())
    }

    fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.version_dir(key).join(LOCK_FILE)
    }

    fn read_entry(path: &Path, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        decode_entry(&raw, key).map(Some)
    }

    /// Write via temp file and rename. Callers hold the exclusive lock.
    fn write_entry(path: &Path, artifact: &Artifact) -> Result<(), CacheError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| CacheError::Io { path, source }
        };
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        fs::write(&tmp, encode_entry(artifact)).map_err(io_err(&tmp))?;
        fs::rename(&tmp, path).map_err(io_err(path))
    }
}

fn encode_entry(artifact: &Artifact) -> Vec<u8> {
    let header = format!(
        "{HEADER_MAGIC} {FORMAT_VERSION} {} {}\n",
        artifact.checksum(),
        artifact.bytes().len()
    );
    let mut out = Vec::with_capacity(header.len() + artifact.bytes().len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(artifact.bytes());
    out
}

fn decode_entry(raw: &[u8], key: &CacheKey) -> Result<Artifact, CacheError> {
    let corrupt = |reason: String| CacheError::Corrupt {
        key: key.to_string(),
        reason,
    };

    let newline = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt("missing header line".into()))?;
    let header = std::str::from_utf8(&raw[..newline])
        .map_err(|_| corrupt("header is not utf-8".into()))?;
    let payload = &raw[newline + 1..];

    let fields: Vec<&str> = header.split(' ').collect();
    let [magic, version, checksum, len] = fields.as_slice() else {
        return Err(corrupt(format!("malformed header `{header}`")));
    };
    if *magic != HEADER_MAGIC {
        return Err(corrupt(format!("bad magic `{magic}`")));
    }
    if version.parse::<u32>().ok() != Some(FORMAT_VERSION) {
        return Err(corrupt(format!("unsupported format version `{version}`")));
    }
    let expected_len: usize = len
        .parse()
        .map_err(|_| corrupt(format!("bad payload length `{len}`")))?;
    if payload.len() != expected_len {
        return Err(corrupt(format!(
            "truncated payload: {} of {expected_len} bytes",
            payload.len()
        )));
    }

    let artifact = Artifact::from_bytes(payload.to_vec());
    if artifact.checksum() != *checksum {
        return Err(corrupt("checksum mismatch".into()));
    }
    Ok(artifact)
}

impl ArtifactStore for DirStore {
    #[instrument(skip(self), fields(key = %key))]
    fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let _guard = DirLock::shared(&self.lock_path(key), self.lock_timeout)?;
        Self::read_entry(&path, key)
    }

    #[instrument(skip(self, artifact), fields(key = %key, bytes = artifact.bytes().len()))]
    fn put(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        let _guard = DirLock::exclusive(&self.lock_path(key), self.lock_timeout)?;

        let path = self.entry_path(key);
        match Self::read_entry(&path, key) {
            Ok(Some(_)) => return Ok(PutOutcome::AlreadyPresent),
            Ok(None) => {}
            Err(CacheError::Corrupt { reason, .. }) => {
                debug!(%reason, "replacing corrupt entry");
            }
            Err(err) => return Err(err),
        }

        Self::write_entry(&path, artifact)?;
        Ok(PutOutcome::Written)
    }

    #[instrument(skip(self, artifact), fields(key = %key, bytes = artifact.bytes().len()))]
    fn replace(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        let _guard = DirLock::exclusive(&self.lock_path(key), self.lock_timeout)?;

        let path = self.entry_path(key);
        let existed = path.exists();
        Self::write_entry(&path, artifact)?;
        debug!(existed, "entry replaced");
        Ok(if existed {
            PutOutcome::Replaced
        } else {
            PutOutcome::Written
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, Artifact>>,
}

impl MemoryStore {
    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ArtifactStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn put(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(key) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        entries.insert(key.clone(), artifact.clone());
        Ok(PutOutcome::Written)
    }

    fn replace(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(match entries.insert(key.clone(), artifact.clone()) {
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Written,
        })
    }
}

// ---------------------------------------------------------------------------
// NullStore
// ---------------------------------------------------------------------------

/// Stores nothing; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ArtifactStore for NullStore {
    fn get(&self, _key: &CacheKey) -> Result<Option<Artifact>, CacheError> {
        Ok(None)
    }

    fn put(&self, _key: &CacheKey, _artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        Ok(PutOutcome::Written)
    }

    fn replace(&self, key: &CacheKey, artifact: &Artifact) -> Result<PutOutcome, CacheError> {
        self.put(key, artifact)
    }
}
