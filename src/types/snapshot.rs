//! Persisted snapshot: the comparable name→digest artifact.
//!
//! A snapshot is a JSON object mapping each target name to the lowercase
//! hex of its 32-byte digest, pretty-printed. This is the only on-disk
//! contract the kernel must stay bit-compatible with across versions
//! sharing the same digest algorithm. Two snapshots are comparable only
//! if they were produced with the same algorithm and seed policy.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::digest::Digest;

/// A name→hex-digest map for one graph state.
///
/// Keys are kept sorted so serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

/// Failure while reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The file is not a valid JSON object of strings.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// An entry's value is not a 64-character lowercase hex digest.
    #[error("malformed digest for target {name}: {value:?}")]
    MalformedDigest {
        /// Target name of the offending entry.
        name: String,
        /// The rejected value.
        value: String,
    },
    /// The underlying reader or writer failed.
    #[error("snapshot i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Snapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a target's digest.
    pub fn insert(&mut self, name: impl Into<String>, digest: Digest) {
        self.entries.insert(name.into(), digest.to_hex());
    }

    /// Look up a target's hex digest.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of targets recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, hex_digest)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a snapshot from JSON, validating digest shape.
    pub fn from_json_reader(reader: impl Read) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_reader(reader)?;
        for (name, value) in &snapshot.entries {
            let well_formed = value.len() == 64
                && value
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
            if !well_formed {
                return Err(SnapshotError::MalformedDigest {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(snapshot)
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn to_json_writer(&self, mut writer: impl Write) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
