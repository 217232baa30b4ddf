//! Digest value type and SHA-256 composition helper.
//!
//! Every node in the build graph resolves to a [`Digest`]: a 32-byte
//! SHA-256 value rendered as lowercase hex in persisted snapshots.
//! [`Sha256Writer`] is the single composition primitive used by all
//! digest sites, so feed order is explicit at every call site.

use sha2::{Digest as _, Sha256};

/// A finalized 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental SHA-256 accumulator.
///
/// Feed order is significant: two writers fed the same bytes in a
/// different order finalize to different digests.
#[derive(Default)]
pub struct Sha256Writer {
    inner: Sha256,
}

impl Sha256Writer {
    /// Start an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the accumulator.
    pub fn put(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Feed bytes if present; `None` contributes nothing.
    pub fn put_optional(&mut self, bytes: Option<&[u8]>) {
        if let Some(bytes) = bytes {
            self.inner.update(bytes);
        }
    }

    /// Finalize into a [`Digest`].
    pub fn finish(self) -> Digest {
        Digest(self.inner.finalize().into())
    }
}
