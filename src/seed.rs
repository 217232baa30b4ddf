//! Seed digest: whole-graph perturbation from external files.
//!
//! Zero or more externally supplied files (toolchain version files,
//! lockfiles) fold into a single digest that is mixed into every node's
//! final digest. Changing any seed byte therefore invalidates the entire
//! graph without modeling the environment as a graph dependency.
//!
//! An empty path list yields `None`: nothing is mixed in, so seedless
//! snapshots stay comparable with each other. Unlike source files, a seed
//! file that cannot be read is always fatal — the caller asked for it by
//! name.

use std::path::PathBuf;

use crate::error::IoFailure;
use crate::source_digest::stream_file;
use crate::types::{Digest, Sha256Writer};

/// Fold seed files into one digest, concatenated in caller order.
pub fn fold_seed_files(paths: &[PathBuf]) -> Result<Option<Digest>, IoFailure> {
    if paths.is_empty() {
        return Ok(None);
    }
    let mut hasher = Sha256Writer::new();
    for path in paths {
        stream_file(&mut hasher, path).map_err(|source| IoFailure {
            path: path.clone(),
            source,
        })?;
    }
    Ok(Some(hasher.finish()))
}
