//! Error taxonomy for the hashing pipeline.
//!
//! Two kinds of failure abort a run:
//!
//! - [`GraphTraversalError`]: the graph itself is malformed (generated-file
//!   resolution cannot reach a fixed point, or a true dependency cycle).
//! - [`IoFailure`]: a seed or source file read failed for a reason other
//!   than "not found".
//!
//! Recoverable conditions (dangling rule inputs, missing source files) are
//! logged via `tracing::warn!` and never surface as errors; digesting
//! continues deterministically without them.

use std::path::PathBuf;

/// Fatal structural error: the build graph cannot be traversed.
#[derive(Debug, thiserror::Error)]
pub enum GraphTraversalError {
    /// Generated-file resolution made no progress over a full pass.
    ///
    /// Every pass over the unresolved set must strictly shrink it; if it
    /// does not, a generating rule is missing or generated files reference
    /// each other pathologically.
    #[error("not possible to traverse the build graph; unresolved generated files: {}", unresolved.join(", "))]
    Untraversable {
        /// Names of the generated files whose generating rule never resolved.
        unresolved: Vec<String>,
    },

    /// A dependency cycle between distinct rules was detected.
    #[error("circular dependency detected: {}", path.join(" -> "))]
    CircularDependency {
        /// The cycle, starting and ending at the re-entered rule.
        path: Vec<String>,
    },
}

/// A file read failed for a reason other than "not found".
///
/// Missing files are a tolerated degradation; everything else (permissions,
/// hardware errors) aborts the current hashing run.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {}: {source}", path.display())]
pub struct IoFailure {
    /// The path that could not be read.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Any fatal error a full hashing run can produce.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    /// The graph is structurally untraversable.
    #[error(transparent)]
    Traversal(#[from] GraphTraversalError),
    /// A seed or source file could not be read.
    #[error(transparent)]
    Io(#[from] IoFailure),
}
