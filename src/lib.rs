//! # impact-kernel
//!
//! Deterministic build-graph digesting and impacted-target diffing.
//!
//! The kernel answers one question:
//!
//! > Given two revisions of a build graph, which targets could the
//! > changes between them possibly affect?
//!
//! ## Core Contract
//!
//! 1. Assemble a build graph from a flat node list and resolve
//!    generated-file indirections
//! 2. Compose a stable SHA-256 digest per node — a rule's digest covers
//!    its intrinsic attributes and everything it transitively depends on
//! 3. Persist the name→digest map as a JSON **snapshot**
//! 4. Diff two snapshots in constant-per-key time to get the impacted set
//!
//! ## Architecture
//!
//! ```text
//! [GraphNode] → GraphIndex → DigestEngine → Snapshot
//!                     ↑            ↑            ↓
//!        SourceDigestResolver   SeedDigest   impacted_targets
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same graph + same working tree + same seed → byte-identical snapshot
//! - Input order is significant and never canonicalized: reordering a
//!   rule's inputs changes its digest on purpose
//! - Self-references in a rule's inputs are filtered before composition
//!
//! The build system query engine, revision control, and test expansion
//! are external collaborators behind the traits in [`collab`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collab;
pub mod differ;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod seed;
pub mod source_digest;
pub mod types;

// Re-exports
pub use collab::{
    GitError, GitRevisionSource, GraphSource, JsonGraphSource, JsonSourceError, RevisionSource,
    TestExpansion,
};
pub use differ::impacted_targets;
pub use engine::{hash_build_graph, DigestEngine, HasherConfig};
pub use error::{GraphTraversalError, HashingError, IoFailure};
pub use indexer::GraphIndex;
pub use seed::fold_seed_files;
pub use source_digest::SourceDigestResolver;
pub use types::{
    Digest, GeneratedFile, GraphNode, Rule, Sha256Writer, Snapshot, SnapshotError, SourceFile,
};
