//! Core types for the impact kernel.

pub mod digest;
pub mod node;
pub mod snapshot;

pub use digest::{Digest, Sha256Writer};
pub use node::{GeneratedFile, GraphNode, Rule, SourceFile};
pub use snapshot::{Snapshot, SnapshotError};
