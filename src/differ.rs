//! Snapshot diffing: the impacted-target set.
//!
//! The comparison is one-directional by design: impact is defined
//! relative to what currently exists, so targets present only in the
//! starting snapshot (deleted targets) never appear in the result.

use std::collections::BTreeSet;

use crate::types::Snapshot;

/// Every target in `end` that is new or whose digest changed since `start`.
///
/// Constant work per key; the result is sorted for stable output.
pub fn impacted_targets(start: &Snapshot, end: &Snapshot) -> BTreeSet<String> {
    end.iter()
        .filter(|(name, digest)| start.get(name) != Some(*digest))
        .map(|(name, _)| name.to_string())
        .collect()
}
