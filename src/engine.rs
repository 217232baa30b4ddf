//! Digest engine: memoized recursive composition over the build graph.
//!
//! A rule's digest is the SHA-256 of its intrinsic attribute digest, the
//! optional seed, and — in listed input order — each input's name bytes
//! followed by that input's digest (another rule's composed digest, or a
//! resolved source file digest). Dangling inputs contribute nothing
//! beyond a warning. Self-references are filtered before composition.
//!
//! Because the graph is a shared-dependency DAG, naive recursion is
//! exponential; the engine memoizes finished rule digests in a concurrent
//! map so each rule is composed to completion at most once per run. A
//! true cycle between distinct rules is reported as
//! [`GraphTraversalError::CircularDependency`] via an explicit
//! dependency-path guard instead of overflowing the stack.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{GraphTraversalError, HashingError};
use crate::indexer::GraphIndex;
use crate::seed::fold_seed_files;
use crate::source_digest::SourceDigestResolver;
use crate::types::{Digest, GraphNode, Rule, Sha256Writer, Snapshot};

/// Configuration for one full hashing run.
#[derive(Debug, Clone, Default)]
pub struct HasherConfig {
    /// Workspace root for on-disk source content; `None` disables content
    /// reads entirely.
    pub working_directory: Option<PathBuf>,
    /// Seed files folded into every node digest, in this order.
    pub seed_paths: Vec<PathBuf>,
    /// When set, only these workspace-relative paths are content-read.
    pub changed_paths: Option<Vec<PathBuf>>,
}

/// Index, resolve, seed and digest a full node list into a [`Snapshot`].
///
/// This is the one-call entry point tying the phases together; the
/// individual phases stay public for callers that already hold parts.
pub fn hash_build_graph(
    nodes: &[GraphNode],
    config: &HasherConfig,
) -> Result<Snapshot, HashingError> {
    let index = GraphIndex::build(nodes)?;

    let mut resolver = SourceDigestResolver::new(config.working_directory.clone());
    if let Some(changed) = &config.changed_paths {
        resolver = resolver.with_changed_paths(changed.iter().cloned());
    }
    let source_started = Instant::now();
    let source_digests = resolver.resolve_all(nodes)?;
    info!(
        files = source_digests.len(),
        elapsed_ms = source_started.elapsed().as_millis() as u64,
        "source file digests resolved"
    );

    let seed = fold_seed_files(&config.seed_paths)?;

    let digest_started = Instant::now();
    let engine = DigestEngine::new(&index, &source_digests, seed);
    let snapshot = engine.digest_all(nodes)?;
    info!(
        targets = snapshot.len(),
        rules = index.rule_count(),
        elapsed_ms = digest_started.elapsed().as_millis() as u64,
        "build graph digested"
    );
    Ok(snapshot)
}

/// The dependency path of the current recursive composition.
///
/// Re-entering a rule already on the path is a true cycle. The guard is
/// per-traversal state, never shared between workers: two workers
/// composing different rules over shared dependencies must not mistake
/// each other's progress for a cycle.
#[derive(Default)]
struct DepPath<'g> {
    stack: Vec<&'g str>,
    members: HashSet<&'g str>,
}

impl<'g> DepPath<'g> {
    fn enter(&mut self, name: &'g str) -> Result<(), GraphTraversalError> {
        if !self.members.insert(name) {
            let start = self.stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut path: Vec<String> =
                self.stack[start..].iter().map(|n| n.to_string()).collect();
            path.push(name.to_string());
            return Err(GraphTraversalError::CircularDependency { path });
        }
        self.stack.push(name);
        Ok(())
    }

    fn leave(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.members.remove(name);
        }
    }
}

/// Composes node digests over one immutable graph.
pub struct DigestEngine<'g> {
    index: &'g GraphIndex<'g>,
    source_digests: &'g std::collections::HashMap<String, Digest>,
    seed: Option<Digest>,
    cache: DashMap<&'g str, Digest>,
}

impl<'g> DigestEngine<'g> {
    /// Create an engine over prebuilt lookup tables and source digests.
    pub fn new(
        index: &'g GraphIndex<'g>,
        source_digests: &'g std::collections::HashMap<String, Digest>,
        seed: Option<Digest>,
    ) -> Self {
        Self {
            index,
            source_digests,
            seed,
            cache: DashMap::new(),
        }
    }

    /// Digest every node in parallel and assemble the snapshot.
    pub fn digest_all(&self, nodes: &'g [GraphNode]) -> Result<Snapshot, GraphTraversalError> {
        let entries: Vec<(String, String)> = nodes
            .par_iter()
            .map(|node| {
                let digest = self.digest_for_node(node)?;
                Ok((node.name().to_string(), digest.to_hex()))
            })
            .collect::<Result<_, GraphTraversalError>>()?;
        Ok(entries.into_iter().collect())
    }

    /// Digest a single node.
    pub fn digest_for_node(&self, node: &'g GraphNode) -> Result<Digest, GraphTraversalError> {
        match node {
            GraphNode::Rule(rule) => self.digest_for_rule(rule, &mut DepPath::default()),
            GraphNode::GeneratedFile(file) => {
                let rule = self.index.owning_rule(&file.name).ok_or_else(|| {
                    GraphTraversalError::Untraversable {
                        unresolved: vec![file.name.clone()],
                    }
                })?;
                self.digest_for_rule(rule, &mut DepPath::default())
            }
            GraphNode::SourceFile(file) => {
                let mut hasher = Sha256Writer::new();
                match self.source_digests.get(&file.name) {
                    Some(digest) => hasher.put(digest.as_bytes()),
                    None => warn!(
                        file = %file.name,
                        "no resolved digest for source file node"
                    ),
                }
                hasher.put_optional(self.seed.as_ref().map(|d| d.as_bytes().as_slice()));
                Ok(hasher.finish())
            }
        }
    }

    /// Memoized recursive rule digest.
    fn digest_for_rule(
        &self,
        rule: &'g Rule,
        path: &mut DepPath<'g>,
    ) -> Result<Digest, GraphTraversalError> {
        path.enter(&rule.name)?;
        if let Some(cached) = self.cache.get(rule.name.as_str()) {
            let digest = *cached;
            path.leave();
            return Ok(digest);
        }

        let mut hasher = Sha256Writer::new();
        hasher.put(&rule.intrinsic_digest);
        hasher.put_optional(self.seed.as_ref().map(|d| d.as_bytes().as_slice()));

        for input in &rule.inputs {
            // A rule's own name never contributes to its expansion.
            if *input == rule.name {
                continue;
            }
            hasher.put(input.as_bytes());
            if let Some(dep) = self.index.resolve_rule(input) {
                // An input may be a file this very rule generates; only
                // the name participates then, or composition would cycle.
                if dep.name != rule.name {
                    let dep_digest = self.digest_for_rule(dep, path)?;
                    hasher.put(dep_digest.as_bytes());
                }
            } else if let Some(source_digest) = self.source_digests.get(input) {
                hasher.put(source_digest.as_bytes());
            } else {
                warn!(
                    rule = %rule.name,
                    input = %input,
                    "unable to resolve digest for rule input, contributing nothing"
                );
            }
        }

        let digest = hasher.finish();
        path.leave();
        // Racing workers may both compose the same rule; the results are
        // identical and the first stored value wins.
        self.cache.entry(rule.name.as_str()).or_insert(digest);
        Ok(digest)
    }
}
