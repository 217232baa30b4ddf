//! Graph indexing: name→rule lookup and generated-file ownership.
//!
//! This pass is a topological bootstrap, not dependency resolution. It
//! registers every rule by name, then resolves each generated file to the
//! rule that produces it. Generated files may be listed before their
//! generating rule, and may chain through other generated files, so
//! resolution runs as a worklist: each pass must strictly shrink the
//! unresolved set or the graph is rejected as untraversable.

use std::collections::HashMap;

use tracing::debug;

use crate::error::GraphTraversalError;
use crate::types::{GraphNode, Rule};

/// Lookup tables over one immutable build graph.
///
/// Borrows the node list it was built from; build once per hashing run.
#[derive(Debug)]
pub struct GraphIndex<'g> {
    rules: HashMap<&'g str, &'g Rule>,
    owners: HashMap<&'g str, &'g Rule>,
}

impl<'g> GraphIndex<'g> {
    /// Build lookup tables from a flat node list.
    ///
    /// Fails with [`GraphTraversalError::Untraversable`] when some
    /// generated file's generating rule never appears among the rules,
    /// directly or through a chain of generated files.
    pub fn build(nodes: &'g [GraphNode]) -> Result<Self, GraphTraversalError> {
        let mut rules: HashMap<&'g str, &'g Rule> = HashMap::new();
        let mut pending = Vec::new();

        for node in nodes {
            match node {
                GraphNode::Rule(rule) => {
                    rules.insert(rule.name.as_str(), rule);
                }
                GraphNode::GeneratedFile(file) => pending.push(file),
                GraphNode::SourceFile(_) => {}
            }
        }

        let mut owners: HashMap<&'g str, &'g Rule> = HashMap::new();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|file| {
                let producer = file.generating_rule_name.as_str();
                let owner = rules
                    .get(producer)
                    .or_else(|| owners.get(producer))
                    .copied();
                match owner {
                    Some(rule) => {
                        owners.insert(file.name.as_str(), rule);
                        false
                    }
                    None => true,
                }
            });
            if pending.len() == before {
                let mut unresolved: Vec<String> =
                    pending.iter().map(|file| file.name.clone()).collect();
                unresolved.sort();
                return Err(GraphTraversalError::Untraversable { unresolved });
            }
        }

        debug!(
            rules = rules.len(),
            generated_files = owners.len(),
            "graph index built"
        );
        Ok(Self { rules, owners })
    }

    /// Resolve a name to a rule, if one exists.
    pub fn rule(&self, name: &str) -> Option<&'g Rule> {
        self.rules.get(name).copied()
    }

    /// Resolve a generated file name to its generating rule.
    pub fn owning_rule(&self, name: &str) -> Option<&'g Rule> {
        self.owners.get(name).copied()
    }

    /// Resolve an input reference to the rule standing behind it: the
    /// rule itself, or the rule producing the named generated file.
    pub fn resolve_rule(&self, name: &str) -> Option<&'g Rule> {
        self.rule(name).or_else(|| self.owning_rule(name))
    }

    /// Number of rules registered.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeneratedFile, SourceFile};

    fn rule(name: &str) -> GraphNode {
        GraphNode::Rule(Rule {
            name: name.to_string(),
            intrinsic_digest: name.as_bytes().to_vec(),
            inputs: vec![],
        })
    }

    fn generated(name: &str, producer: &str) -> GraphNode {
        GraphNode::GeneratedFile(GeneratedFile {
            name: name.to_string(),
            generating_rule_name: producer.to_string(),
        })
    }

    #[test]
    fn test_resolves_generated_file_listed_before_rule() {
        let nodes = vec![generated("//pkg:out.h", "//pkg:codegen"), rule("//pkg:codegen")];
        let index = GraphIndex::build(&nodes).unwrap();
        assert_eq!(index.owning_rule("//pkg:out.h").unwrap().name, "//pkg:codegen");
    }

    #[test]
    fn test_resolves_generated_chain_over_multiple_passes() {
        // out2 points at out1, which points at the real rule; listed so
        // that each pass resolves exactly one of them.
        let nodes = vec![
            generated("//pkg:out2", "//pkg:out1"),
            generated("//pkg:out1", "//pkg:codegen"),
            rule("//pkg:codegen"),
        ];
        let index = GraphIndex::build(&nodes).unwrap();
        assert_eq!(index.owning_rule("//pkg:out1").unwrap().name, "//pkg:codegen");
        assert_eq!(index.owning_rule("//pkg:out2").unwrap().name, "//pkg:codegen");
    }

    #[test]
    fn test_missing_generating_rule_is_untraversable() {
        let nodes = vec![rule("//pkg:lib"), generated("//pkg:out.h", "//pkg:nowhere")];
        let err = GraphIndex::build(&nodes).unwrap_err();
        match err {
            GraphTraversalError::Untraversable { unresolved } => {
                assert_eq!(unresolved, vec!["//pkg:out.h".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mutually_referencing_generated_files_are_untraversable() {
        let nodes = vec![generated("//pkg:a", "//pkg:b"), generated("//pkg:b", "//pkg:a")];
        assert!(matches!(
            GraphIndex::build(&nodes),
            Err(GraphTraversalError::Untraversable { .. })
        ));
    }

    #[test]
    fn test_source_files_need_no_resolution() {
        let nodes = vec![GraphNode::SourceFile(SourceFile {
            name: "//pkg:main.c".to_string(),
            identity_digest: vec![],
        })];
        let index = GraphIndex::build(&nodes).unwrap();
        assert_eq!(index.rule_count(), 0);
        assert!(index.rule("//pkg:main.c").is_none());
    }
}
