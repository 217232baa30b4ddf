//! External collaborator contracts.
//!
//! The kernel deliberately does not know how build graphs are extracted,
//! how revisions are compared, or how an impacted-target set expands into
//! test targets. Those subsystems sit behind the traits here. Two
//! concrete implementations ship with the crate: a git-backed
//! [`RevisionSource`] and a JSON-file-backed [`GraphSource`] so the CLI
//! can run against an exported node list without the query engine.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::source_digest::main_repo_relative_path;
use crate::types::GraphNode;

/// Supplies the build graph and source-file identities.
pub trait GraphSource {
    /// Error type for source operations.
    type Error: std::error::Error + Send + Sync;

    /// All nodes in the build graph, order as reported upstream.
    fn query_all_nodes(&self) -> Result<Vec<GraphNode>, Self::Error>;

    /// Identity digest for every source file node, keyed by name.
    fn query_source_identities(&self) -> Result<HashMap<String, Vec<u8>>, Self::Error>;

    /// Identities restricted to the source files behind the given
    /// workspace-relative paths, for callers that already know the
    /// changed-file list.
    fn source_identities_for_paths(
        &self,
        paths: &[PathBuf],
    ) -> Result<HashMap<String, Vec<u8>>, Self::Error>;
}

/// Supplies changed paths between revisions.
pub trait RevisionSource {
    /// Error type for revision operations.
    type Error: std::error::Error + Send + Sync;

    /// Workspace-relative paths changed between two revisions.
    fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<PathBuf>, Self::Error>;

    /// Fail if the working tree has uncommitted changes.
    fn ensure_clean(&self) -> Result<(), Self::Error>;
}

/// Expands an impacted-target set into impacted test targets.
///
/// Pure pass-through from the kernel's point of view.
pub trait TestExpansion {
    /// Error type for expansion operations.
    type Error: std::error::Error + Send + Sync;

    /// The test targets affected by the given targets.
    fn expand_to_tests(&self, targets: &BTreeSet<String>) -> Result<BTreeSet<String>, Self::Error>;
}

/// Failure while talking to git.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// git could not be invoked at all.
    #[error("failed to invoke git: {0}")]
    Io(#[from] std::io::Error),
    /// git ran but exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    CommandFailed {
        /// The subcommand and arguments that failed.
        command: String,
        /// Trimmed stderr from git.
        stderr: String,
    },
    /// The working tree has uncommitted changes.
    #[error("there are uncommitted changes in the working tree, commit them and try again")]
    DirtyTree,
}

/// [`RevisionSource`] backed by the `git` CLI.
pub struct GitRevisionSource {
    working_directory: PathBuf,
}

impl GitRevisionSource {
    /// Create a source rooted at the given repository checkout.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.working_directory)
            .output()?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RevisionSource for GitRevisionSource {
    type Error = GitError;

    fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<PathBuf>, GitError> {
        let stdout = self.git(&["diff", "--name-only", from, to])?;
        Ok(stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn ensure_clean(&self) -> Result<(), GitError> {
        let stdout = self.git(&["status", "--porcelain"])?;
        if stdout.trim().is_empty() {
            Ok(())
        } else {
            Err(GitError::DirtyTree)
        }
    }
}

/// Failure while loading a JSON node list.
#[derive(Debug, thiserror::Error)]
pub enum JsonSourceError {
    /// The graph file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path of the graph file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The graph file is not a valid node list.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// Path of the graph file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// [`GraphSource`] backed by an exported JSON node list.
///
/// The expected format is a JSON array of [`GraphNode`] values as
/// serialized by this crate.
pub struct JsonGraphSource {
    graph_path: PathBuf,
}

impl JsonGraphSource {
    /// Create a source reading from the given file.
    pub fn new(graph_path: impl Into<PathBuf>) -> Self {
        Self {
            graph_path: graph_path.into(),
        }
    }

    fn path(&self) -> &Path {
        &self.graph_path
    }
}

impl GraphSource for JsonGraphSource {
    type Error = JsonSourceError;

    fn query_all_nodes(&self) -> Result<Vec<GraphNode>, JsonSourceError> {
        let bytes = fs::read(self.path()).map_err(|source| JsonSourceError::Io {
            path: self.graph_path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| JsonSourceError::Json {
            path: self.graph_path.clone(),
            source,
        })
    }

    fn query_source_identities(&self) -> Result<HashMap<String, Vec<u8>>, JsonSourceError> {
        Ok(self
            .query_all_nodes()?
            .into_iter()
            .filter_map(|node| match node {
                GraphNode::SourceFile(file) => Some((file.name, file.identity_digest)),
                _ => None,
            })
            .collect())
    }

    fn source_identities_for_paths(
        &self,
        paths: &[PathBuf],
    ) -> Result<HashMap<String, Vec<u8>>, JsonSourceError> {
        let wanted: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        Ok(self
            .query_all_nodes()?
            .into_iter()
            .filter_map(|node| match node {
                GraphNode::SourceFile(file) => {
                    let relative = main_repo_relative_path(&file.name)?;
                    wanted
                        .contains(relative.as_path())
                        .then_some((file.name, file.identity_digest))
                }
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rule, SourceFile};
    use std::fs;

    fn write_graph(dir: &Path) -> PathBuf {
        let nodes = vec![
            GraphNode::SourceFile(SourceFile {
                name: "//pkg:a.c".to_string(),
                identity_digest: b"ida".to_vec(),
            }),
            GraphNode::SourceFile(SourceFile {
                name: "//pkg:b.c".to_string(),
                identity_digest: b"idb".to_vec(),
            }),
            GraphNode::Rule(Rule {
                name: "//pkg:lib".to_string(),
                intrinsic_digest: b"lib".to_vec(),
                inputs: vec!["//pkg:a.c".to_string(), "//pkg:b.c".to_string()],
            }),
        ];
        let path = dir.join("graph.json");
        fs::write(&path, serde_json::to_vec_pretty(&nodes).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_json_source_loads_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGraphSource::new(write_graph(dir.path()));
        let nodes = source.query_all_nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].name(), "//pkg:lib");
    }

    #[test]
    fn test_json_source_extracts_identities() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGraphSource::new(write_graph(dir.path()));
        let identities = source.query_source_identities().unwrap();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities["//pkg:a.c"], b"ida".to_vec());
    }

    #[test]
    fn test_json_source_filters_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGraphSource::new(write_graph(dir.path()));
        let identities = source
            .source_identities_for_paths(&[PathBuf::from("pkg/a.c")])
            .unwrap();
        assert_eq!(identities.len(), 1);
        assert!(identities.contains_key("//pkg:a.c"));
    }

    #[test]
    fn test_json_source_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonGraphSource::new(path).query_all_nodes(),
            Err(JsonSourceError::Json { .. })
        ));
    }
}
