//! Source file digest resolution.
//!
//! Produces the digest that represents a source file in the graph:
//!
//! ```text
//! final = SHA-256(file_bytes? ++ identity_digest ++ name_bytes)
//! ```
//!
//! On-disk content participates only when the node name follows the main
//! repository's label convention (`//`, `@//`, `@@//`) and a working
//! directory is configured. A missing file is a tolerated degradation: a
//! warning is logged and only identity and name contribute. Files are
//! streamed through a small per-call buffer so memory use is independent
//! of file size.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rayon::prelude::*;
use regex_lite::Regex;
use tracing::warn;

use crate::error::IoFailure;
use crate::types::{Digest, GraphNode, Sha256Writer, SourceFile};

const READ_BUF_SIZE: usize = 8192;

/// Stream a file's bytes into a hasher in bounded chunks.
///
/// The buffer is scoped to this call; there is no shared pool.
pub(crate) fn stream_file(hasher: &mut Sha256Writer, path: &Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.put(&buf[..n]);
    }
    Ok(())
}

/// Map a main-repo label to its workspace-relative path.
///
/// `//src:lib/a.c` → `src/lib/a.c`; labels outside the main repository
/// (`@ext//...`) yield `None`.
pub(crate) fn main_repo_relative_path(name: &str) -> Option<PathBuf> {
    static MAIN_REPO: OnceLock<Regex> = OnceLock::new();
    let re = MAIN_REPO.get_or_init(|| Regex::new(r"^@{0,2}//").expect("static pattern"));
    let m = re.find(name)?;
    let rest = &name[m.end()..];
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(PathBuf::from(rest.replace(':', "/")))
}

/// Resolves the final digest of every source file node.
pub struct SourceDigestResolver {
    working_directory: Option<PathBuf>,
    changed_paths: Option<HashSet<PathBuf>>,
}

impl SourceDigestResolver {
    /// Create a resolver.
    ///
    /// Without a working directory no file content is ever read; digests
    /// are composed from identity and name alone.
    pub fn new(working_directory: Option<PathBuf>) -> Self {
        Self {
            working_directory,
            changed_paths: None,
        }
    }

    /// Restrict content reads to a known changed-path set.
    ///
    /// Paths are relative to the working directory. Files outside the set
    /// contribute identity and name only, which keeps a re-hash after a
    /// small change proportional to the change, not the tree.
    pub fn with_changed_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.changed_paths = Some(paths.into_iter().collect());
        self
    }

    fn wants_content(&self, relative: &Path) -> bool {
        match &self.changed_paths {
            None => true,
            Some(set) => set.contains(relative),
        }
    }

    /// Compute the final digest for one source file node.
    pub fn resolve(&self, file: &SourceFile) -> Result<Digest, IoFailure> {
        let mut hasher = Sha256Writer::new();
        if let Some(dir) = &self.working_directory {
            if let Some(relative) = main_repo_relative_path(&file.name) {
                if self.wants_content(&relative) {
                    let path = dir.join(&relative);
                    match stream_file(&mut hasher, &path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            warn!(
                                file = %path.display(),
                                label = %file.name,
                                "source file not found, digesting identity only"
                            );
                        }
                        Err(source) => return Err(IoFailure { path, source }),
                    }
                }
            }
        }
        hasher.put(&file.identity_digest);
        hasher.put(file.name.as_bytes());
        Ok(hasher.finish())
    }

    /// Resolve every source file node in the list, in parallel.
    ///
    /// The first fatal read error aborts the whole resolution.
    pub fn resolve_all(&self, nodes: &[GraphNode]) -> Result<HashMap<String, Digest>, IoFailure> {
        nodes
            .par_iter()
            .filter_map(|node| match node {
                GraphNode::SourceFile(file) => Some(file),
                _ => None,
            })
            .map(|file| Ok((file.name.clone(), self.resolve(file)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source(name: &str, identity: &[u8]) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            identity_digest: identity.to_vec(),
        }
    }

    #[test]
    fn test_label_to_path_mapping() {
        assert_eq!(
            main_repo_relative_path("//src/main:file.txt"),
            Some(PathBuf::from("src/main/file.txt"))
        );
        assert_eq!(
            main_repo_relative_path("//:root.txt"),
            Some(PathBuf::from("root.txt"))
        );
        assert_eq!(
            main_repo_relative_path("@//pkg:a.c"),
            Some(PathBuf::from("pkg/a.c"))
        );
        assert_eq!(
            main_repo_relative_path("@@//pkg:a.c"),
            Some(PathBuf::from("pkg/a.c"))
        );
        assert_eq!(main_repo_relative_path("@ext//pkg:a.c"), None);
    }

    #[test]
    fn test_content_changes_digest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let path = dir.path().join("pkg/a.c");
        let file = source("//pkg:a.c", b"id");

        let resolver = SourceDigestResolver::new(Some(dir.path().to_path_buf()));

        fs::write(&path, "int main() {}").unwrap();
        let before = resolver.resolve(&file).unwrap();

        fs::write(&path, "int main() { return 1; }").unwrap();
        let after = resolver.resolve(&file).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_file_is_identity_only() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SourceDigestResolver::new(Some(dir.path().to_path_buf()));
        let file = source("//pkg:gone.c", b"id");

        let resolved = resolver.resolve(&file).unwrap();

        // Equivalent to never having a working directory at all.
        let no_disk = SourceDigestResolver::new(None).resolve(&file).unwrap();
        assert_eq!(resolved, no_disk);
    }

    #[test]
    fn test_external_label_never_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.c"), "content").unwrap();

        let resolver = SourceDigestResolver::new(Some(dir.path().to_path_buf()));
        let external = source("@ext//pkg:a.c", b"id");
        let no_disk = SourceDigestResolver::new(None).resolve(&external).unwrap();
        assert_eq!(resolver.resolve(&external).unwrap(), no_disk);
    }

    #[test]
    fn test_changed_path_restriction_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.c"), "content").unwrap();
        let file = source("//pkg:a.c", b"id");

        let unrestricted = SourceDigestResolver::new(Some(dir.path().to_path_buf()));
        let with_file = unrestricted.resolve(&file).unwrap();

        let restricted = SourceDigestResolver::new(Some(dir.path().to_path_buf()))
            .with_changed_paths([PathBuf::from("pkg/other.c")]);
        let without_file = restricted.resolve(&file).unwrap();
        assert_ne!(with_file, without_file);

        let matching = SourceDigestResolver::new(Some(dir.path().to_path_buf()))
            .with_changed_paths([PathBuf::from("pkg/a.c")]);
        assert_eq!(matching.resolve(&file).unwrap(), with_file);
    }

    #[test]
    fn test_streaming_matches_whole_file_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &payload).unwrap();

        let mut streamed = Sha256Writer::new();
        stream_file(&mut streamed, &path).unwrap();

        let mut whole = Sha256Writer::new();
        whole.put(&payload);

        assert_eq!(streamed.finish(), whole.finish());
    }

    #[test]
    fn test_resolve_all_covers_only_source_nodes() {
        let nodes = vec![
            GraphNode::SourceFile(source("//pkg:a.c", b"a")),
            GraphNode::Rule(crate::types::Rule {
                name: "//pkg:lib".to_string(),
                intrinsic_digest: vec![],
                inputs: vec![],
            }),
            GraphNode::SourceFile(source("//pkg:b.c", b"b")),
        ];
        let resolver = SourceDigestResolver::new(None);
        let digests = resolver.resolve_all(&nodes).unwrap();
        assert_eq!(digests.len(), 2);
        assert!(digests.contains_key("//pkg:a.c"));
        assert!(digests.contains_key("//pkg:b.c"));
    }
}
