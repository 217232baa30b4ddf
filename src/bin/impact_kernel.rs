//! Command-line front end for the impact kernel.
//!
//! Subcommands:
//! - `generate-hashes`: digest an exported build graph into a snapshot
//! - `get-impacted-targets`: diff two snapshots
//! - `changed-paths`: list files changed between two git revisions

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use impact_kernel::{
    hash_build_graph, impacted_targets, GitRevisionSource, GraphSource, HasherConfig,
    JsonGraphSource, RevisionSource, Snapshot,
};

#[derive(Parser)]
#[command(name = "impact-kernel", version, about = "Build graph digesting and impacted-target diffing")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Digest every target in a build graph and write the snapshot.
    GenerateHashes {
        /// JSON node list exported from the build graph.
        #[arg(long)]
        graph: PathBuf,
        /// Workspace root for reading source file content.
        #[arg(long)]
        working_directory: Option<PathBuf>,
        /// File listing seed filepaths, one per line.
        #[arg(long)]
        seed_filepaths: Option<PathBuf>,
        /// File listing modified filepaths, one per line; restricts
        /// content reads to those files.
        #[arg(long)]
        modified_filepaths: Option<PathBuf>,
        /// Where to write the snapshot (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Diff two snapshots and print the impacted targets.
    GetImpactedTargets {
        /// Snapshot of the starting revision.
        #[arg(long)]
        starting_hashes: PathBuf,
        /// Snapshot of the final revision.
        #[arg(long)]
        final_hashes: PathBuf,
        /// Where to write the target list (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List files changed between two revisions of a clean git checkout.
    ChangedPaths {
        /// Starting revision.
        from: String,
        /// Final revision.
        to: String,
        /// Repository checkout to inspect.
        #[arg(long, default_value = ".")]
        working_directory: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read a newline-separated path list.
fn read_path_list(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read path list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Snapshot::from_json_reader(BufReader::new(file))
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::GenerateHashes {
            graph,
            working_directory,
            seed_filepaths,
            modified_filepaths,
            output,
        } => {
            let nodes = JsonGraphSource::new(&graph)
                .query_all_nodes()
                .context("failed to load build graph")?;
            let seed_paths = match seed_filepaths {
                Some(list) => read_path_list(&list)?,
                None => Vec::new(),
            };
            let changed_paths = match modified_filepaths {
                Some(list) => Some(read_path_list(&list)?),
                None => None,
            };
            let config = HasherConfig {
                working_directory,
                seed_paths,
                changed_paths,
            };
            let snapshot = hash_build_graph(&nodes, &config)?;
            snapshot
                .to_json_writer(open_output(output.as_deref())?)
                .context("failed to write snapshot")?;
        }
        Command::GetImpactedTargets {
            starting_hashes,
            final_hashes,
            output,
        } => {
            let start = load_snapshot(&starting_hashes)?;
            let end = load_snapshot(&final_hashes)?;
            let mut writer = open_output(output.as_deref())?;
            for target in impacted_targets(&start, &end) {
                writeln!(writer, "{target}")?;
            }
        }
        Command::ChangedPaths {
            from,
            to,
            working_directory,
        } => {
            let revisions = GitRevisionSource::new(working_directory);
            revisions.ensure_clean()?;
            let mut stdout = io::stdout().lock();
            for path in revisions.changed_paths(&from, &to)? {
                writeln!(stdout, "{}", path.display())?;
            }
        }
    }
    Ok(())
}
