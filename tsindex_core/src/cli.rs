//! Offline CLI (spec §6): the same operations the LSP backend exposes as
//! custom requests, available for scripting and CI outside an editor.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::cancellation::{CancellationToken, Outcome};
use crate::config::IndexerConfig;
use crate::dead_code;
use crate::indexer::Indexer;

#[derive(Parser)]
#[command(name = "tsindex", version, about = "Whole-workspace TypeScript/JavaScript symbol index")]
pub struct Cli {
    /// Workspace root to operate on.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build (or incrementally refresh) the index for a workspace.
    RebuildIndex {
        /// Ignore the git-HEAD fast path and re-scan every file.
        #[arg(long)]
        full: bool,
    },
    /// Delete every persisted shard and reset metadata.
    ClearCache,
    /// Report file/symbol/shard counts.
    Stats,
    /// Dump the definitions and references tsindex has recorded for a file.
    InspectIndex {
        /// File path, relative to the workspace root or absolute.
        file: String,
    },
    /// Scan for exported symbols with no recorded importer.
    FindDeadCode {
        /// Restrict the scan to files under this path prefix.
        #[arg(long)]
        scope: Option<String>,
    },
}

#[derive(Serialize)]
struct StatsOutput {
    files: usize,
    symbols: usize,
    shards: usize,
}

#[derive(Serialize)]
struct InspectOutput {
    file: String,
    definitions: Vec<crate::model::Symbol>,
    references: usize,
    imports: usize,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root.clone());
    let indexer = Indexer::new(root, IndexerConfig::default());
    let token = CancellationToken::new();

    match cli.command {
        Command::RebuildIndex { full } => {
            if full {
                indexer.clear_cache();
            }
            indexer.index_workspace(token, None).await;
            let stats = indexer.stats();
            print_stats(stats, cli.json);
        }
        Command::ClearCache => {
            indexer.clear_cache();
            println!("cache cleared");
        }
        Command::Stats => {
            indexer.index_workspace(token, None).await;
            print_stats(indexer.stats(), cli.json);
        }
        Command::InspectIndex { file } => {
            indexer.index_workspace(token, None).await;
            let shards = indexer.merged.shards.lock().expect("shard index lock poisoned");
            let definitions: Vec<crate::model::Symbol> =
                shards.symbols_in_file(&file).iter().filter(|s| s.is_definition).cloned().collect();
            let references = definitions.iter().flat_map(|s| shards.referring_files(s)).count();
            let imports = shards.imports_in_file(&file).len();
            drop(shards);
            let output = InspectOutput { file, definitions, references, imports };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{} — {} definitions, {} references, {} imports", output.file, output.definitions.len(), output.references, output.imports);
                for def in &output.definitions {
                    println!("  {:?} {} @ {}:{}", def.kind, def.name, def.file_path, def.location.position.line + 1);
                }
            }
        }
        Command::FindDeadCode { scope } => {
            indexer.index_workspace(token.clone(), None).await;
            match dead_code::analyze_workspace(&indexer, scope.as_deref(), &token) {
                Outcome::Done(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        println!("{} candidate(s) out of {} exports", report.candidates.len(), report.total_exports);
                        for candidate in &report.candidates {
                            println!("  {} {} @ {}:{} ({:?})", candidate.kind.as_str(), candidate.name, candidate.file, candidate.line + 1, candidate.confidence);
                        }
                    }
                }
                Outcome::Cancelled => {
                    anyhow::bail!("dead-code scan cancelled");
                }
            }
        }
    }

    Ok(())
}

fn print_stats(stats: crate::indexer::IndexStats, json: bool) {
    let output = StatsOutput {
        files: stats.files,
        symbols: stats.symbols,
        shards: stats.shards,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&output).expect("StatsOutput always serializes"));
    } else {
        println!("{} files, {} symbols, {} shards", output.files, output.symbols, output.shards);
    }
}
