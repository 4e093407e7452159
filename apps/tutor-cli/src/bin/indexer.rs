use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use tutor_cli::{init_tracing, Bootstrap};
use tutor_core::loader::ChunkLoader;

/// Build and persist the per-subject indices from chunk files.
#[derive(Parser)]
#[command(name = "tutor-indexer", version, about)]
struct Args {
    /// Directory of *.jsonl chunk files (defaults to paths.data_dir)
    data_dir: Option<PathBuf>,

    /// Output directory (defaults to paths.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Only rebuild this subject
    #[arg(short, long)]
    subject: Option<String>,

    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose.max(1));

    let boot = Bootstrap::load(args.config_dir.as_deref())?;
    let data_dir = boot.data_dir(args.data_dir)?;
    let index_dir = boot.index_dir(args.index_dir)?;
    println!("Tutor indexer\n=============");
    println!("Data directory:  {}", data_dir.display());
    println!("Index directory: {}", index_dir.display());

    let store = boot.new_store()?;
    if args.subject.is_some() {
        // keep the other subjects' artifacts intact when rebuilding one
        store.restore(&index_dir)?;
    }
    let grouped = ChunkLoader::new(store.subjects().to_vec()).load_directory(&data_dir)?;
    if let Some(only) = &args.subject {
        if !grouped.iter().any(|(s, _)| s.matches(only)) {
            bail!("unknown subject '{only}'");
        }
    }
    for (subject, chunks) in grouped {
        if args.subject.as_deref().is_some_and(|only| !subject.matches(only)) {
            continue;
        }
        println!("📚 {subject}: {} chunks", chunks.len());
        store.build(&subject, chunks)?;
    }
    let written = store.persist(&index_dir)?;
    if args.subject.is_none() {
        let removed = store.prune(&index_dir)?;
        if removed > 0 {
            println!("🧹 Removed {removed} stale subject indices");
        }
    }

    println!("\n✅ Indexing completed: {written} subject indices written");
    for (subject, count) in store.stats() {
        println!("  {subject:<16} {count} vectors");
    }
    Ok(())
}
