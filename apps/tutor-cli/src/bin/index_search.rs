use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use tutor_cli::{init_tracing, Bootstrap};
use tutor_core::{MetadataFilter, SearchResult, Subject};

/// Query the subject indices directly, without routing or generation.
#[derive(Parser)]
#[command(name = "tutor-index-search", version, about)]
struct Args {
    query: String,

    /// Subject to search; all populated subjects when omitted
    #[arg(short, long)]
    subject: Option<String>,

    #[arg(short = 'k', long, default_value_t = 5)]
    top_k: usize,

    /// Metadata filter, e.g. `language=Tamil,grade=8`
    #[arg(short, long)]
    filter: Option<MetadataFilter>,

    #[arg(long)]
    index_dir: Option<PathBuf>,

    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_hits(subject: &Subject, hits: &[SearchResult]) {
    println!("\n📚 {subject}: {} results", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.chunk.metadata;
        println!(
            "  {}. score={:.4}  source={}  topic={}",
            i + 1,
            hit.score,
            meta.source_file.as_deref().unwrap_or("-"),
            meta.topic.as_deref().unwrap_or("-")
        );
        let preview: String = hit.chunk.text.chars().take(160).collect();
        println!("     📝 {preview}");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let boot = Bootstrap::load(args.config_dir.as_deref())?;
    let index_dir = boot.index_dir(args.index_dir)?;
    let store = boot.open_store(&index_dir)?;

    println!("🔍 Query: {}", args.query);
    match &args.subject {
        Some(name) => {
            let subject = Subject::new(name.as_str());
            let hits = store.search(&args.query, &subject, args.top_k, args.filter.as_ref())?;
            print_hits(&subject, &hits);
        }
        None => {
            let filter = args.filter.as_ref().filter(|f| !f.is_empty());
            for subject in store.subjects() {
                if store.partition(subject).is_none() {
                    continue;
                }
                let hits = store.search(&args.query, subject, args.top_k, filter)?;
                print_hits(subject, &hits);
            }
        }
    }
    Ok(())
}
