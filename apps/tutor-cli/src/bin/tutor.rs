use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tutor_cli::{init_tracing, render_response, Bootstrap};
use tutor_rag::{OllamaGenerator, TutorEngine, TutorResponse};

/// School tutor: answer study questions from the indexed textbooks.
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding config.toml (defaults to the current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Index directory (defaults to paths.index_dir)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question
    Query {
        question: String,
        /// Search only this subject
        #[arg(short, long)]
        subject: Option<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the structured response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop
    Chat {
        #[arg(short, long)]
        subject: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Vector counts per subject and the models in use
    Stats,
}

fn print_response(response: &TutorResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", response.to_json_pretty()?);
    } else {
        println!("{}", render_response(response));
    }
    Ok(())
}

fn print_stats(engine: &TutorEngine) {
    let stats = engine.stats();
    println!("📊 Index statistics");
    for (subject, count) in &stats.subjects {
        println!("  {subject:<16} {count} vectors");
    }
    println!("🤖 LLM: {}", stats.llm_model);
    println!("🔤 Embeddings: {}", stats.embedder_id);
}

fn chat(engine: &TutorEngine, subject: Option<&str>, json: bool) -> Result<()> {
    println!("🎓 School tutor. Type 'quit' or 'exit' to leave, 'stats' for index statistics.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n❓ ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        match question.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "stats" => {
                print_stats(engine);
                continue;
            }
            _ => {}
        }
        match engine.answer(question, subject, engine.default_top_k()) {
            Ok(response) => print_response(&response, json)?,
            Err(e) => eprintln!("❌ {e}"),
        }
    }
    println!("👋 Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let boot = Bootstrap::load(cli.config_dir.as_deref())?;
    let index_dir = boot.index_dir(cli.index_dir)?;
    let store = boot.open_store(&index_dir)?;
    let generator = OllamaGenerator::new(&boot.settings.ollama).context("creating generator")?;
    let engine = TutorEngine::new(store, Box::new(generator), &boot.settings)?;

    match cli.command {
        Command::Query { question, subject, top_k, json } => {
            let top_k = top_k.unwrap_or_else(|| engine.default_top_k());
            let response = engine.answer(&question, subject.as_deref(), top_k)?;
            print_response(&response, json)?;
        }
        Command::Chat { subject, json } => chat(&engine, subject.as_deref(), json)?,
        Command::Stats => print_stats(&engine),
    }
    Ok(())
}
