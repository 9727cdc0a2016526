use annotate::{AnnotateConfig, AnnotateOutcome, Annotator, ChatClient, TokenBudget};
use annotation::{Annotation, Span, merge};
use anyhow::{Context, Result};
use chunking::{ChunkGenerator, ChunkOutcome};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Chunk, merge and LLM-annotate text annotations
#[derive(Debug, Parser)]
#[command(name = "annotate", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Split an annotation into sentence-aligned chunks
    Chunk(ChunkArgs),

    /// Merge chunk annotations back into one annotation
    Merge {
        /// Annotation files in order; each holds one annotation or an array
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Annotate a document with a language model
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ChunkArgs {
    /// Annotation JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Window size, in characters for ja/ko and tokens otherwise
    #[arg(short, long, default_value_t = 20)]
    window: usize,

    /// Drop denotations and relations cut by a chunk boundary
    #[arg(short, long)]
    force: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Annotation JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Instruction for the model
    #[arg(short, long)]
    prompt: String,

    /// Window size, overriding the config
    #[arg(short, long)]
    window: Option<usize>,

    /// Drop denotations and relations cut by a chunk boundary
    #[arg(short, long)]
    force: bool,

    /// Annotate only this character range, as BEGIN:END
    #[arg(short, long, value_parser = parse_selection)]
    selection: Option<Span>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Client the daily token budget is charged to
    #[arg(long, default_value = "local")]
    client: String,

    /// File keeping each client's token usage for the day between runs
    #[arg(long, value_name = "FILE", default_value = "annotate-usage.json")]
    usage_file: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Chunk(args) => chunk(args),
        Commands::Merge { files } => merge_files(&files),
        Commands::Run(args) => run(args).await,
    }
}

fn chunk(args: ChunkArgs) -> Result<()> {
    let annotation = read_annotation(&args.file)?;
    let config = AnnotateConfig {
        window_size: args.window,
        ..Default::default()
    };

    match ChunkGenerator::new(config.chunker()).generate_or_confirm(&annotation, args.force)? {
        ChunkOutcome::Chunked(chunks) => {
            eprintln!("✅ {} chunks", chunks.len());
            println!("{}", serde_json::to_string_pretty(&chunks)?);
            Ok(())
        }
        ChunkOutcome::NeedsConfirmation { reason, .. } => {
            anyhow::bail!("{reason}\nRerun with --force to drop what crosses chunk boundaries")
        }
    }
}

fn merge_files(files: &[PathBuf]) -> Result<()> {
    let mut chunks = Vec::new();
    for file in files {
        let raw = read(file)?;
        match serde_json::from_str::<Vec<Annotation>>(&raw) {
            Ok(many) => chunks.extend(many),
            Err(_) => chunks.push(
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse {}", file.display()))?,
            ),
        }
    }

    let merged = merge(&chunks);
    eprintln!("✅ Merged {} chunks", chunks.len());
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AnnotateConfig::from_file(path)?,
        None => AnnotateConfig::default(),
    };
    if let Some(window) = args.window {
        config.window_size = window;
    }

    let annotation = read_annotation(&args.file)?;
    let client = ChatClient::from_config(&config.llm, config.concurrency.request_timeout_secs)?;
    let budget = Arc::new(TokenBudget::load(config.daily_token_limit, &args.usage_file)?);
    let annotator =
        Annotator::new(client, config).with_budget(Arc::clone(&budget), args.client.clone());

    let outcome = match args.selection {
        Some(selection) => {
            annotator
                .annotate_selection(&annotation, selection, &args.prompt, args.force)
                .await?
        }
        None => annotator.annotate(&annotation, &args.prompt, args.force).await?,
    };
    budget.save(&args.usage_file)?;

    match outcome {
        AnnotateOutcome::Annotated {
            annotation,
            tokens_used,
        } => {
            let json = serde_json::to_string_pretty(&annotation)?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("✅ Saved to {}", path.display());
                }
                None => println!("{json}"),
            }
            eprintln!("Tokens used: {tokens_used}");
            Ok(())
        }
        AnnotateOutcome::NeedsConfirmation { reason } => {
            anyhow::bail!("{reason}\nRerun with --force to drop what crosses chunk boundaries")
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_annotation(path: &Path) -> Result<Annotation> {
    serde_json::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse annotation {}", path.display()))
}

fn parse_selection(raw: &str) -> Result<Span, String> {
    let (begin, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected BEGIN:END, got {raw}"))?;
    let begin = begin.trim().parse().map_err(|e| format!("bad begin: {e}"))?;
    let end = end.trim().parse().map_err(|e| format!("bad end: {e}"))?;
    Ok(Span::new(begin, end))
}
