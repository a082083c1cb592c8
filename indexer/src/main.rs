use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use textknn::ingest::{collect_files, run_pipeline, ClassFilter};
use textknn::persist::save_to_file;
use textknn::pool::default_workers;
use textknn::tokenizer::Tokenizer;
use textknn::{DocumentRecord, TotalIndex};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Count classified documents and build forward/inverse indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index (optionally split into training and test indices) from JSON/JSONL documents
    Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Input path (file or directory)
    #[arg(long, short = 'd')]
    input: PathBuf,
    /// File to write the index to
    #[arg(long, short = 'o', default_value = "/tmp/index.bin.zst")]
    output: PathBuf,
    /// Additional stopwords file
    #[arg(long, short = 's')]
    stopwords: Option<PathBuf>,
    /// Include documents which have at least one class
    #[arg(long, short = 'y', default_value_t = false)]
    classy: bool,
    /// Include documents which have no class
    #[arg(long, short = 'n', default_value_t = false)]
    classless: bool,
    /// Split documents into two indices, writing the second one here
    #[arg(long, requires = "split_size")]
    split: Option<PathBuf>,
    /// Number of documents taken for the first index (the second gets the rest)
    #[arg(long)]
    split_size: Option<usize>,
    /// Number of counting workers
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build(&args),
    }
}

fn build(args: &BuildArgs) -> Result<()> {
    let tokenizer = match &args.stopwords {
        Some(path) => Tokenizer::with_stopwords_file(path)
            .with_context(|| format!("unable to get stopwords from {}", path.display()))?,
        None => Tokenizer::new(),
    };
    let filter = ClassFilter { classy: args.classy, classless: args.classless };
    let workers = args.workers.unwrap_or_else(default_workers);

    let files = collect_files(&args.input);
    tracing::info!(files = files.len(), workers, "found input files");

    // Nothing is written unless every input was counted.
    let built = run_pipeline(files, &tokenizer, filter, workers, |records| build_indices(records, args))?;
    save(&built, args)
}

/// Indices produced by one build, verified but not yet written.
struct Built {
    index: TotalIndex,
    second: Option<(TotalIndex, PathBuf)>,
}

/// Runs on the pipeline's consumer thread: index construction is strictly sequential.
fn build_indices(records: &Receiver<DocumentRecord>, args: &BuildArgs) -> Result<Built> {
    let mut index = TotalIndex::new();

    let second = match &args.split {
        Some(split) => {
            let split_size = args.split_size.context("--split requires --split-size")?;
            index.add_up_to(records, Some(split_size))?;

            let mut second = TotalIndex::new_offset(&index);
            second.add_many(records)?;
            second.verify().context("second index failed verification")?;
            index.extend_inverse(second.num_terms());
            Some((second, split.clone()))
        }
        None => {
            index.add_many(records)?;
            None
        }
    };

    index.verify().context("index failed verification")?;
    Ok(Built { index, second })
}

fn save(built: &Built, args: &BuildArgs) -> Result<()> {
    if let Some((second, path)) = &built.second {
        save_to_file(second, path).context("unable to serialise index")?;
        tracing::info!(output = %path.display(), documents = second.num_documents(), "wrote second index");
    }
    save_to_file(&built.index, &args.output).context("unable to serialise index")?;
    tracing::info!(output = %args.output.display(), documents = built.index.num_documents(), "index build complete");
    Ok(())
}
