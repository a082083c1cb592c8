mod report;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use textknn::ingest::{collect_files, run_pipeline, ClassFilter};
use textknn::persist::{load_from_file, save_to_file};
use textknn::pool::default_workers;
use textknn::tokenizer::Tokenizer;
use textknn::{DocId, DocumentView, KnnInfo, TotalIndex};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "knn")]
#[command(about = "Perform kNN classification over an index", long_about = None)]
struct Cli {
    /// Number of parallel workers (defaults to the number of CPUs)
    #[arg(long, global = true)]
    workers: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess an index to create a KNN info file
    Preprocess(PreprocessArgs),
    /// Classify every document of a JSON/JSONL file
    Classify(ClassifyArgs),
    /// Perform a test with a split index
    Test(TestArgs),
}

#[derive(Args)]
struct PreprocessArgs {
    /// File with index
    #[arg(long, short = 'i', default_value = "/tmp/index.bin.zst")]
    input: PathBuf,
    /// Preprocessed data
    #[arg(long, short = 'o', default_value = "/tmp/knn.bin.zst")]
    output: PathBuf,
    /// Number of feature terms to select for each class
    #[arg(long, short = 'f', default_value_t = 20)]
    features_per_class: usize,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Preprocessed data
    #[arg(long, short = 'd', default_value = "/tmp/knn.bin.zst")]
    data: PathBuf,
    /// Input documents
    #[arg(long, short = 'i')]
    input: PathBuf,
    /// Number of neighbours to consider for classification
    #[arg(long, short = 'k', default_value_t = 3)]
    k: usize,
    /// Stopwords file
    #[arg(long, short = 's')]
    stopwords: Option<PathBuf>,
    /// Use the inverse-index strategy instead of scanning every document
    #[arg(long, default_value_t = false)]
    inverse: bool,
}

#[derive(Args)]
struct TestArgs {
    /// Training set index
    #[arg(long, default_value = "/tmp/index.bin.zst")]
    training_set: PathBuf,
    /// Test set index
    #[arg(long, default_value = "/tmp/index_test.bin.zst")]
    test_set: PathBuf,
    /// Number of neighbours to consider for classification
    #[arg(long, short = 'k', default_value_t = 3)]
    k: usize,
    /// Number of feature terms to select for each class
    #[arg(long, short = 'f', default_value_t = 20)]
    features_per_class: usize,
    /// Use the inverse-index strategy instead of scanning every document
    #[arg(long, default_value_t = false)]
    inverse: bool,
    /// Run both strategies and fail if they disagree
    #[arg(long, default_value_t = false, conflicts_with = "inverse")]
    cross_check: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let workers = cli.workers.unwrap_or_else(default_workers);

    match cli.command {
        Commands::Preprocess(args) => preprocess(&args, workers),
        Commands::Classify(args) => classify(&args, workers),
        Commands::Test(args) => test(&args, workers),
    }
}

fn preprocess(args: &PreprocessArgs, workers: usize) -> Result<()> {
    let index: TotalIndex = load_from_file(&args.input)?;
    let knn = KnnInfo::preprocess(Arc::new(index), args.features_per_class, workers)?;
    save_to_file(&knn, &args.output)?;
    tracing::info!(output = %args.output.display(), features = knn.features.len(), "wrote knn info");
    Ok(())
}

fn classify(args: &ClassifyArgs, workers: usize) -> Result<()> {
    let knn: KnnInfo = load_from_file(&args.data)?;
    let tokenizer = match &args.stopwords {
        Some(path) => Tokenizer::with_stopwords_file(path)
            .with_context(|| format!("unable to get stopwords from {}", path.display()))?,
        None => Tokenizer::new(),
    };

    let files = collect_files(&args.input);
    if files.is_empty() {
        bail!("no documents found at {}", args.input.display());
    }
    let queries = run_pipeline(files, &tokenizer, ClassFilter::default(), workers, |records| {
        let mut queries = TotalIndex::new_offset(&knn.index);
        queries.add_many(records)?;
        Ok(queries)
    })?;

    for doc in 0..queries.num_documents() as DocId {
        let query = DocumentView::of(&queries, doc);
        let classes = if args.inverse {
            knn.classify_inverse(&query, args.k)
        } else {
            knn.classify_forward(&query, args.k, workers)
        };
        println!(
            "document {}\n  --> {}",
            queries.documents[doc as usize].name,
            knn.index.stringify_classes(&classes).join(", ")
        );
    }
    Ok(())
}

fn test(args: &TestArgs, workers: usize) -> Result<()> {
    let training_set: TotalIndex = load_from_file(&args.training_set)?;
    let test_set: TotalIndex = load_from_file(&args.test_set)?;

    let knn = KnnInfo::preprocess(Arc::new(training_set), args.features_per_class, workers)?;
    let k = args.k;

    let total = report::run_test(&test_set, |query| {
        if args.inverse {
            return Ok(knn.classify_inverse(query, k));
        }
        let forward = knn.classify_forward(query, k, workers);
        if args.cross_check {
            let inverse = knn.classify_inverse(query, k);
            if forward != inverse {
                bail!("forward classifier returned {forward:?}, inverse returned {inverse:?}");
            }
        }
        Ok(forward)
    })?;

    println!("{total}");
    Ok(())
}
