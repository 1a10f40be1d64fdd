use anyhow::Result;
use clap::Parser;
use engine::tokenizer::{Preprocessor, DEFAULT_STEM_CACHE_CAPACITY};
use engine::trec::{read_topics, DEFAULT_RUN_TAG};
use engine::{Bm25Params, SimilarityKind};
use runner::{open_index, run_topics, similarity_model, IndexSource};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "runner")]
#[command(about = "Run a topics file against an index and write a TREC run file")]
struct Args {
    /// Snapshot directory
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Snapshot name inside the snapshot directory
    #[arg(long)]
    store_id: String,
    /// Document collection, indexed when --rebuild is set
    #[arg(long)]
    documents: Option<PathBuf>,
    /// Index the documents and overwrite the snapshot
    #[arg(long, default_value_t = false)]
    rebuild: bool,
    /// Topics file, one `<query_id> <query text>` per line
    #[arg(long)]
    topics: PathBuf,
    /// Output run file
    #[arg(long, default_value = "./runs/retrieved.runs")]
    output: PathBuf,
    /// Similarity model: TF, TFIDF or BM25
    #[arg(long, default_value = "BM25")]
    sim: SimilarityKind,
    /// Results kept per query
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    max_results: i64,
    /// Run tag written in the last column
    #[arg(long, default_value = DEFAULT_RUN_TAG)]
    tag: String,
    /// BM25 term frequency saturation
    #[arg(long, default_value_t = 2.0)]
    k1: f64,
    /// BM25 document length normalization
    #[arg(long, default_value_t = 0.75)]
    b: f64,
    /// Number of memoized stems
    #[arg(long, default_value_t = DEFAULT_STEM_CACHE_CAPACITY)]
    stem_cache: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let bm25 = Bm25Params::new(args.k1, args.b)?;

    let source = IndexSource {
        index_dir: args.index.clone(),
        store_id: args.store_id.clone(),
        documents: args.documents.clone(),
        rebuild: args.rebuild,
    };
    let mut index = open_index(&source, Preprocessor::with_cache_capacity(args.stem_cache))?;
    index.attach(similarity_model(args.sim, bm25))?;
    tracing::info!(sim = %args.sim, k1 = bm25.k1(), b = bm25.b(), num_docs = index.store().document_count(), "index ready");

    let topics = read_topics(BufReader::new(File::open(&args.topics)?))?;
    if let Some(dir) = args.output.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(&args.output)?);
    let lines = run_topics(&index, &topics, args.max_results, &args.tag, &mut out)?;
    tracing::info!(topics = topics.len(), lines, output = %args.output.display(), "run file written");
    Ok(())
}
