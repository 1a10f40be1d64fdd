use anyhow::Result;
use clap::{Parser, Subcommand};
use engine::tokenizer::{Preprocessor, DEFAULT_STEM_CACHE_CAPACITY};
use indexer::build_snapshot;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build term-frequency index snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from every file below a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output snapshot directory
        #[arg(long, default_value = "./index")]
        output: PathBuf,
        /// Snapshot name inside the output directory
        #[arg(long)]
        store_id: String,
        /// Number of memoized stems
        #[arg(long, default_value_t = DEFAULT_STEM_CACHE_CAPACITY)]
        stem_cache: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, store_id, stem_cache } => {
            let meta = build_snapshot(&input, &output, &store_id, Preprocessor::with_cache_capacity(stem_cache))?;
            tracing::info!(output = %output.display(), store_id = %store_id, num_docs = meta.num_docs, "index build complete");
            Ok(())
        }
    }
}
