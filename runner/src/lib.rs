use anyhow::{bail, Result};
use engine::persist::{load_snapshot, save_snapshot, SnapshotPaths};
use engine::trec::{write_run, Topic};
use engine::{Bm25Params, DocId, EngineError, InvertedIndex, Preprocess, SimilarityKind, SimilarityModel};
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Where the posting store comes from.
pub struct IndexSource {
    pub index_dir: PathBuf,
    pub store_id: String,
    /// Document collection indexed when `rebuild` is set.
    pub documents: Option<PathBuf>,
    pub rebuild: bool,
}

/// Load the named snapshot, or with `rebuild` set, index the document
/// collection and overwrite the snapshot with it.
///
/// Without `rebuild` a missing, partial or corrupt snapshot is an error;
/// the documents are never indexed as a fallback.
pub fn open_index<P: Preprocess>(source: &IndexSource, preprocessor: P) -> Result<InvertedIndex<P>> {
    let paths = SnapshotPaths::new(&source.index_dir, &source.store_id);
    if source.rebuild {
        let Some(documents) = &source.documents else {
            bail!("--rebuild needs a --documents directory");
        };
        let index = indexer::index_directory(documents, preprocessor)?;
        save_snapshot(&paths, index.store())?;
        return Ok(index);
    }

    match (paths.postings().is_file(), paths.meta().is_file()) {
        (true, true) => {}
        (false, false) => {
            tracing::warn!(
                store_id = %source.store_id,
                index = %source.index_dir.display(),
                "snapshot not found, pass --rebuild with --documents to create it"
            );
        }
        (postings, _) => {
            let missing = if postings { paths.meta() } else { paths.postings() };
            return Err(EngineError::Serialization(format!(
                "snapshot '{}' is incomplete, {} is missing",
                source.store_id,
                missing.display()
            ))
            .into());
        }
    }
    let store = load_snapshot(&paths)?;
    Ok(InvertedIndex::from_store(preprocessor, store))
}

pub fn similarity_model(kind: SimilarityKind, bm25: Bm25Params) -> SimilarityModel {
    match kind {
        SimilarityKind::Bm25 => SimilarityModel::bm25(bm25),
        other => SimilarityModel::new(other),
    }
}

/// Run every topic against a ready index and write the ranked lists in
/// topic order. Returns the number of lines written.
pub fn run_topics<P: Preprocess, W: Write>(
    index: &InvertedIndex<P>,
    topics: &[Topic],
    max_results: i64,
    tag: &str,
    out: &mut W,
) -> Result<usize> {
    let results: Vec<Vec<(DocId, f64)>> = topics
        .par_iter()
        .map(|topic| index.run_query(&topic.text, max_results))
        .collect::<engine::Result<_>>()?;
    let mut lines = 0;
    for (topic, ranked) in topics.iter().zip(&results) {
        write_run(out, &topic.id, ranked, tag)?;
        lines += ranked.len();
    }
    out.flush()?;
    Ok(lines)
}
