use anyhow::{bail, Context, Result};
use engine::persist::{save_snapshot, MetaFile, SnapshotPaths};
use engine::{InvertedIndex, Preprocess};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Read every regular file below `input` as `(file name, text)`, sorted by path.
/// A single file is accepted as a one-document collection.
pub fn collect_documents(input: &Path) -> Result<Vec<(String, String)>> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }

    let mut docs = Vec::with_capacity(files.len());
    for path in files {
        let id = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name.to_string(),
            None => {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
                continue;
            }
        };
        let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        docs.push((id, text));
    }
    Ok(docs)
}

/// Ingest a directory into a fresh index.
pub fn index_directory<P: Preprocess>(input: &Path, preprocessor: P) -> Result<InvertedIndex<P>> {
    let docs = collect_documents(input)?;
    tracing::info!(input = %input.display(), files = docs.len(), "indexing directory");
    let mut index = InvertedIndex::new(preprocessor);
    index.index_documents(&docs)?;
    Ok(index)
}

/// Ingest a directory and write it as snapshot `store_id` under `output`.
pub fn build_snapshot<P: Preprocess>(input: &Path, output: &Path, store_id: &str, preprocessor: P) -> Result<MetaFile> {
    let index = index_directory(input, preprocessor)?;
    let meta = save_snapshot(&SnapshotPaths::new(output, store_id), index.store())?;
    Ok(meta)
}
