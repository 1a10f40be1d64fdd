use crate::error::{EngineError, Result};
use crate::postings::PostingStore;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub store_id: String,
    pub num_docs: u32,
    pub num_terms: usize,
    pub total_occurrences: u64,
    pub created_at: String,
    pub version: u32,
}

/// Files of one named snapshot under a root directory. The store id is
/// chosen by the caller and is independent of where the documents came from.
pub struct SnapshotPaths {
    pub root: PathBuf,
    pub store_id: String,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P, store_id: &str) -> Self {
        Self { root: root.as_ref().to_path_buf(), store_id: store_id.to_string() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join(format!("{}.postings.bin", self.store_id)) }
    pub fn meta(&self) -> PathBuf { self.root.join(format!("{}.meta.json", self.store_id)) }
}

pub fn save_store(paths: &SnapshotPaths, store: &PostingStore) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.postings())?;
    let bytes = bincode::serialize(store)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_store(paths: &SnapshotPaths) -> Result<PostingStore> {
    let mut f = File::open(paths.postings())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let store = bincode::deserialize(&buf)?;
    Ok(store)
}

pub fn save_meta(paths: &SnapshotPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write the store and its meta file.
pub fn save_snapshot(paths: &SnapshotPaths, store: &PostingStore) -> Result<MetaFile> {
    let meta = MetaFile {
        store_id: paths.store_id.clone(),
        num_docs: store.document_count(),
        num_terms: store.term_count(),
        total_occurrences: store.total_occurrences(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_store(paths, store)?;
    save_meta(paths, &meta)?;
    tracing::info!(store_id = %paths.store_id, num_docs = meta.num_docs, num_terms = meta.num_terms, "snapshot saved");
    Ok(meta)
}

/// Read a snapshot back, rejecting stores that disagree with their meta
/// file or break the dual-index invariant.
pub fn load_snapshot(paths: &SnapshotPaths) -> Result<PostingStore> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(EngineError::Serialization(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            meta.version
        )));
    }
    let store = load_store(paths)?;
    if store.document_count() != meta.num_docs
        || store.term_count() != meta.num_terms
        || store.total_occurrences() != meta.total_occurrences
    {
        return Err(EngineError::Serialization(format!(
            "snapshot '{}' does not match its meta file",
            paths.store_id
        )));
    }
    if !store.is_consistent() {
        return Err(EngineError::Serialization(format!("snapshot '{}' is corrupt", paths.store_id)));
    }
    tracing::info!(store_id = %paths.store_id, num_docs = meta.num_docs, "snapshot loaded");
    Ok(store)
}
