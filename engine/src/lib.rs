pub mod error;
pub mod index;
pub mod persist;
pub mod postings;
pub mod query;
pub mod similarity;
pub mod tokenizer;
pub mod trec;

pub use error::{EngineError, Result};
pub use index::InvertedIndex;
pub use postings::PostingStore;
pub use query::QueryVector;
pub use similarity::{Bm25Params, SimilarityKind, SimilarityModel};
pub use tokenizer::{Preprocess, Preprocessor};

/// Normalized token as produced by the preprocessing pipeline.
pub type Term = String;
/// External document identifier, e.g. the source file name.
pub type DocId = String;
