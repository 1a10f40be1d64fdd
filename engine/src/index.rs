//! Build phase and query phase around one [`PostingStore`].

use crate::error::{EngineError, Result};
use crate::postings::PostingStore;
use crate::query::QueryVector;
use crate::similarity::SimilarityModel;
use crate::tokenizer::Preprocess;
use crate::DocId;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Inverted index with an optional attached similarity model.
///
/// While no model is attached documents may be added. Attaching prepares the
/// model and freezes the store: further ingestion fails until [`detach`]
/// is called. Queries take `&self`, so a ready index can be shared between
/// threads.
///
/// [`detach`]: InvertedIndex::detach
#[derive(Debug)]
pub struct InvertedIndex<P> {
    preprocessor: P,
    store: PostingStore,
    model: Option<SimilarityModel>,
}

impl<P: Preprocess> InvertedIndex<P> {
    pub fn new(preprocessor: P) -> Self {
        Self::from_store(preprocessor, PostingStore::new())
    }

    /// Wrap a store loaded from a snapshot.
    pub fn from_store(preprocessor: P, store: PostingStore) -> Self {
        Self { preprocessor, store, model: None }
    }

    pub fn store(&self) -> &PostingStore { &self.store }

    pub fn index_document(&mut self, doc: &str, text: &str) -> Result<()> {
        self.ensure_building()?;
        let tokens = self.preprocessor.preprocess(text);
        self.store.add_document(doc, tokens);
        Ok(())
    }

    /// Preprocess `docs` in parallel, one partial store per document, then
    /// merge them into the index in input order.
    pub fn index_documents<D, T>(&mut self, docs: &[(D, T)]) -> Result<()>
    where
        D: AsRef<str> + Sync,
        T: AsRef<str> + Sync,
    {
        self.ensure_building()?;
        let preprocessor = &self.preprocessor;
        let partials: Vec<PostingStore> = docs
            .par_iter()
            .map(|(doc, text)| {
                let mut partial = PostingStore::new();
                partial.add_document(doc.as_ref(), preprocessor.preprocess(text.as_ref()));
                partial
            })
            .collect();
        for partial in partials {
            self.store.merge(partial);
        }
        tracing::info!(
            batch = docs.len(),
            num_docs = self.store.document_count(),
            num_terms = self.store.term_count(),
            "ingested documents"
        );
        Ok(())
    }

    /// Prepare `model` against the current store and make it the active
    /// similarity. Replaces a previously attached model.
    pub fn attach(&mut self, mut model: SimilarityModel) -> Result<()> {
        model.precompute(&self.store)?;
        tracing::info!(kind = %model.kind(), num_docs = self.store.document_count(), "similarity attached");
        self.model = Some(model);
        Ok(())
    }

    /// Drop the active model and return to the build phase.
    pub fn detach(&mut self) -> Option<SimilarityModel> {
        self.model.take()
    }

    /// Rank documents against `query`, best first, ties by ascending id.
    ///
    /// `max_results == 0` yields no results; a negative value is rejected.
    pub fn run_query(&self, query: &str, max_results: i64) -> Result<Vec<(DocId, f64)>> {
        if max_results < 0 {
            return Err(EngineError::Validation(format!("max_results must be non-negative, got {max_results}")));
        }
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EngineError::IndexState("no similarity model attached".into()))?;
        let vector = QueryVector::from_tokens(self.preprocessor.preprocess(query));
        let scores = model.score(&vector, &self.store)?;
        let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(usize::try_from(max_results).unwrap_or(usize::MAX));
        Ok(ranked)
    }

    fn ensure_building(&self) -> Result<()> {
        match &self.model {
            Some(model) => Err(EngineError::IndexState(format!(
                "index is frozen by the attached {} model, detach it before adding documents",
                model.kind()
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityKind;

    fn split(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn built() -> InvertedIndex<fn(&str) -> Vec<String>> {
        let mut index = InvertedIndex::new(split as fn(&str) -> Vec<String>);
        index.index_document("d1", "cat dog dog").unwrap();
        index.index_document("d2", "dog bird").unwrap();
        index.index_document("d3", "cat cat bird").unwrap();
        index
    }

    #[test]
    fn ranks_worked_example() {
        for kind in [SimilarityKind::Tf, SimilarityKind::TfIdf, SimilarityKind::Bm25] {
            let mut index = built();
            index.attach(SimilarityModel::new(kind)).unwrap();
            let ranked = index.run_query("dog cat", 10).unwrap();
            let ids: Vec<&str> = ranked.iter().map(|(d, _)| d.as_str()).collect();
            assert_eq!(ids, ["d1", "d3", "d2"], "{kind}");
        }
    }

    #[test]
    fn ties_break_by_document_id() {
        let mut index = InvertedIndex::new(split as fn(&str) -> Vec<String>);
        index.index_document("b", "x y").unwrap();
        index.index_document("c", "x y").unwrap();
        index.index_document("a", "x y").unwrap();
        index.index_document("z", "q").unwrap();
        index.attach(SimilarityModel::new(SimilarityKind::Tf)).unwrap();
        let first = index.run_query("x", 10).unwrap();
        let ids: Vec<&str> = first.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(first, index.run_query("x", 10).unwrap());
    }

    #[test]
    fn max_results_semantics() {
        let mut index = built();
        index.attach(SimilarityModel::new(SimilarityKind::Bm25)).unwrap();
        assert!(index.run_query("dog cat", 0).unwrap().is_empty());
        assert_eq!(index.run_query("dog cat", 2).unwrap().len(), 2);
        assert_eq!(index.run_query("dog cat", 50).unwrap().len(), 3);
        let err = index.run_query("dog cat", -1).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        // a rejected query leaves the index usable
        assert_eq!(index.run_query("dog", 10).unwrap().len(), 2);
    }

    #[test]
    fn query_without_model_fails() {
        let index = built();
        assert!(matches!(index.run_query("dog", 5), Err(EngineError::IndexState(_))));
    }

    #[test]
    fn attached_index_rejects_ingestion() {
        let mut index = built();
        index.attach(SimilarityModel::new(SimilarityKind::Tf)).unwrap();
        let err = index.index_document("d4", "fish").unwrap_err();
        assert!(matches!(err, EngineError::IndexState(_)));
        assert!(index.index_documents(&[("d4", "fish")]).is_err());

        index.detach();
        index.index_document("d4", "fish").unwrap();
        index.attach(SimilarityModel::new(SimilarityKind::Tf)).unwrap();
        assert_eq!(index.run_query("fish", 10).unwrap()[0].0, "d4");
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let docs = [("d1", "cat dog dog"), ("d2", "dog bird"), ("d3", "cat cat bird")];
        let mut parallel = InvertedIndex::new(split as fn(&str) -> Vec<String>);
        parallel.index_documents(&docs).unwrap();
        assert_eq!(parallel.store(), built().store());
    }

    #[test]
    fn unknown_terms_score_nothing() {
        let mut index = built();
        index.attach(SimilarityModel::new(SimilarityKind::TfIdf)).unwrap();
        assert!(index.run_query("unicorn", 10).unwrap().is_empty());
        assert!(index.store().postings_for("unicorn").is_empty());
    }
}
