//! Relevance models: TF cosine, TF-IDF cosine and BM25.
//!
//! A model is created unattached, prepared once against a finished
//! [`PostingStore`] and can then score any number of queries. Scores only
//! contain documents sharing at least one term with the query; a missing
//! document has score 0.

use crate::error::{EngineError, Result};
use crate::postings::PostingStore;
use crate::query::QueryVector;
use crate::DocId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityKind {
    Tf,
    TfIdf,
    Bm25,
}

impl FromStr for SimilarityKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TF" => Ok(SimilarityKind::Tf),
            "TFIDF" => Ok(SimilarityKind::TfIdf),
            "BM25" => Ok(SimilarityKind::Bm25),
            _ => Err(EngineError::Configuration(format!(
                "unknown similarity '{s}', expected one of TF, TFIDF, BM25"
            ))),
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimilarityKind::Tf => "TF",
            SimilarityKind::TfIdf => "TFIDF",
            SimilarityKind::Bm25 => "BM25",
        };
        f.write_str(name)
    }
}

/// BM25 saturation (`k1`) and length normalization (`b`) parameters.
/// Only constructed through [`Bm25Params::new`] or `Default`, so `k1 >= 0`
/// and `0 <= b <= 1` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    k1: f64,
    b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 2.0, b: 0.75 } }
}

impl Bm25Params {
    pub fn new(k1: f64, b: f64) -> Result<Self> {
        if !k1.is_finite() || k1 < 0.0 {
            return Err(EngineError::Configuration(format!("bm25 k1 must be a non-negative number, got {k1}")));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(EngineError::Configuration(format!("bm25 b must be within [0, 1], got {b}")));
        }
        Ok(Self { k1, b })
    }

    pub fn k1(&self) -> f64 { self.k1 }

    pub fn b(&self) -> f64 { self.b }
}

/// Counters of the store a model was prepared against. Scoring a store
/// whose counters moved on would read stale statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    doc_count: u32,
    total_occurrences: u64,
}

impl Fingerprint {
    fn of(store: &PostingStore) -> Self {
        Self { doc_count: store.document_count(), total_occurrences: store.total_occurrences() }
    }
}

#[derive(Debug, Clone)]
enum Prepared {
    Tf { doc_norm: HashMap<DocId, f64> },
    TfIdf { doc_norm: HashMap<DocId, f64> },
    Bm25 { params: Bm25Params, doc_length: HashMap<DocId, u64>, avg_doc_length: f64 },
}

#[derive(Debug, Clone)]
enum State {
    Unattached,
    Ready { prepared: Prepared, fingerprint: Fingerprint },
}

#[derive(Debug, Clone)]
pub struct SimilarityModel {
    kind: SimilarityKind,
    bm25: Bm25Params,
    state: State,
}

impl SimilarityModel {
    pub fn new(kind: SimilarityKind) -> Self {
        Self { kind, bm25: Bm25Params::default(), state: State::Unattached }
    }

    pub fn bm25(params: Bm25Params) -> Self {
        Self { kind: SimilarityKind::Bm25, bm25: params, state: State::Unattached }
    }

    pub fn kind(&self) -> SimilarityKind { self.kind }

    pub fn is_ready(&self) -> bool { matches!(self.state, State::Ready { .. }) }

    /// One pass over the store computing the per-document statistics of
    /// this model. Allowed once per instance.
    pub fn precompute(&mut self, store: &PostingStore) -> Result<()> {
        if self.is_ready() {
            return Err(EngineError::IndexState(format!(
                "{} model already prepared, create a fresh model to re-attach",
                self.kind
            )));
        }
        let prepared = match self.kind {
            SimilarityKind::Tf => Prepared::Tf { doc_norm: tf_norms(store) },
            SimilarityKind::TfIdf => Prepared::TfIdf { doc_norm: tfidf_norms(store) },
            SimilarityKind::Bm25 => {
                let (doc_length, avg_doc_length) = doc_lengths(store);
                Prepared::Bm25 { params: self.bm25, doc_length, avg_doc_length }
            }
        };
        tracing::debug!(kind = %self.kind, docs = store.document_count(), "similarity statistics ready");
        self.state = State::Ready { prepared, fingerprint: Fingerprint::of(store) };
        Ok(())
    }

    pub fn score(&self, query: &QueryVector, store: &PostingStore) -> Result<HashMap<DocId, f64>> {
        let (prepared, fingerprint) = match &self.state {
            State::Unattached => {
                return Err(EngineError::IndexState(format!("{} model has not been prepared", self.kind)))
            }
            State::Ready { prepared, fingerprint } => (prepared, fingerprint),
        };
        if *fingerprint != Fingerprint::of(store) {
            return Err(EngineError::IndexState(
                "posting store changed since the similarity model was prepared".into(),
            ));
        }
        let scores = match prepared {
            Prepared::Tf { doc_norm } => score_tf(query, store, doc_norm),
            Prepared::TfIdf { doc_norm } => score_tfidf(query, store, doc_norm),
            Prepared::Bm25 { params, doc_length, avg_doc_length } => {
                score_bm25(query, store, params, doc_length, *avg_doc_length)
            }
        };
        Ok(scores)
    }
}

/// `ln(N / df)`, no smoothing. Only called for terms with a non-empty posting list.
fn idf(store: &PostingStore, df: usize) -> f64 {
    (store.document_count() as f64 / df as f64).ln()
}

fn tf_norms(store: &PostingStore) -> HashMap<DocId, f64> {
    store
        .doc_terms()
        .map(|(doc, terms)| {
            let sum: f64 = terms.values().map(|&c| (c as f64) * (c as f64)).sum();
            (doc.clone(), sum.sqrt())
        })
        .collect()
}

// Each posting contributes (count * idf(term))^2 to its document.
fn tfidf_norms(store: &PostingStore) -> HashMap<DocId, f64> {
    let mut norms: HashMap<DocId, f64> = HashMap::new();
    for (_term, docs) in store.term_postings() {
        let idf = idf(store, docs.len());
        for (doc, &count) in docs {
            let w = count as f64 * idf;
            *norms.entry(doc.clone()).or_insert(0.0) += w * w;
        }
    }
    for norm in norms.values_mut() {
        *norm = norm.sqrt();
    }
    norms
}

fn doc_lengths(store: &PostingStore) -> (HashMap<DocId, u64>, f64) {
    let doc_length: HashMap<DocId, u64> = store
        .doc_terms()
        .map(|(doc, terms)| (doc.clone(), terms.values().map(|&c| c as u64).sum()))
        .collect();
    let total: u64 = doc_length.values().sum();
    let avg = if doc_length.is_empty() { 0.0 } else { total as f64 / doc_length.len() as f64 };
    (doc_length, avg)
}

fn score_tf(query: &QueryVector, store: &PostingStore, doc_norm: &HashMap<DocId, f64>) -> HashMap<DocId, f64> {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for (term, qf) in query.iter() {
        for (doc, &tf) in store.postings_for(term) {
            let norm = doc_norm.get(doc).copied().unwrap_or(0.0);
            let contrib = if norm == 0.0 { 0.0 } else { qf as f64 * tf as f64 / norm };
            *scores.entry(doc.clone()).or_insert(0.0) += contrib;
        }
    }
    scores
}

fn score_tfidf(query: &QueryVector, store: &PostingStore, doc_norm: &HashMap<DocId, f64>) -> HashMap<DocId, f64> {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for (term, qf) in query.iter() {
        let postings = store.postings_for(term);
        if postings.is_empty() { continue; }
        let idf = idf(store, postings.len());
        for (doc, &tf) in postings {
            let norm = doc_norm.get(doc).copied().unwrap_or(0.0);
            let contrib = if norm == 0.0 { 0.0 } else { qf as f64 * idf * idf * tf as f64 / norm };
            *scores.entry(doc.clone()).or_insert(0.0) += contrib;
        }
    }
    scores
}

fn score_bm25(
    query: &QueryVector,
    store: &PostingStore,
    params: &Bm25Params,
    doc_length: &HashMap<DocId, u64>,
    avg_doc_length: f64,
) -> HashMap<DocId, f64> {
    let Bm25Params { k1, b } = *params;
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for (term, _qf) in query.iter() {
        let postings = store.postings_for(term);
        if postings.is_empty() { continue; }
        let idf = idf(store, postings.len());
        for (doc, &tf) in postings {
            let tf = tf as f64;
            let dl = doc_length.get(doc).copied().unwrap_or(0) as f64;
            let contrib = idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * dl / avg_doc_length));
            *scores.entry(doc.clone()).or_insert(0.0) += contrib;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn worked_example() -> PostingStore {
        let mut store = PostingStore::new();
        store.add_document("d1", ["cat", "dog", "dog"]);
        store.add_document("d2", ["dog", "bird"]);
        store.add_document("d3", ["cat", "cat", "bird"]);
        store
    }

    fn scores(kind: SimilarityKind) -> HashMap<DocId, f64> {
        let store = worked_example();
        let mut model = SimilarityModel::new(kind);
        model.precompute(&store).unwrap();
        model.score(&QueryVector::from_tokens(["dog", "cat"]), &store).unwrap()
    }

    #[test]
    fn parses_names() {
        assert_eq!("tf".parse::<SimilarityKind>().unwrap(), SimilarityKind::Tf);
        assert_eq!("TFIDF".parse::<SimilarityKind>().unwrap(), SimilarityKind::TfIdf);
        assert_eq!("Bm25".parse::<SimilarityKind>().unwrap(), SimilarityKind::Bm25);
        assert!(matches!("cosine".parse::<SimilarityKind>(), Err(EngineError::Configuration(_))));
        assert_eq!(SimilarityKind::TfIdf.to_string(), "TFIDF");
    }

    #[test]
    fn tf_cosine_worked_example() {
        let s = scores(SimilarityKind::Tf);
        assert!((s["d1"] - 3.0 / 5f64.sqrt()).abs() < EPS);
        assert!((s["d1"] - 1.3416407864998738).abs() < EPS);
        assert!((s["d2"] - 1.0 / 2f64.sqrt()).abs() < EPS);
        assert!((s["d3"] - 2.0 / 5f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn tfidf_cosine_worked_example() {
        let s = scores(SimilarityKind::TfIdf);
        assert!((s["d1"] - 0.543988526540494).abs() < EPS);
        assert!((s["d2"] - 0.2867071274778196).abs() < EPS);
        assert!((s["d3"] - 0.36265901769366266).abs() < EPS);
    }

    #[test]
    fn bm25_worked_example() {
        let s = scores(SimilarityKind::Bm25);
        assert!((s["d1"] - 0.9625791504165729).abs() < EPS);
        assert!((s["d2"] - 0.4633886949807593).abs() < EPS);
        assert!((s["d3"] - 0.5809649310206535).abs() < EPS);
    }

    #[test]
    fn non_overlapping_documents_are_absent() {
        let mut store = worked_example();
        store.add_document("d4", ["fish"]);
        let mut model = SimilarityModel::new(SimilarityKind::Tf);
        model.precompute(&store).unwrap();
        let s = model.score(&QueryVector::from_tokens(["dog"]), &store).unwrap();
        assert_eq!(s.len(), 2);
        assert!(!s.contains_key("d3"));
        assert!(!s.contains_key("d4"));
    }

    #[test]
    fn tfidf_zero_norm_contributes_nothing() {
        // "x" occurs everywhere, so its idf and every norm are 0.
        let mut store = PostingStore::new();
        store.add_document("a", ["x"]);
        store.add_document("b", ["x", "x"]);
        let mut model = SimilarityModel::new(SimilarityKind::TfIdf);
        model.precompute(&store).unwrap();
        let s = model.score(&QueryVector::from_tokens(["x"]), &store).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.values().all(|&v| v == 0.0));
    }

    #[test]
    fn bm25_params_are_configurable() {
        let store = worked_example();
        let q = QueryVector::from_tokens(["dog"]);
        let mut default = SimilarityModel::new(SimilarityKind::Bm25);
        default.precompute(&store).unwrap();
        let mut flat = SimilarityModel::bm25(Bm25Params::new(1.2, 0.0).unwrap());
        flat.precompute(&store).unwrap();
        let a = default.score(&q, &store).unwrap();
        let b = flat.score(&q, &store).unwrap();
        // b = 0 removes length normalization: idf * tf * 2.2 / (tf + 1.2)
        let idf = 1.5f64.ln();
        assert!((b["d1"] - idf * 2.0 * 2.2 / 3.2).abs() < EPS);
        assert!((a["d1"] - b["d1"]).abs() > EPS);
        assert!(Bm25Params::new(-1.0, 0.5).is_err());
        assert!(Bm25Params::new(1.0, 1.5).is_err());
    }

    #[test]
    fn bm25_params_reject_degenerate_values() {
        assert!(matches!(Bm25Params::new(-1.0, 0.0), Err(EngineError::Configuration(_))));
        assert!(Bm25Params::new(f64::NAN, 0.5).is_err());
        assert!(Bm25Params::new(f64::INFINITY, 0.5).is_err());
        assert!(Bm25Params::new(1.2, f64::NAN).is_err());

        let params = Bm25Params::new(0.0, 1.0).unwrap();
        assert_eq!((params.k1(), params.b()), (0.0, 1.0));
        let store = worked_example();
        let mut model = SimilarityModel::bm25(params);
        model.precompute(&store).unwrap();
        let s = model.score(&QueryVector::from_tokens(["dog", "cat", "bird"]), &store).unwrap();
        assert!(s.values().all(|v| v.is_finite()));
    }

    #[test]
    fn unattached_model_refuses_to_score() {
        let store = worked_example();
        let model = SimilarityModel::new(SimilarityKind::Tf);
        assert!(!model.is_ready());
        let err = model.score(&QueryVector::from_tokens(["dog"]), &store).unwrap_err();
        assert!(matches!(err, EngineError::IndexState(_)));
    }

    #[test]
    fn precompute_runs_once() {
        let store = worked_example();
        let mut model = SimilarityModel::new(SimilarityKind::TfIdf);
        model.precompute(&store).unwrap();
        assert!(matches!(model.precompute(&store), Err(EngineError::IndexState(_))));
        assert!(model.is_ready());
    }

    #[test]
    fn stale_statistics_are_rejected() {
        let mut store = worked_example();
        let mut model = SimilarityModel::new(SimilarityKind::Bm25);
        model.precompute(&store).unwrap();
        store.record_occurrence("dog", "d3");
        let err = model.score(&QueryVector::from_tokens(["dog"]), &store).unwrap_err();
        assert!(matches!(err, EngineError::IndexState(_)));
    }
}
