//! Dual-keyed occurrence counts: term -> doc -> count and its transpose.

use crate::{DocId, Term};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

lazy_static! {
    static ref EMPTY: HashMap<String, u32> = HashMap::new();
}

/// Sparse term/document frequency matrix, filled during the build phase.
///
/// Both views always hold the same facts: `term_to_doc_counts[t][d]` exists
/// exactly when `doc_to_term_counts[d][t]` exists, with the same value.
/// A document id is registered on its first ingestion, so documents that
/// produced no tokens still count towards `doc_count` and `document_ids()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingStore {
    term_to_doc_counts: HashMap<Term, HashMap<DocId, u32>>,
    doc_to_term_counts: HashMap<DocId, HashMap<Term, u32>>,
    doc_count: u32,
    total_occurrences: u64,
}

impl PostingStore {
    pub fn new() -> Self { Self::default() }

    /// Record one occurrence of `term` in `doc`.
    pub fn record_occurrence(&mut self, term: &str, doc: &str) {
        self.register(doc);
        self.add_count(term, doc, 1);
    }

    /// Ingest one document's token stream.
    ///
    /// Re-ingesting a known id accumulates its counts; the document counter
    /// only tracks distinct ids.
    pub fn add_document<I, S>(&mut self, doc: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.doc_to_term_counts.contains_key(doc) {
            tracing::warn!(doc, "document id ingested more than once, counts will accumulate");
        }
        self.register(doc);
        for token in tokens {
            self.add_count(token.as_ref(), doc, 1);
        }
    }

    /// Fold another store into this one. Counts are additive, so the merge
    /// order of partial stores does not affect the result.
    pub fn merge(&mut self, other: PostingStore) {
        for (doc, terms) in other.doc_to_term_counts {
            if self.doc_to_term_counts.contains_key(&doc) {
                tracing::warn!(doc = %doc, "document id ingested more than once, counts will accumulate");
            }
            self.register(&doc);
            for (term, count) in terms {
                self.add_count(&term, &doc, count);
            }
        }
    }

    /// Documents containing `term` with their counts. Unseen terms yield an
    /// empty map and are not inserted.
    pub fn postings_for(&self, term: &str) -> &HashMap<DocId, u32> {
        self.term_to_doc_counts.get(term).unwrap_or(&*EMPTY)
    }

    /// Terms of `doc` with their counts, same no-insert contract as `postings_for`.
    pub fn terms_for(&self, doc: &str) -> &HashMap<Term, u32> {
        self.doc_to_term_counts.get(doc).unwrap_or(&*EMPTY)
    }

    pub fn document_count(&self) -> u32 { self.doc_count }

    /// Distinct document ids, in ascending order.
    pub fn document_ids(&self) -> BTreeSet<&DocId> {
        self.doc_to_term_counts.keys().collect()
    }

    /// Number of documents containing `term` at least once.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings_for(term).len()
    }

    /// Total token count of `doc`.
    pub fn document_length(&self, doc: &str) -> u64 {
        self.terms_for(doc).values().map(|&c| c as u64).sum()
    }

    pub fn term_count(&self) -> usize { self.term_to_doc_counts.len() }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.term_to_doc_counts.keys()
    }

    pub fn total_occurrences(&self) -> u64 { self.total_occurrences }

    pub(crate) fn term_postings(&self) -> impl Iterator<Item = (&Term, &HashMap<DocId, u32>)> {
        self.term_to_doc_counts.iter()
    }

    pub(crate) fn doc_terms(&self) -> impl Iterator<Item = (&DocId, &HashMap<Term, u32>)> {
        self.doc_to_term_counts.iter()
    }

    /// Check the dual-view invariant and the counters. Used to reject
    /// corrupt snapshots.
    pub fn is_consistent(&self) -> bool {
        if self.doc_count as usize != self.doc_to_term_counts.len() {
            return false;
        }
        let mut total = 0u64;
        for (term, docs) in &self.term_to_doc_counts {
            for (doc, &count) in docs {
                if count == 0 || self.terms_for(doc).get(term) != Some(&count) {
                    return false;
                }
                total += count as u64;
            }
        }
        let transposed: usize = self.doc_to_term_counts.values().map(|t| t.len()).sum();
        let forward: usize = self.term_to_doc_counts.values().map(|d| d.len()).sum();
        total == self.total_occurrences && transposed == forward
    }

    fn register(&mut self, doc: &str) {
        if !self.doc_to_term_counts.contains_key(doc) {
            self.doc_to_term_counts.insert(doc.to_string(), HashMap::new());
            self.doc_count += 1;
        }
    }

    fn add_count(&mut self, term: &str, doc: &str, count: u32) {
        *self
            .term_to_doc_counts
            .entry(term.to_string())
            .or_default()
            .entry(doc.to_string())
            .or_insert(0) += count;
        *self
            .doc_to_term_counts
            .entry(doc.to_string())
            .or_default()
            .entry(term.to_string())
            .or_insert(0) += count;
        self.total_occurrences += count as u64;
    }
}
