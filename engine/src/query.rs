use crate::Term;
use std::collections::BTreeMap;

/// Term frequencies of a single query, iterated in term order so score
/// accumulation is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVector {
    counts: BTreeMap<Term, u32>,
}

impl QueryVector {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Term>,
    {
        let mut counts: BTreeMap<Term, u32> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.into()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, u32)> {
        self.counts.iter().map(|(t, &c)| (t, c))
    }

    pub fn len(&self) -> usize { self.counts.len() }

    pub fn is_empty(&self) -> bool { self.counts.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_tokens() {
        let q = QueryVector::from_tokens(["dog", "cat", "dog"]);
        let counts: Vec<(&Term, u32)> = q.iter().collect();
        assert_eq!(q.len(), 2);
        assert_eq!(counts, [(&"cat".to_string(), 1), (&"dog".to_string(), 2)]);
    }

    #[test]
    fn empty_query() {
        assert!(QueryVector::from_tokens(Vec::<String>::new()).is_empty());
    }
}
