use crate::analyzer::Analyzer;
use crate::error::{Error, Result};
use crate::{Document, DocumentId, Term};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Per-document occurrence counts for one term.
pub type Postings = HashMap<DocumentId, u32>;

/// Term -> (document -> occurrence count). Remembers the order in which terms
/// were first seen; that order survives serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    order: Vec<Term>,
    postings: HashMap<Term, Postings>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn get(&self, term: &str) -> Option<&Postings> { self.postings.get(term) }

    pub fn contains(&self, term: &str) -> bool { self.postings.contains_key(term) }

    /// Number of distinct documents holding `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, HashMap::len)
    }

    /// Terms with their postings, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&Term, &Postings)> + '_ {
        self.order.iter().map(move |t| (t, &self.postings[t]))
    }

    /// Total number of (term, document) increments recorded.
    pub fn total_occurrences(&self) -> u64 {
        self.postings.values().flat_map(HashMap::values).map(|&c| c as u64).sum()
    }

    fn increment(&mut self, term: Term, doc_id: &str) {
        if !self.postings.contains_key(&term) {
            self.order.push(term.clone());
        }
        let postings = self.postings.entry(term).or_default();
        match postings.get_mut(doc_id) {
            Some(count) => *count += 1,
            None => {
                postings.insert(doc_id.to_string(), 1);
            }
        }
    }

    fn insert_postings(&mut self, term: Term, postings: Postings) -> bool {
        if self.postings.contains_key(&term) {
            return false;
        }
        self.order.push(term.clone());
        self.postings.insert(term, postings);
        true
    }
}

impl Serialize for InvertedIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (term, postings) in self.iter() {
            map.serialize_entry(term, postings)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for InvertedIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct IndexVisitor;

        impl<'de> Visitor<'de> for IndexVisitor {
            type Value = InvertedIndex;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of term to document counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut index = InvertedIndex::new();
                while let Some((term, postings)) = access.next_entry::<Term, Postings>()? {
                    if !index.insert_postings(term.clone(), postings) {
                        return Err(serde::de::Error::custom(format!("duplicate term `{term}`")));
                    }
                }
                Ok(index)
            }
        }

        deserializer.deserialize_map(IndexVisitor)
    }
}

/// Document -> `L - n`, where `L` is the token count. Zero or negative values
/// mean the document produced no n-grams; the entry is still kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCountTable(HashMap<DocumentId, i64>);

impl TokenCountTable {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, doc_id: &str) -> Option<i64> { self.0.get(doc_id).copied() }

    pub fn contains(&self, doc_id: &str) -> bool { self.0.contains_key(doc_id) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, i64)> + '_ {
        self.0.iter().map(|(d, &c)| (d, c))
    }

    /// Actual number of n-gram positions for the document (`L - n + 1`, floored at 0).
    pub fn ngram_positions(&self, doc_id: &str) -> u64 {
        self.get(doc_id).map_or(0, |c| (c + 1).max(0) as u64)
    }

    pub fn total_ngram_positions(&self) -> u64 {
        self.0.values().map(|&c| (c + 1).max(0) as u64).sum()
    }

    pub fn insert(&mut self, doc_id: DocumentId, count: i64) {
        self.0.insert(doc_id, count);
    }
}

/// Consecutive `n`-token windows joined by single spaces. Yields nothing when
/// there are fewer than `n` tokens.
pub fn ngrams(tokens: &[String], n: usize) -> impl Iterator<Item = Term> + '_ {
    tokens.windows(n.max(1)).map(|w| w.join(" "))
}

/// Accumulates an inverted index for a single build. The builder owns its maps
/// until `finish` hands them over.
#[derive(Debug)]
pub struct IndexBuilder {
    n: usize,
    index: InvertedIndex,
    token_counts: TokenCountTable,
}

impl IndexBuilder {
    pub fn new(n: usize) -> Result<Self> {
        if n < 1 {
            return Err(Error::config(format!("ngrams must be at least 1, got {n}")));
        }
        Ok(Self { n, index: InvertedIndex::new(), token_counts: TokenCountTable::new() })
    }

    pub fn n(&self) -> usize { self.n }

    /// Count every n-gram of `tokens` for `doc_id`. Returns the number of
    /// increments made (`L - n + 1`, or 0 when `L < n`).
    pub fn add_document(&mut self, doc_id: &str, tokens: &[String]) -> usize {
        let mut added = 0;
        for term in ngrams(tokens, self.n) {
            self.index.increment(term, doc_id);
            added += 1;
        }
        self.token_counts.insert(doc_id.to_string(), tokens.len() as i64 - self.n as i64);
        if added == 0 {
            tracing::debug!(doc_id, tokens = tokens.len(), n = self.n, "document too short for any n-gram");
        }
        added
    }

    pub fn finish(self) -> (InvertedIndex, TokenCountTable) {
        tracing::info!(terms = self.index.len(), docs = self.token_counts.len(), n = self.n, "index built");
        (self.index, self.token_counts)
    }
}

/// Build an index from already tokenized documents, in the given order.
pub fn build(documents: &[Document], n: usize) -> Result<(InvertedIndex, TokenCountTable)> {
    let mut builder = IndexBuilder::new(n)?;
    for doc in documents {
        builder.add_document(&doc.id, &doc.tokens);
    }
    Ok(builder.finish())
}

/// An index loaded for querying, together with the analyzer it was built with.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub index: InvertedIndex,
    pub token_counts: TokenCountTable,
    pub analyzer: Analyzer,
}

impl IndexSnapshot {
    pub fn new(index: InvertedIndex, token_counts: TokenCountTable, analyzer: Analyzer) -> Self {
        Self { index, token_counts, analyzer }
    }

    pub fn num_docs(&self) -> usize { self.token_counts.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn doc(id: &str, text: &str) -> Document {
        Document { tokens: tokenize(text), ..Document::new(id, text) }
    }

    #[test]
    fn unigram_scenario() {
        let docs = vec![doc("A", "the cat sat"), doc("B", "the cat ran")];
        let (index, counts) = build(&docs, 1).unwrap();
        let cat = index.get("cat").unwrap();
        assert_eq!(cat.get("A"), Some(&1));
        assert_eq!(cat.get("B"), Some(&1));
        assert_eq!(index.get("sat").unwrap().len(), 1);
        assert_eq!(index.get("ran").unwrap().get("B"), Some(&1));
        assert_eq!(index.document_frequency("cat"), 2);
        assert_eq!(counts.get("A"), Some(2));
    }

    #[test]
    fn bigram_scenario() {
        let (index, counts) = build(&[doc("d", "the cat sat")], 2).unwrap();
        let terms: Vec<&Term> = index.iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["the cat", "cat sat"]);
        assert_eq!(counts.get("d"), Some(1));
        assert_eq!(counts.ngram_positions("d"), 2);
    }

    #[test]
    fn short_documents_keep_their_sentinel() {
        let mut b = IndexBuilder::new(3).unwrap();
        assert_eq!(b.add_document("short", &tokenize("one two")), 0);
        assert_eq!(b.add_document("empty", &[]), 0);
        let (index, counts) = b.finish();
        assert!(index.is_empty());
        assert_eq!(counts.get("short"), Some(-1));
        assert_eq!(counts.get("empty"), Some(-3));
        assert_eq!(counts.ngram_positions("empty"), 0);
    }

    #[test]
    fn repeated_terms_accumulate() {
        let (index, _) = build(&[doc("d", "a b a b a")], 1).unwrap();
        assert_eq!(index.get("a").unwrap()["d"], 3);
        assert_eq!(index.total_occurrences(), 5);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(IndexBuilder::new(0), Err(Error::Config(_))));
    }

    #[test]
    fn json_keeps_discovery_order() {
        let (index, _) = build(&[doc("d", "zeta alpha mid")], 1).unwrap();
        let json = serde_json::to_string(&index).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
        let back: InvertedIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }
}
