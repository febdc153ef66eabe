//! Frequency tables derived from a built index.

use crate::index::InvertedIndex;
use crate::Term;
use std::collections::BTreeSet;

/// Term -> total occurrences, most frequent first. Ties keep discovery order.
pub type TermFrequencyTable = Vec<(Term, u64)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFrequencyRow {
    pub term: Term,
    /// Sorted document ids joined by `", "`.
    pub documents: String,
    pub count: usize,
}

/// Rows ordered by term ascending.
pub type DocumentFrequencyTable = Vec<DocumentFrequencyRow>;

pub fn term_frequency_table(index: &InvertedIndex) -> TermFrequencyTable {
    let mut table: TermFrequencyTable = index
        .iter()
        .map(|(term, postings)| (term.clone(), postings.values().map(|&c| c as u64).sum()))
        .collect();
    // stable: equal totals stay in discovery order
    table.sort_by(|a, b| b.1.cmp(&a.1));
    table
}

pub fn document_frequency_table(index: &InvertedIndex) -> DocumentFrequencyTable {
    let mut rows: DocumentFrequencyTable = index
        .iter()
        .map(|(term, postings)| {
            let docs: BTreeSet<&str> = postings.keys().map(String::as_str).collect();
            DocumentFrequencyRow {
                term: term.clone(),
                count: docs.len(),
                documents: docs.into_iter().collect::<Vec<_>>().join(", "),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.term.cmp(&b.term));
    rows
}

/// `(ln rank, ln frequency)` pairs for a Zipf plot; rank is the 1-based
/// position in the already sorted table.
pub fn rank_frequency_log_series(table: &TermFrequencyTable) -> Vec<(f64, f64)> {
    table
        .iter()
        .enumerate()
        .map(|(i, (_, freq))| (((i + 1) as f64).ln(), (*freq as f64).ln()))
        .collect()
}
