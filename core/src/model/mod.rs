//! Ranking abstraction over a loaded index, plus the concrete scorers.
//!
//! Every scorer reads an immutable [`IndexSnapshot`] and analyzes queries with
//! the snapshot's [`Analyzer`](crate::analyzer::Analyzer), so query terms are
//! n-grams of the same width and normalization as the indexed documents.

mod bm25;
mod query_likelihood;
mod tfidf;

pub use bm25::Bm25;
pub use query_likelihood::QueryLikelihood;
pub use tfidf::TfIdf;

use crate::index::IndexSnapshot;
use crate::{DocumentId, Term};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

/// How many results `report` writes per query.
pub const REPORT_DEPTH: usize = 100;

/// Scores for one query. Documents not present score zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    scores: HashMap<DocumentId, f64>,
}

impl Ranking {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, doc_id: DocumentId, score: f64) {
        self.scores.insert(doc_id, score);
    }

    pub fn get(&self, doc_id: &str) -> Option<f64> { self.scores.get(doc_id).copied() }

    pub fn len(&self) -> usize { self.scores.len() }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }

    pub fn scores(&self) -> &HashMap<DocumentId, f64> { &self.scores }

    /// Highest score first; equal scores by document id ascending.
    pub fn sorted(&self) -> Vec<(&DocumentId, f64)> {
        let mut out: Vec<(&DocumentId, f64)> = self.scores.iter().map(|(d, &s)| (d, s)).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out
    }

    pub fn top(&self, k: usize) -> Vec<(&DocumentId, f64)> {
        let mut out = self.sorted();
        out.truncate(k);
        out
    }
}

impl FromIterator<(DocumentId, f64)> for Ranking {
    fn from_iter<I: IntoIterator<Item = (DocumentId, f64)>>(iter: I) -> Self {
        Self { scores: iter.into_iter().collect() }
    }
}

/// A scoring strategy over an index. Higher scores are more relevant.
pub trait RetrievalModel: Send + Sync {
    /// Score documents for a free-text query. Empty or unmatched queries give
    /// an empty ranking.
    fn rank(&self, query: &str, query_id: u32) -> Ranking;

    /// Stable identifier used in reports and output file names.
    fn name(&self) -> &'static str;

    /// Write the top results as `query_id Q0 doc_id rank score name` lines.
    fn report(&self, ranking: &Ranking, query_id: u32, original_query: &str, out: &mut dyn Write) -> io::Result<()> {
        tracing::debug!(query_id, query = original_query, hits = ranking.len(), model = self.name(), "writing report");
        for (i, (doc_id, score)) in ranking.top(REPORT_DEPTH).into_iter().enumerate() {
            writeln!(out, "{query_id} Q0 {doc_id} {} {score:.6} {}", i + 1, self.name())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    #[serde(rename = "tfidf")]
    TfIdf,
    #[default]
    Bm25,
    QueryLikelihood,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::TfIdf, ModelKind::Bm25, ModelKind::QueryLikelihood];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::TfIdf => "tfidf",
            ModelKind::Bm25 => "bm25",
            ModelKind::QueryLikelihood => "query-likelihood",
        }
    }

    pub fn build(self, snapshot: Arc<IndexSnapshot>) -> Box<dyn RetrievalModel> {
        match self {
            ModelKind::TfIdf => Box::new(TfIdf::new(snapshot)),
            ModelKind::Bm25 => Box::new(Bm25::new(snapshot)),
            ModelKind::QueryLikelihood => Box::new(QueryLikelihood::new(snapshot)),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown model `{s}` (expected tfidf, bm25 or query-likelihood)"))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query n-grams with their repeat counts, keeping first-seen order.
pub(crate) fn query_term_counts(snapshot: &IndexSnapshot, query: &str) -> Vec<(Term, u32)> {
    let mut counts: Vec<(Term, u32)> = Vec::new();
    for term in snapshot.analyzer.terms(query) {
        match counts.iter_mut().find(|(t, _)| *t == term) {
            Some((_, c)) => *c += 1,
            None => counts.push((term, 1)),
        }
    }
    counts
}
