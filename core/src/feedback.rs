//! Pseudo-relevance feedback: expand a query with terms from the top-ranked
//! documents of a first pass, then rank again.

use crate::index::IndexSnapshot;
use crate::model::{Ranking, RetrievalModel};
use crate::Term;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of one feedback run.
#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    pub initial: Ranking,
    /// Appended terms, highest weight first.
    pub expansion: Vec<(Term, f64)>,
    pub expanded_query: String,
    pub ranking: Ranking,
}

pub struct FeedbackEngine {
    snapshot: Arc<IndexSnapshot>,
    top_k: usize,
    expansion_terms: usize,
}

impl FeedbackEngine {
    pub fn new(snapshot: Arc<IndexSnapshot>, top_k: usize, expansion_terms: usize) -> Self {
        Self { snapshot, top_k, expansion_terms }
    }

    /// Rank `query`, pick expansion terms from the `top_k` best documents and
    /// rank the expanded query. When nothing is retrieved, or no terms are
    /// requested, the first ranking is returned with the query unchanged.
    pub fn expand(&self, model: &dyn RetrievalModel, query: &str, query_id: u32) -> FeedbackOutcome {
        let initial = model.rank(query, query_id);
        if initial.is_empty() || self.expansion_terms == 0 || self.top_k == 0 {
            tracing::debug!(query_id, hits = initial.len(), "feedback skipped");
            return Self::unchanged(initial, query);
        }

        let expansion = self.expansion_terms_for(&initial, query);
        if expansion.is_empty() {
            return Self::unchanged(initial, query);
        }

        let mut expanded_query = query.trim_end().to_string();
        for (term, _) in &expansion {
            if !expanded_query.is_empty() {
                expanded_query.push(' ');
            }
            expanded_query.push_str(term);
        }
        tracing::info!(query_id, model = model.name(), %expanded_query, "expanded query");
        let ranking = model.rank(&expanded_query, query_id);
        FeedbackOutcome { initial, expansion, expanded_query, ranking }
    }

    /// Candidate terms from the top documents, weighted by
    /// `sum over top docs of count(t, d) * ln(1 + N / df(t))`, excluding terms
    /// the query already has. Ties sort by term.
    ///
    /// Only terms the analyzer maps back to themselves are kept, so the
    /// expanded query asks for exactly the terms chosen here.
    pub fn expansion_terms_for(&self, initial: &Ranking, query: &str) -> Vec<(Term, f64)> {
        let top: Vec<&str> = initial.top(self.top_k).into_iter().map(|(d, _)| d.as_str()).collect();
        let query_terms: HashSet<Term> = self.snapshot.analyzer.terms(query).into_iter().collect();
        let n = self.snapshot.num_docs().max(1) as f64;

        let mut weighted: Vec<(Term, f64)> = self
            .snapshot
            .index
            .iter()
            .filter(|(term, _)| !query_terms.contains(*term))
            .filter_map(|(term, postings)| {
                let in_top: u64 = top.iter().filter_map(|d| postings.get(*d)).map(|&c| c as u64).sum();
                if in_top == 0 || !self.survives_analysis(term) {
                    return None;
                }
                let idf = (1.0 + n / postings.len() as f64).ln();
                Some((term.clone(), in_top as f64 * idf))
            })
            .collect();
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        weighted.truncate(self.expansion_terms);
        weighted
    }

    fn survives_analysis(&self, term: &str) -> bool {
        let terms = self.snapshot.analyzer.terms(term);
        terms.len() == 1 && terms[0] == term
    }

    fn unchanged(initial: Ranking, query: &str) -> FeedbackOutcome {
        FeedbackOutcome {
            ranking: initial.clone(),
            initial,
            expansion: Vec::new(),
            expanded_query: query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::model::tests_support::{snapshot_of, snapshot_with};
    use crate::model::Bm25;
    use crate::tokenizer::TrailingDot;

    fn corpus() -> Arc<IndexSnapshot> {
        snapshot_of(
            &[
                ("a", "rust borrow checker ownership rust"),
                ("b", "rust ownership lifetimes"),
                ("c", "python garbage collector"),
            ],
            1,
        )
    }

    #[test]
    fn appends_terms_from_top_documents() {
        let snap = corpus();
        let model = Bm25::new(snap.clone());
        let out = FeedbackEngine::new(snap, 2, 2).expand(&model, "rust", 7);
        assert_eq!(out.expansion.len(), 2);
        assert_eq!(out.expansion[0].0, "ownership");
        assert!(out.expanded_query.starts_with("rust ownership"));
        assert!(out.expansion.iter().all(|(t, _)| t != "rust"));
        assert!(out.ranking.get("a").is_some());
    }

    #[test]
    fn zero_expansion_terms_is_identity() {
        let snap = corpus();
        let model = Bm25::new(snap.clone());
        let out = FeedbackEngine::new(snap, 3, 0).expand(&model, "rust", 1);
        assert_eq!(out.expanded_query, "rust");
        assert_eq!(out.ranking, model.rank("rust", 1));
    }

    #[test]
    fn nothing_retrieved_means_no_expansion() {
        let snap = corpus();
        let model = Bm25::new(snap.clone());
        let out = FeedbackEngine::new(snap, 3, 5).expand(&model, "haskell", 1);
        assert!(out.ranking.is_empty());
        assert!(out.expansion.is_empty());
        assert_eq!(out.expanded_query, "haskell");
    }

    #[test]
    fn top_k_larger_than_hits_uses_all() {
        let snap = corpus();
        let model = Bm25::new(snap.clone());
        let out = FeedbackEngine::new(snap, 50, 10).expand(&model, "python", 1);
        let terms: Vec<&str> = out.expansion.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["collector", "garbage"]);
    }

    #[test]
    fn skips_terms_that_analyze_to_something_else() {
        // without noise passes "ab.." is indexed as "ab.", which a query would read as "ab"
        let analyzer = Analyzer::new(1, true, 0, TrailingDot::Strip).unwrap();
        let snap = snapshot_with(&[("a", "rust ab.. ownership"), ("b", "python")], analyzer);
        assert!(snap.index.contains("ab."));
        let model = Bm25::new(snap.clone());
        let out = FeedbackEngine::new(snap, 1, 5).expand(&model, "rust", 1);
        let terms: Vec<&str> = out.expansion.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(terms, vec!["ownership"]);
        assert_eq!(out.expanded_query, "rust ownership");
    }
}
