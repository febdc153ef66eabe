use super::{query_term_counts, Ranking, RetrievalModel};
use crate::index::IndexSnapshot;
use crate::DocumentId;
use std::collections::HashSet;
use std::sync::Arc;

/// Weight of the collection model in Jelinek-Mercer smoothing.
pub const LAMBDA: f64 = 0.35;

/// Query likelihood language model with Jelinek-Mercer smoothing. Only
/// documents containing at least one query term are scored; scores are log
/// probabilities, so they are negative and larger is better.
pub struct QueryLikelihood {
    snapshot: Arc<IndexSnapshot>,
    collection_len: f64,
}

impl QueryLikelihood {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        let collection_len = snapshot.token_counts.total_ngram_positions() as f64;
        Self { snapshot, collection_len }
    }
}

impl RetrievalModel for QueryLikelihood {
    fn rank(&self, query: &str, _query_id: u32) -> Ranking {
        if self.collection_len == 0.0 {
            return Ranking::new();
        }
        let index = &self.snapshot.index;
        // terms unseen in the collection carry no evidence and would be ln(0)
        let terms: Vec<(&crate::index::Postings, f64, u32)> = query_term_counts(&self.snapshot, query)
            .into_iter()
            .filter_map(|(term, qtf)| {
                let postings = index.get(&term)?;
                let cf: u64 = postings.values().map(|&c| c as u64).sum();
                Some((postings, cf as f64 / self.collection_len, qtf))
            })
            .collect();

        let candidates: HashSet<&DocumentId> = terms.iter().flat_map(|(p, _, _)| p.keys()).collect();
        candidates
            .into_iter()
            .map(|doc_id| {
                let dl = self.snapshot.token_counts.ngram_positions(doc_id).max(1) as f64;
                let score: f64 = terms
                    .iter()
                    .map(|(postings, p_coll, qtf)| {
                        let tf = postings.get(doc_id).copied().unwrap_or(0) as f64;
                        *qtf as f64 * ((1.0 - LAMBDA) * tf / dl + LAMBDA * p_coll).ln()
                    })
                    .sum();
                (doc_id.clone(), score)
            })
            .collect()
    }

    fn name(&self) -> &'static str { "query-likelihood" }
}
