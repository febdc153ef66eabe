use super::{query_term_counts, Ranking, RetrievalModel};
use crate::index::IndexSnapshot;
use crate::DocumentId;
use std::collections::HashMap;
use std::sync::Arc;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// Okapi BM25. Document length is the number of n-gram positions.
pub struct Bm25 {
    snapshot: Arc<IndexSnapshot>,
    avg_dl: f64,
}

impl Bm25 {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        let docs = snapshot.num_docs();
        let avg_dl = if docs == 0 {
            1.0
        } else {
            let avg = snapshot.token_counts.total_ngram_positions() as f64 / docs as f64;
            if avg > 0.0 { avg } else { 1.0 }
        };
        Self { snapshot, avg_dl }
    }
}

impl RetrievalModel for Bm25 {
    fn rank(&self, query: &str, _query_id: u32) -> Ranking {
        let n = self.snapshot.num_docs() as f64;
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();
        for (term, qtf) in query_term_counts(&self.snapshot, query) {
            let Some(postings) = self.snapshot.index.get(&term) else { continue };
            let df = postings.len() as f64;
            // IDF: log((N - df + 0.5) / (df + 0.5) + 1)
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for (doc_id, &tf) in postings {
                let dl = self.snapshot.token_counts.ngram_positions(doc_id) as f64;
                let tf = tf as f64;
                let tf_norm = (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * dl / self.avg_dl));
                *scores.entry(doc_id.clone()).or_insert(0.0) += qtf as f64 * idf * tf_norm;
            }
        }
        scores.into_iter().collect()
    }

    fn name(&self) -> &'static str { "bm25" }
}
