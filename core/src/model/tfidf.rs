use super::{query_term_counts, Ranking, RetrievalModel};
use crate::index::IndexSnapshot;
use crate::DocumentId;
use std::collections::HashMap;
use std::sync::Arc;

/// Vector-space model: cosine similarity between log-tf * smoothed-idf vectors.
pub struct TfIdf {
    snapshot: Arc<IndexSnapshot>,
    doc_norms: HashMap<DocumentId, f64>,
}

fn tf_weight(tf: u32) -> f64 {
    if tf > 0 { 1.0 + (tf as f64).ln() } else { 0.0 }
}

/// ln(1 + N/df); stays positive when a term is in every document.
fn idf(num_docs: usize, df: usize) -> f64 {
    (1.0 + num_docs.max(1) as f64 / df.max(1) as f64).ln()
}

impl TfIdf {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        let n = snapshot.num_docs();
        let mut doc_norms: HashMap<DocumentId, f64> = HashMap::new();
        for (_, postings) in snapshot.index.iter() {
            let idf = idf(n, postings.len());
            for (doc_id, &tf) in postings {
                let w = tf_weight(tf) * idf;
                *doc_norms.entry(doc_id.clone()).or_insert(0.0) += w * w;
            }
        }
        for norm in doc_norms.values_mut() {
            *norm = norm.sqrt();
        }
        Self { snapshot, doc_norms }
    }
}

impl RetrievalModel for TfIdf {
    fn rank(&self, query: &str, _query_id: u32) -> Ranking {
        let n = self.snapshot.num_docs();
        let mut query_norm = 0.0f64;
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();
        for (term, qtf) in query_term_counts(&self.snapshot, query) {
            let Some(postings) = self.snapshot.index.get(&term) else { continue };
            let idf = idf(n, postings.len());
            let q_w = tf_weight(qtf) * idf;
            query_norm += q_w * q_w;
            for (doc_id, &tf) in postings {
                let norm = self.doc_norms.get(doc_id).copied().unwrap_or(1.0);
                if norm == 0.0 {
                    continue;
                }
                *scores.entry(doc_id.clone()).or_insert(0.0) += q_w * tf_weight(tf) * idf / norm;
            }
        }
        let query_norm = query_norm.sqrt();
        if query_norm == 0.0 {
            return Ranking::new();
        }
        scores.into_iter().map(|(d, s)| (d, s / query_norm)).collect()
    }

    fn name(&self) -> &'static str { "tfidf" }
}
