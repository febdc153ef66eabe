use crate::error::{Error, Result};
use crate::index::ngrams;
use crate::normalize::{normalize_with, Alphabet};
use crate::tokenizer::{tokenize_with, TrailingDot};
use crate::{Document, Term};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Text pipeline shared by indexing and querying: normalize, tokenize, then
/// slide an n-gram window over the tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    pub ngrams: usize,
    pub case_fold: bool,
    pub noise_passes: u32,
    #[serde(default)]
    pub trailing_dot: TrailingDot,
    /// Indexes written before this field existed were ASCII-only.
    #[serde(default)]
    pub alphabet: Alphabet,
}

impl Analyzer {
    pub fn new(ngrams: usize, case_fold: bool, noise_passes: u32, trailing_dot: TrailingDot) -> Result<Self> {
        if ngrams < 1 {
            return Err(Error::config(format!("ngrams must be at least 1, got {ngrams}")));
        }
        Ok(Self { ngrams, case_fold, noise_passes, trailing_dot, alphabet: Alphabet::Ascii })
    }

    pub fn with_alphabet(self, alphabet: Alphabet) -> Self {
        Self { alphabet, ..self }
    }

    pub fn normalize(&self, raw: &str) -> String {
        normalize_with(raw, self.case_fold, self.noise_passes, self.alphabet)
    }

    pub fn tokens(&self, raw: &str) -> Vec<String> {
        tokenize_with(&self.normalize(raw), self.trailing_dot)
    }

    /// N-gram terms of `raw`, in text order, duplicates kept.
    pub fn terms(&self, raw: &str) -> Vec<Term> {
        ngrams(&self.tokens(raw), self.ngrams).collect()
    }

    /// Fill in the normalized text and token sequence of a document.
    pub fn analyze(&self, doc: &mut Document) {
        doc.normalized_text = self.normalize(&doc.raw_text);
        doc.tokens = tokenize_with(&doc.normalized_text, self.trailing_dot);
    }
}

/// Analyze every document in parallel. Each document is independent, so the
/// result is the same as analyzing them one by one.
pub fn analyze_documents(docs: &mut [Document], analyzer: &Analyzer) {
    docs.par_iter_mut().for_each(|doc| analyzer.analyze(doc));
    tracing::debug!(docs = docs.len(), "analyzed documents");
}
