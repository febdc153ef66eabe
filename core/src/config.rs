use crate::analyzer::Analyzer;
use crate::error::{Error, Result};
use crate::model::ModelKind;
use crate::normalize::Alphabet;
use crate::tokenizer::TrailingDot;
use serde::{Deserialize, Serialize};

/// Named options recognized by the indexing and query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// N-gram width, at least 1.
    pub ngrams: usize,
    pub case_fold: bool,
    pub noise_passes: u32,
    pub trailing_dot: TrailingDot,
    /// Characters kept by the normalizer.
    pub alphabet: Alphabet,
    pub model: ModelKind,
    /// Documents taken from the first ranking for feedback.
    pub top_k: usize,
    /// Terms appended to the query by feedback.
    pub expansion_terms: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ngrams: 1,
            case_fold: true,
            noise_passes: 2,
            trailing_dot: TrailingDot::Strip,
            alphabet: Alphabet::Ascii,
            model: ModelKind::Bm25,
            top_k: 10,
            expansion_terms: 5,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ngrams < 1 {
            return Err(Error::config(format!("ngrams must be at least 1, got {}", self.ngrams)));
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(s).map_err(|e| Error::config(format!("unreadable config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn analyzer(&self) -> Result<Analyzer> {
        Ok(Analyzer::new(self.ngrams, self.case_fold, self.noise_passes, self.trailing_dot)?.with_alphabet(self.alphabet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let c = EngineConfig::from_json_str(r#"{"ngrams": 3, "model": "tfidf"}"#).unwrap();
        assert_eq!(c.ngrams, 3);
        assert_eq!(c.model, ModelKind::TfIdf);
        assert_eq!(c.top_k, 10);
        assert_eq!(c.alphabet, Alphabet::Ascii);
    }

    #[test]
    fn unicode_alphabet_reaches_the_analyzer() {
        let c = EngineConfig::from_json_str(r#"{"alphabet": "unicode"}"#).unwrap();
        assert_eq!(c.analyzer().unwrap().alphabet, Alphabet::Unicode);
    }

    #[test]
    fn zero_ngrams_is_a_config_error() {
        let err = EngineConfig::from_json_str(r#"{"ngrams": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
