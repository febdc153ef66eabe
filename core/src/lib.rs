pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod error;
pub mod feedback;
pub mod index;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod stats;
pub mod tokenizer;

pub use error::{Error, Result, StorageError};

/// Document identifier: the source file name without its extension.
pub type DocumentId = String;
/// An n-gram: `n` tokens joined by single spaces.
pub type Term = String;

/// One source document on its way into the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub raw_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
}

impl Document {
    pub fn new<I: Into<DocumentId>, T: Into<String>>(id: I, raw_text: T) -> Self {
        Self { id: id.into(), raw_text: raw_text.into(), ..Self::default() }
    }
}
