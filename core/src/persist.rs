use crate::analyzer::Analyzer;
use crate::error::StorageError;
use crate::index::{IndexSnapshot, InvertedIndex, TokenCountTable};
use crate::stats::{document_frequency_table, rank_frequency_log_series, term_frequency_table, TermFrequencyTable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, StorageError>;

pub const META_VERSION: u32 = 1;

/// Describes how an index was built; written next to the index for each `n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub created_at: String,
    pub num_docs: usize,
    pub num_terms: usize,
    pub analyzer: Analyzer,
}

impl IndexMeta {
    pub fn new(index: &InvertedIndex, token_counts: &TokenCountTable, analyzer: Analyzer) -> Self {
        Self {
            version: META_VERSION,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            num_docs: token_counts.len(),
            num_terms: index.len(),
            analyzer,
        }
    }
}

/// Files of an index folder. Artifacts are keyed by the n-gram width.
#[derive(Debug, Clone)]
pub struct IndexStore {
    pub root: PathBuf,
}

impl IndexStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn index_path(&self, n: usize) -> PathBuf { self.root.join(format!("Index_{n}.json")) }
    pub fn token_count_path(&self, n: usize) -> PathBuf { self.root.join(format!("TokenCount_{n}.json")) }
    pub fn meta_path(&self, n: usize) -> PathBuf { self.root.join(format!("Meta_{n}.json")) }
    pub fn term_frequency_path(&self, n: usize) -> PathBuf { self.root.join(format!("TermFrequency_{n}.csv")) }
    pub fn document_frequency_path(&self, n: usize) -> PathBuf { self.root.join(format!("DocumentFrequency_{n}.csv")) }
    pub fn rank_frequency_log_path(&self, n: usize) -> PathBuf { self.root.join(format!("TermFrequencyLog_{n}.csv")) }
    pub fn data_dir(&self) -> PathBuf { self.root.join("DataFiles") }

    /// Write the index and token-count table for width `n`.
    pub fn save(&self, index: &InvertedIndex, token_counts: &TokenCountTable, n: usize) -> Result<()> {
        self.ensure_root()?;
        write_json(&self.index_path(n), index)?;
        write_json(&self.token_count_path(n), token_counts)?;
        tracing::info!(root = %self.root.display(), n, terms = index.len(), docs = token_counts.len(), "index saved");
        Ok(())
    }

    /// Read back what `save` wrote for width `n`. Fails rather than returning an
    /// empty index when an artifact is missing, unparsable, or inconsistent.
    pub fn load(&self, n: usize) -> Result<(InvertedIndex, TokenCountTable)> {
        let index_path = self.index_path(n);
        let index: InvertedIndex = read_json(&index_path)?;
        let token_counts: TokenCountTable = read_json(&self.token_count_path(n))?;
        for (term, postings) in index.iter() {
            for (doc_id, &count) in postings {
                if count == 0 {
                    return Err(StorageError::corrupt(index_path, format!("zero count for `{term}` in `{doc_id}`")));
                }
                if !token_counts.contains(doc_id) {
                    return Err(StorageError::corrupt(
                        index_path,
                        format!("document `{doc_id}` under `{term}` missing from token counts"),
                    ));
                }
            }
        }
        tracing::debug!(root = %self.root.display(), n, terms = index.len(), "index loaded");
        Ok((index, token_counts))
    }

    pub fn save_meta(&self, meta: &IndexMeta) -> Result<()> {
        self.ensure_root()?;
        write_json(&self.meta_path(meta.analyzer.ngrams), meta)
    }

    pub fn load_meta(&self, n: usize) -> Result<IndexMeta> {
        let path = self.meta_path(n);
        let meta: IndexMeta = read_json(&path)?;
        if meta.analyzer.ngrams != n {
            return Err(StorageError::corrupt(path, format!("built with ngrams={}, expected {n}", meta.analyzer.ngrams)));
        }
        Ok(meta)
    }

    /// Index, token counts and the analyzer recorded in the metadata.
    pub fn load_snapshot(&self, n: usize) -> Result<IndexSnapshot> {
        let meta = self.load_meta(n)?;
        let (index, token_counts) = self.load(n)?;
        Ok(IndexSnapshot::new(index, token_counts, meta.analyzer))
    }

    /// Write the three tabular statistics exports for width `n`.
    pub fn export_statistics(&self, index: &InvertedIndex, n: usize) -> Result<()> {
        let tf = term_frequency_table(index);
        self.export_term_frequency(&tf, n)?;
        self.export_rank_frequency_log(&tf, n)?;
        self.export_document_frequency(index, n)?;
        tracing::info!(root = %self.root.display(), n, terms = tf.len(), "statistics exported");
        Ok(())
    }

    pub fn export_term_frequency(&self, table: &TermFrequencyTable, n: usize) -> Result<()> {
        let rows = table.iter().map(|(term, freq)| [term.clone(), freq.to_string()]);
        self.write_csv(&self.term_frequency_path(n), ["Term", "Frequency"], rows)
    }

    pub fn export_document_frequency(&self, index: &InvertedIndex, n: usize) -> Result<()> {
        let rows = document_frequency_table(index)
            .into_iter()
            .map(|r| [r.term, r.documents, r.count.to_string()]);
        self.write_csv(&self.document_frequency_path(n), ["Term", "DocumentID", "DocumentFrequency"], rows)
    }

    pub fn export_rank_frequency_log(&self, table: &TermFrequencyTable, n: usize) -> Result<()> {
        let rows = rank_frequency_log_series(table)
            .into_iter()
            .map(|(rank, freq)| [rank.to_string(), freq.to_string()]);
        self.write_csv(&self.rank_frequency_log_path(n), ["Log(Rank)", "Log(Frequency)"], rows)
    }

    /// Keep the normalized text of a document under `DataFiles/`.
    pub fn save_normalized_text(&self, doc_id: &str, text: &str) -> Result<()> {
        let dir = self.data_dir();
        create_dir_all(&dir).map_err(|e| StorageError::from_io(dir.clone(), e))?;
        let path = dir.join(format!("{doc_id}.txt"));
        let mut f = File::create(&path).map_err(|e| StorageError::from_io(path.clone(), e))?;
        f.write_all(text.as_bytes()).map_err(|e| StorageError::from_io(path, e))
    }

    fn ensure_root(&self) -> Result<()> {
        create_dir_all(&self.root).map_err(|e| StorageError::from_io(self.root.clone(), e))
    }

    fn write_csv<const N: usize, I>(&self, path: &Path, header: [&str; N], rows: I) -> Result<()>
    where
        I: IntoIterator<Item = [String; N]>,
    {
        self.ensure_root()?;
        let csv_err = |source| StorageError::Csv { path: path.to_path_buf(), source };
        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        writer.write_record(header).map_err(csv_err)?;
        for row in rows {
            writer.write_record(&row).map_err(csv_err)?;
        }
        writer.flush().map_err(|e| StorageError::from_io(path.to_path_buf(), e))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).map_err(|e| StorageError::from_io(path.to_path_buf(), e))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|source| StorageError::Encode { path: path.to_path_buf(), source })?;
    w.flush().map_err(|e| StorageError::from_io(path.to_path_buf(), e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).map_err(|e| StorageError::from_io(path.to_path_buf(), e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| StorageError::from_io(path.to_path_buf(), e))?;
    serde_json::from_str(&buf).map_err(|e| StorageError::corrupt(path.to_path_buf(), e.to_string()))
}
