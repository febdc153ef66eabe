use crate::{Document, DocumentId};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Extensions accepted as plain-text documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "text", "htm", "html"];

/// Document id for a path: the file name without its extension, if the
/// extension is one we index.
pub fn document_id(path: &Path) -> Option<DocumentId> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

/// Read every document file directly inside `folder`, sorted by file name.
///
/// A missing folder yields no documents, and unreadable files are skipped;
/// both are logged rather than failing the run.
pub fn load_documents<P: AsRef<Path>>(folder: P) -> Vec<Document> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        tracing::warn!(path = %folder.display(), "input folder missing or not a directory, no documents processed");
        return Vec::new();
    }

    let mut docs = Vec::new();
    let mut seen: HashSet<DocumentId> = HashSet::new();
    let mut skipped = 0usize;
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(%err, "unreadable directory entry skipped");
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(id) = document_id(path) else {
            tracing::debug!(path = %path.display(), "not a document file, skipped");
            continue;
        };
        if seen.contains(&id) {
            tracing::warn!(path = %path.display(), doc_id = %id, "duplicate document id, skipped");
            skipped += 1;
            continue;
        }
        match fs::read_to_string(path) {
            Ok(text) => {
                seen.insert(id.clone());
                docs.push(Document::new(id, text));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable document skipped");
                skipped += 1;
            }
        }
    }
    tracing::info!(path = %folder.display(), docs = docs.len(), skipped, "loaded documents");
    docs
}
