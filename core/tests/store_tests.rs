use index_core::analyzer::{analyze_documents, Analyzer};
use index_core::corpus::load_documents;
use index_core::index::{build, InvertedIndex, TokenCountTable};
use index_core::normalize::Alphabet;
use index_core::persist::{IndexMeta, IndexStore};
use index_core::tokenizer::TrailingDot;
use index_core::{Document, StorageError};
use std::fs;
use tempfile::tempdir;

fn sample(n: usize) -> (InvertedIndex, TokenCountTable, Analyzer) {
    let analyzer = Analyzer::new(n, true, 2, TrailingDot::Strip).unwrap();
    let mut docs = vec![
        Document::new("Alan_Turing", "Alan Turing[1] was a mathematician. He studied computing."),
        Document::new("Enigma", "The Enigma machine -- broken by Turing."),
        Document::new("Blank", "   "),
    ];
    analyze_documents(&mut docs, &analyzer);
    let (index, counts) = build(&docs, n).unwrap();
    (index, counts, analyzer)
}

#[test]
fn round_trips_index_and_token_counts() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    for n in [1, 2, 3] {
        let (index, counts, _) = sample(n);
        store.save(&index, &counts, n).unwrap();
        let (index2, counts2) = store.load(n).unwrap();
        assert_eq!(index2, index);
        assert_eq!(counts2, counts);
        assert_eq!(counts2.get("Blank"), Some(-(n as i64)));
    }
}

#[test]
fn round_trips_an_empty_index() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    store.save(&InvertedIndex::new(), &TokenCountTable::new(), 1).unwrap();
    let (index, counts) = store.load(1).unwrap();
    assert!(index.is_empty());
    assert!(counts.is_empty());
}

#[test]
fn missing_artifact_is_an_error() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    let (index, counts, _) = sample(1);
    store.save(&index, &counts, 1).unwrap();
    assert!(matches!(store.load(2), Err(StorageError::Missing { .. })));
}

#[test]
fn corrupt_artifacts_are_errors() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    let (index, counts, _) = sample(1);
    store.save(&index, &counts, 1).unwrap();

    fs::write(store.index_path(1), "{ not json").unwrap();
    assert!(matches!(store.load(1), Err(StorageError::Corrupt { .. })));

    fs::write(store.index_path(1), r#"{"ghost": {"Nobody": 2}}"#).unwrap();
    assert!(matches!(store.load(1), Err(StorageError::Corrupt { .. })));

    fs::write(store.index_path(1), r#"{"turing": {"Enigma": 0}}"#).unwrap();
    assert!(matches!(store.load(1), Err(StorageError::Corrupt { .. })));
}

#[test]
fn snapshot_carries_the_build_analyzer() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    let (index, counts, analyzer) = sample(2);
    store.save(&index, &counts, 2).unwrap();
    store.save_meta(&IndexMeta::new(&index, &counts, analyzer)).unwrap();
    let snap = store.load_snapshot(2).unwrap();
    assert_eq!(snap.analyzer, analyzer);
    assert_eq!(snap.num_docs(), 3);
    assert!(matches!(store.load_snapshot(1), Err(StorageError::Missing { .. })));
}

#[test]
fn meta_records_the_alphabet() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    let analyzer = Analyzer::new(1, true, 1, TrailingDot::Strip).unwrap().with_alphabet(Alphabet::Unicode);
    let mut docs = vec![Document::new("a", "Café au lait"), Document::new("b", "naïve")];
    analyze_documents(&mut docs, &analyzer);
    let (index, counts) = build(&docs, 1).unwrap();
    store.save(&index, &counts, 1).unwrap();
    store.save_meta(&IndexMeta::new(&index, &counts, analyzer)).unwrap();
    let snap = store.load_snapshot(1).unwrap();
    assert_eq!(snap.analyzer.alphabet, Alphabet::Unicode);
    assert!(snap.index.contains("café"));
}

#[test]
fn exports_statistics_with_headers() {
    let dir = tempdir().unwrap();
    let store = IndexStore::new(dir.path());
    let (index, _, _) = sample(1);
    store.export_statistics(&index, 1).unwrap();

    let tf = fs::read_to_string(store.term_frequency_path(1)).unwrap();
    assert!(tf.starts_with("Term,Frequency\n"));
    assert!(tf.contains("turing,2\n"));

    let df = fs::read_to_string(store.document_frequency_path(1)).unwrap();
    assert!(df.starts_with("Term,DocumentID,DocumentFrequency\n"));
    assert!(df.contains("turing,\"Alan_Turing, Enigma\",2\n"));

    let log = fs::read_to_string(store.rank_frequency_log_path(1)).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("Log(Rank),Log(Frequency)"));
    assert_eq!(lines.count(), index.len());
}

#[test]
fn loads_documents_from_a_folder() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.txt"), "second").unwrap();
    fs::write(dir.path().join("a.txt"), "first").unwrap();
    fs::write(dir.path().join("notes.png"), "binary").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c.txt"), "ignored").unwrap();
    let docs = load_documents(dir.path());
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(docs[0].raw_text, "first");
}
