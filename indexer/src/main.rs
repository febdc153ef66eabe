use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use index_core::analyzer::analyze_documents;
use index_core::config::EngineConfig;
use index_core::corpus::load_documents;
use index_core::feedback::FeedbackEngine;
use index_core::index::build;
use index_core::model::{ModelKind, RetrievalModel};
use index_core::normalize::Alphabet;
use index_core::persist::{IndexMeta, IndexStore};
use index_core::tokenizer::TrailingDot;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, inspect and query an n-gram inverted index", long_about = None)]
struct Cli {
    /// JSON file with engine options; flags given on the command line override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Default)]
struct AnalysisArgs {
    /// N-gram width
    #[arg(long)]
    ngrams: Option<usize>,
    /// Lower-case text before noise removal
    #[arg(long)]
    case_fold: Option<bool>,
    /// Number of noise-removal passes
    #[arg(long)]
    noise_passes: Option<u32>,
    /// How tokens ending in '.' are trimmed: strip or legacy
    #[arg(long)]
    trailing_dot: Option<TrailingDot>,
    /// Characters kept by the normalizer: ascii or unicode
    #[arg(long)]
    alphabet: Option<Alphabet>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a folder of plain-text documents
    Build {
        /// Folder holding one text file per document
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Also write term/document frequency CSV exports
        #[arg(long, default_value_t = false)]
        stats: bool,
        /// Keep the normalized text of each document under DataFiles/
        #[arg(long, default_value_t = false)]
        keep_normalized: bool,
    },
    /// Write the frequency CSV exports for an existing index
    Stats {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        ngrams: Option<usize>,
    },
    /// Rank documents for one query or a file of queries (one per line)
    Query {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        ngrams: Option<usize>,
        /// tfidf, bm25 or query-likelihood
        #[arg(long)]
        model: Option<ModelKind>,
        #[arg(long, conflicts_with = "queries")]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        qid: u32,
        /// File with one query per line; query ids are line numbers from 1
        #[arg(long)]
        queries: Option<PathBuf>,
        /// Run pseudo-relevance feedback
        #[arg(long, default_value_t = false)]
        feedback: bool,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        expansion_terms: Option<usize>,
        /// Directory for `{model}_{n}.txt` reports instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { input, output, analysis, stats, keep_normalized } => {
            analysis.apply(&mut config);
            config.validate()?;
            build_index(&input, &output, &config, stats, keep_normalized)
        }
        Commands::Stats { index, ngrams } => {
            AnalysisArgs { ngrams, ..Default::default() }.apply(&mut config);
            config.validate()?;
            export_stats(&index, config.ngrams)
        }
        Commands::Query { index, ngrams, model, query, qid, queries, feedback, top_k, expansion_terms, out } => {
            AnalysisArgs { ngrams, ..Default::default() }.apply(&mut config);
            if let Some(m) = model { config.model = m; }
            if let Some(k) = top_k { config.top_k = k; }
            if let Some(e) = expansion_terms { config.expansion_terms = e; }
            config.validate()?;
            let queries = match (query, queries) {
                (Some(q), None) => vec![(qid, q)],
                (None, Some(path)) => read_queries(&path)?,
                _ => bail!("pass either --query or --queries"),
            };
            run_queries(&index, &config, &queries, feedback, out.as_deref())
        }
    }
}

impl AnalysisArgs {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(n) = self.ngrams { config.ngrams = n; }
        if let Some(c) = self.case_fold { config.case_fold = c; }
        if let Some(p) = self.noise_passes { config.noise_passes = p; }
        if let Some(t) = self.trailing_dot { config.trailing_dot = t; }
        if let Some(a) = self.alphabet { config.alphabet = a; }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else { return Ok(EngineConfig::default()) };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    Ok(EngineConfig::from_json_str(&text)?)
}

fn build_index(input: &Path, output: &Path, config: &EngineConfig, stats: bool, keep_normalized: bool) -> Result<()> {
    let analyzer = config.analyzer()?;
    let store = IndexStore::new(output);

    let mut docs = load_documents(input);
    analyze_documents(&mut docs, &analyzer);
    if keep_normalized {
        for doc in &docs {
            if let Err(err) = store.save_normalized_text(&doc.id, &doc.normalized_text) {
                tracing::warn!(doc_id = %doc.id, %err, "could not keep normalized text");
            }
        }
    }

    let (index, token_counts) = build(&docs, analyzer.ngrams)?;
    tracing::info!(num_docs = docs.len(), num_terms = index.len(), "ingested documents");

    store.save(&index, &token_counts, analyzer.ngrams)?;
    store.save_meta(&IndexMeta::new(&index, &token_counts, analyzer))?;
    if stats {
        store.export_statistics(&index, analyzer.ngrams)?;
    }

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

fn export_stats(root: &Path, n: usize) -> Result<()> {
    let store = IndexStore::new(root);
    let (index, _) = store.load(n)?;
    store.export_statistics(&index, n)?;
    Ok(())
}

fn read_queries(path: &Path) -> Result<Vec<(u32, String)>> {
    let f = File::open(path).with_context(|| format!("opening queries {}", path.display()))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        out.push((i as u32 + 1, line));
    }
    Ok(out)
}

fn run_queries(root: &Path, config: &EngineConfig, queries: &[(u32, String)], feedback: bool, out: Option<&Path>) -> Result<()> {
    let store = IndexStore::new(root);
    let snapshot = Arc::new(store.load_snapshot(config.ngrams)?);
    let model: Box<dyn RetrievalModel> = config.model.build(snapshot.clone());
    let engine = FeedbackEngine::new(snapshot, config.top_k, config.expansion_terms);

    let mut writer: Box<dyn Write> = match out {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let suffix = if feedback { "_feedback" } else { "" };
            let path = dir.join(format!("{}_{}{}.txt", model.name(), config.ngrams, suffix));
            Box::new(BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for (qid, query) in queries {
        let ranking = if feedback {
            let outcome = engine.expand(model.as_ref(), query, *qid);
            tracing::info!(qid, expanded = %outcome.expanded_query, "feedback query");
            outcome.ranking
        } else {
            model.rank(query, *qid)
        };
        model.report(&ranking, *qid, query, writer.as_mut())?;
    }
    writer.flush()?;
    Ok(())
}
