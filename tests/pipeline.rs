use std::cell::Cell;
use std::fs;
use std::time::Duration;

use anyhow::{bail, Result};
use docqa::loader::{HtmlDirectorySource, PdfSource, WebPageSource};
use docqa::mirror::http_client;
use docqa::{
    build_rag_chain, build_retriever, load_sources, run_evaluation, run_evaluation_with,
    save_answers, CollectionError, Document, DocumentSource, Embedder, GenerationConfig,
    LlmProvider, PageCache, ProviderRequest, RetrieverConfig, SearchType, SourceKind, Splitter,
    SplitterConfig, StoreConfig, VectorIndexer, EVALUATION_QUESTIONS,
};
use pretty_assertions::assert_eq;

/// Letter-frequency vectors: equal texts embed identically.
struct LetterBag {
    model: &'static str,
}

impl Embedder for LetterBag {
    fn model_id(&self) -> &str {
        self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; 32];
        for ch in text.chars().filter(|c| c.is_alphanumeric()) {
            vector[(ch as usize) % 32] += 1.0;
        }
        Ok(vector)
    }
}

/// Returns the first retrieved block, so answers reveal what was retrieved.
struct FirstContextLine {
    calls: Cell<usize>,
}

impl LlmProvider for FirstContextLine {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        let context = request
            .prompt
            .split("متن‌های بازیابی‌شده:\n")
            .nth(1)
            .unwrap_or_default();
        Ok(context.split("\n\n").next().unwrap_or_default().to_string())
    }
}

struct Unavailable;

impl LlmProvider for Unavailable {
    fn answer(&self, _request: &ProviderRequest) -> Result<String> {
        bail!("Cohere chat request failed (503 Service Unavailable): overloaded")
    }
}

struct StubSource;

impl DocumentSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    fn load(&self) -> Result<Vec<Document>> {
        Ok(vec![Document::new(
            "stub text".into(),
            SourceKind::Wikipedia,
            "stub",
            None,
            None,
        )])
    }
}

fn store(dir: &std::path::Path) -> StoreConfig {
    StoreConfig {
        collection_dir: dir.join("collection"),
        collection_name: "Linux_Philosophy".into(),
    }
}

fn corpus() -> Vec<Document> {
    ["alpha beta", "gnu hurd", "xyz quux", "kernel modules"]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Document::new(
                text.to_string(),
                SourceKind::HtmlMirror,
                format!("page{i}.html"),
                None,
                None,
            )
        })
        .collect()
}

#[test]
fn one_failing_source_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let html_dir = dir.path().join("html");
    fs::create_dir_all(&html_dir).unwrap();
    fs::write(html_dir.join("index.html"), "<p>stallman page</p>").unwrap();

    let cache = PageCache::new(dir.path().join("cache"));
    let url = "https://linuxbook.ir/all.html";
    cache.put(url, "<p>web book</p>").unwrap();

    let pdf = PdfSource::new(dir.path().join("missing.pdf"), Some("fa".into()));
    let html = HtmlDirectorySource::new(&html_dir);
    let web = WebPageSource::new(http_client(Duration::from_secs(1)).unwrap(), cache, url);

    let report = load_sources(&[&pdf, &StubSource, &html, &web]);
    let texts: Vec<&str> = report.documents.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, vec!["stub text", "stallman page", "web book"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "pdf");
}

#[test]
fn built_collection_reloads_and_finds_exact_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = LetterBag { model: "test/letters" };
    let chunks = Splitter::new(SplitterConfig::default())
        .unwrap()
        .split(&corpus())
        .unwrap();
    let indexer = VectorIndexer::new(store(dir.path()), 3, Duration::ZERO);
    indexer.build(&chunks, &embedder).unwrap();

    let collection = indexer.load(&embedder).unwrap();
    assert_eq!(collection.count().unwrap(), 4);
    assert_eq!(collection.model_id(), "test/letters");

    let query = embedder.embed("gnu hurd").unwrap();
    let hits = collection.search(&query, 4).unwrap();
    assert_eq!(hits[0].chunk.text, "gnu hurd");
    assert_eq!(hits[0].chunk.metadata.locator, "page1.html");
    assert!(hits[0].distance.abs() < 1e-5);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn querying_before_building_is_a_missing_collection_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = VectorIndexer::new(store(dir.path()), 8, Duration::ZERO)
        .load(&LetterBag { model: "test/letters" })
        .unwrap_err();
    match err.downcast_ref::<CollectionError>() {
        Some(CollectionError::MissingCollection { name, .. }) => {
            assert_eq!(name, "Linux_Philosophy")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn loading_with_another_model_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let indexer = VectorIndexer::new(store(dir.path()), 8, Duration::ZERO);
    let chunks = Splitter::new(SplitterConfig::default())
        .unwrap()
        .split(&corpus())
        .unwrap();
    indexer
        .build(&chunks, &LetterBag { model: "cohere/embed-multilingual-v3.0" })
        .unwrap();

    let err = indexer
        .load(&LetterBag { model: "local/bge-m3" })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CollectionError>(),
        Some(CollectionError::ModelMismatch { .. })
    ));
}

#[test]
fn evaluation_answers_every_question_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = LetterBag { model: "test/letters" };
    let chunks = Splitter::new(SplitterConfig::default())
        .unwrap()
        .split(&corpus())
        .unwrap();
    let indexer = VectorIndexer::new(store(dir.path()), 8, Duration::ZERO);
    let collection = indexer.build(&chunks, &embedder).unwrap();

    let retriever = build_retriever(
        collection,
        Box::new(LetterBag { model: "test/letters" }),
        RetrieverConfig {
            k: 2,
            search: SearchType::Mmr {
                fetch_k: 4,
                lambda: 0.5,
            },
            cache_size: 0,
        },
    );
    let chain = build_rag_chain(
        retriever,
        Box::new(FirstContextLine { calls: Cell::new(0) }),
        &GenerationConfig::default(),
    );

    let questions = ["kernel modules?", "gnu hurd?", "alpha beta?"];
    let records = run_evaluation_with(&chain, &questions).unwrap();
    let numbers: Vec<usize> = records.iter().map(|r| r.question_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    let answers: Vec<&str> = records.iter().map(|r| r.answer.as_str()).collect();
    assert_eq!(answers, vec!["kernel modules", "gnu hurd", "alpha beta"]);

    let full = run_evaluation(&chain).unwrap();
    assert_eq!(full.len(), EVALUATION_QUESTIONS.len());
    for (record, question) in full.iter().zip(EVALUATION_QUESTIONS) {
        assert_eq!(record.question, question);
    }

    let path = dir.path().join("answers.json");
    fs::write(&path, "stale").unwrap();
    save_answers(&records, &path).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.as_array().map(Vec::len), Some(3));
    assert_eq!(saved[1]["answer"], "gnu hurd");
}

#[test]
fn upstream_generation_errors_reach_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = LetterBag { model: "test/letters" };
    let chunks = Splitter::new(SplitterConfig::default())
        .unwrap()
        .split(&corpus())
        .unwrap();
    let collection = VectorIndexer::new(store(dir.path()), 8, Duration::ZERO)
        .build(&chunks, &embedder)
        .unwrap();
    let chain = build_rag_chain(
        build_retriever(collection, Box::new(embedder), RetrieverConfig::default()),
        Box::new(Unavailable),
        &GenerationConfig::default(),
    );
    let err = run_evaluation_with(&chain, &["a?", "b?"]).unwrap_err();
    assert!(format!("{err:#}").contains("503 Service Unavailable"));
    assert!(err.to_string().contains("question 1"));
}
