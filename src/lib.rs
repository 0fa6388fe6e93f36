#![warn(missing_docs)]
//! Core library entry points for the docqa document question-answering pipeline.
//!
//! The build phase runs loader, normalizer, splitter, then indexer, and
//! persists a vector collection. The query phase loads that collection and
//! answers questions through the retrieval chain.

pub mod chain;
pub mod config;
pub mod document;
pub mod embedder;
pub mod evaluation;
pub mod generation;
pub mod html;
pub mod indexer;
pub mod loader;
pub mod mirror;
pub mod normalizer;
pub mod pipeline;
pub mod retriever;
pub mod splitter;
pub mod vector_store;

pub use chain::{
    answer_question, build_rag_chain, build_retriever, format_docs, QuestionAnswerer, RagAnswer,
    RagChain,
};
pub use config::{ConfigArgs, PipelineConfig};
pub use document::{Chunk, Document, DocumentMetadata, SourceKind};
pub use embedder::{Embedder, EmbeddingBackend, EmbeddingConfig};
pub use evaluation::{
    run_evaluation, run_evaluation_with, save_answers, AnswerRecord, EVALUATION_QUESTIONS,
};
pub use generation::{GenerationConfig, LlmProvider, ProviderKind, ProviderRequest};
pub use indexer::VectorIndexer;
pub use loader::{load_sources, DocumentSource, LoadReport, SourceFailure, SourcesConfig};
pub use mirror::{MirrorReport, PageCache, SiteMirror};
pub use normalizer::{normalize_documents, normalize_text, PersianNormalizer};
pub use pipeline::{build_index, BuildSummary};
pub use retriever::{RetrievedChunk, Retriever, RetrieverConfig, SearchType};
pub use splitter::{SizeUnit, SplitMode, Splitter, SplitterConfig};
pub use vector_store::{Collection, CollectionError, SearchHit, StoreConfig};
