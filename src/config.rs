//! Pipeline configuration and its environment-backed command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::document::SourceKind;
use crate::embedder::{EmbeddingBackend, EmbeddingConfig};
use crate::generation::{GenerationConfig, ProviderKind};
use crate::loader::SourcesConfig;
use crate::retriever::{RetrieverConfig, SearchType};
use crate::splitter::{SizeUnit, SplitMode, SplitterConfig};
use crate::vector_store::StoreConfig;

const DEFAULT_WIKIPEDIA_TITLES: &str =
    "ریچارد استالمن,لینوس توروالدز,لینوکس,پروژه گنو,نرم‌افزار آزاد,بنیاد نرم‌افزار آزاد";

/// Everything a pipeline run needs, passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input locations.
    pub sources: SourcesConfig,
    /// Source kinds whose text is run through the Persian normalizer.
    pub normalize_sources: Vec<SourceKind>,
    /// Chunking parameters.
    pub splitter: SplitterConfig,
    /// Embedding backend.
    pub embedding: EmbeddingConfig,
    /// Collection location.
    pub store: StoreConfig,
    /// Retrieval parameters.
    pub retriever: RetrieverConfig,
    /// Chat provider.
    pub generation: GenerationConfig,
    /// Drop existing records before indexing.
    pub rebuild_index: bool,
    /// Evaluation output file.
    pub answers_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            normalize_sources: vec![SourceKind::Pdf],
            splitter: SplitterConfig::default(),
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            retriever: RetrieverConfig::default(),
            generation: GenerationConfig::default(),
            rebuild_index: false,
            answers_path: PathBuf::from("answers.json"),
        }
    }
}

/// Retrieval strategy names accepted on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SearchKind {
    /// Plain nearest neighbours.
    Similarity,
    /// Maximal marginal relevance.
    Mmr,
}

/// Flags shared by every binary. Each one can also be set through the
/// environment variable named next to it.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Persian PDF book
    #[arg(long, env = "DOCQA_PDF_PATH", default_value = "data/justforfun_persian.pdf")]
    pub pdf_path: PathBuf,

    /// Directory of mirrored HTML pages
    #[arg(long, env = "DOCQA_HTML_DIR", default_value = "data/html")]
    pub html_dir: PathBuf,

    /// Web book loaded as a single page
    #[arg(long, env = "DOCQA_WEB_URL", default_value = "https://linuxbook.ir/all.html")]
    pub web_url: String,

    /// Cache directory for downloaded pages
    #[arg(long, env = "DOCQA_CACHE_DIR", default_value = "data/cache")]
    pub cache_dir: PathBuf,

    /// Wikipedia titles, comma separated
    #[arg(long, env = "DOCQA_WIKIPEDIA_TITLES", default_value = DEFAULT_WIKIPEDIA_TITLES)]
    pub wikipedia_titles: String,

    /// Wikipedia language edition
    #[arg(long, env = "DOCQA_WIKIPEDIA_LANG", default_value = "fa")]
    pub wikipedia_lang: String,

    /// Site mirrored into the HTML directory
    #[arg(long, env = "DOCQA_MIRROR_URL", default_value = "https://stallman.org")]
    pub mirror_url: String,

    /// Seconds before a source download times out
    #[arg(long, env = "DOCQA_FETCH_TIMEOUT", default_value_t = 60)]
    pub fetch_timeout_secs: u64,

    /// Source kinds to normalize, comma separated
    #[arg(long, env = "DOCQA_NORMALIZE", value_enum, value_delimiter = ',', default_value = "pdf")]
    pub normalize: Vec<SourceKind>,

    /// Maximum chunk length
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 700)]
    pub chunk_size: usize,

    /// Units shared by neighbouring chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Unit for chunk size and overlap
    #[arg(long, env = "DOCQA_SPLIT_UNIT", value_enum, default_value = "characters")]
    pub split_unit: SizeUnit,

    /// Window placement strategy
    #[arg(long, env = "DOCQA_SPLIT_MODE", value_enum, default_value = "fixed")]
    pub split_mode: SplitMode,

    /// Embedding backend
    #[arg(long, env = "DOCQA_EMBEDDING_BACKEND", value_enum, default_value = "cohere")]
    pub embedding_backend: EmbeddingBackend,

    /// Embedding model (backend default when unset)
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Embedding endpoint base URL (backend default when unset)
    #[arg(long, env = "DOCQA_EMBEDDING_URL")]
    pub embedding_url: Option<String>,

    /// Requested embedding dimensions (OpenAI only)
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Chunks per embedding request while indexing
    #[arg(long, env = "DOCQA_EMBED_BATCH_SIZE", default_value_t = 8)]
    pub embed_batch_size: usize,

    /// Milliseconds to pause between embedding batches
    #[arg(long, env = "DOCQA_EMBED_PAUSE_MS", default_value_t = 3000)]
    pub embed_pause_ms: u64,

    /// Seconds before an embedding request times out
    #[arg(long, env = "DOCQA_EMBED_TIMEOUT", default_value_t = 40)]
    pub embed_timeout_secs: u64,

    /// Directory holding the vector collection
    #[arg(long, env = "DOCQA_COLLECTION_DIR", default_value = "collection")]
    pub collection_dir: PathBuf,

    /// Collection name
    #[arg(long, env = "DOCQA_COLLECTION_NAME", default_value = "Linux_Philosophy")]
    pub collection_name: String,

    /// Drop existing records before indexing
    #[arg(long, env = "DOCQA_REBUILD", default_value_t = false)]
    pub rebuild: bool,

    /// Chunks retrieved per question
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = 10)]
    pub top_k: usize,

    /// Retrieval strategy
    #[arg(long, env = "DOCQA_SEARCH_TYPE", value_enum, default_value = "mmr")]
    pub search_type: SearchKind,

    /// Candidates fetched before MMR reranking
    #[arg(long, env = "DOCQA_FETCH_K", default_value_t = 50)]
    pub fetch_k: usize,

    /// MMR relevance/diversity balance
    #[arg(long, env = "DOCQA_MMR_LAMBDA", default_value_t = 0.5)]
    pub mmr_lambda: f32,

    /// Query embeddings cached in memory (0 disables)
    #[arg(long, env = "DOCQA_QUERY_CACHE_SIZE", default_value_t = 256)]
    pub query_cache_size: usize,

    /// Chat provider
    #[arg(long, env = "DOCQA_CHAT_PROVIDER", value_enum, default_value = "cohere")]
    pub chat_provider: ProviderKind,

    /// Chat model (provider default when unset)
    #[arg(long, env = "DOCQA_CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "DOCQA_TEMPERATURE", default_value_t = 0.3)]
    pub temperature: f32,

    /// Completion length cap
    #[arg(long, env = "DOCQA_MAX_TOKENS", default_value_t = 256)]
    pub max_tokens: usize,

    /// Seconds before a chat request times out
    #[arg(long, env = "DOCQA_CHAT_TIMEOUT", default_value_t = 60)]
    pub chat_timeout_secs: u64,

    /// Evaluation answers file
    #[arg(long, env = "DOCQA_ANSWERS_PATH", default_value = "answers.json")]
    pub answers_path: PathBuf,

    /// Cohere credential
    #[arg(long, env = "COHERE_API_KEY", hide_env_values = true)]
    pub cohere_api_key: Option<String>,

    /// OpenAI credential
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Anthropic credential
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,
}

impl ConfigArgs {
    /// Converts the parsed flags into a `PipelineConfig`.
    pub fn build_config(&self) -> PipelineConfig {
        let search = match self.search_type {
            SearchKind::Similarity => SearchType::Similarity,
            SearchKind::Mmr => SearchType::Mmr {
                fetch_k: self.fetch_k,
                lambda: self.mmr_lambda,
            },
        };
        PipelineConfig {
            sources: SourcesConfig {
                pdf_path: self.pdf_path.clone(),
                html_dir: self.html_dir.clone(),
                web_url: self.web_url.clone(),
                page_cache_dir: self.cache_dir.clone(),
                wikipedia_titles: self.titles_vec(),
                wikipedia_lang: self.wikipedia_lang.clone(),
                mirror_base_url: self.mirror_url.clone(),
                timeout_secs: self.fetch_timeout_secs,
            },
            normalize_sources: self.normalize.clone(),
            splitter: SplitterConfig {
                chunk_size: self.chunk_size,
                overlap: self.chunk_overlap,
                unit: self.split_unit,
                mode: self.split_mode,
            },
            embedding: EmbeddingConfig {
                backend: self.embedding_backend,
                model: self.embedding_model.clone(),
                base_url: self.embedding_url.clone(),
                api_key: match self.embedding_backend {
                    EmbeddingBackend::Cohere => self.cohere_api_key.clone(),
                    EmbeddingBackend::OpenAi => self.openai_api_key.clone(),
                    EmbeddingBackend::Local => None,
                },
                dimensions: self.embedding_dimensions,
                batch_size: self.embed_batch_size.max(1),
                pause: Duration::from_millis(self.embed_pause_ms),
                timeout: Duration::from_secs(self.embed_timeout_secs),
            },
            store: StoreConfig {
                collection_dir: self.collection_dir.clone(),
                collection_name: self.collection_name.clone(),
            },
            retriever: RetrieverConfig {
                k: self.top_k.max(1),
                search,
                cache_size: self.query_cache_size,
            },
            generation: GenerationConfig {
                provider: self.chat_provider,
                model: self.chat_model.clone(),
                api_key: match self.chat_provider {
                    ProviderKind::Cohere => self.cohere_api_key.clone(),
                    ProviderKind::OpenAi => self.openai_api_key.clone(),
                    ProviderKind::Anthropic => self.anthropic_api_key.clone(),
                },
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                timeout: Duration::from_secs(self.chat_timeout_secs),
            },
            rebuild_index: self.rebuild,
            answers_path: self.answers_path.clone(),
        }
    }

    fn titles_vec(&self) -> Vec<String> {
        self.wikipedia_titles
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
