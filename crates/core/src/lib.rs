pub mod chunking;
pub mod citations;
pub mod client;
pub mod condense;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_with_config, split_text_into_chunks, ChunkingConfig};
pub use citations::{citation_marker, format_excerpts, parse_sources, strip_sources};
pub use client::SharedHttpClient;
pub use condense::condense_conversation;
pub use config::{GeminiConfig, PineconeConfig, QdrantConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, GeminiEmbedder};
pub use error::{AnswerError, ConfigError, IngestError, ProviderCategory, ProviderError};
pub use extractor::{DefaultExtractor, ExtractedDocument, PageText, TextExtractor};
pub use fallback::{extract_keywords, rank_by_keywords};
pub use generation::GeminiGenerator;
pub use ingest::{
    discover_documents, FolderReport, IngestPipeline, IngestReport, SkippedDocument,
};
pub use models::{
    Answer, ChatTurn, DocumentKind, IndexQuery, IndexedRecord, IngestOutcome, IngestionOptions,
    Match, MetadataFilter, ParsedSource, PreparedPrompt, RecordMetadata, RetrievalOptions, Role,
    TextChunk,
};
pub use orchestrator::RetrievalOrchestrator;
pub use stores::{InMemoryIndex, PineconeIndex, QdrantIndex};
pub use traits::{DocumentDescriber, GenerationRequest, TextGenerator, VectorIndex};
