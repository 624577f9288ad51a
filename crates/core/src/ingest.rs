use crate::chunking::{chunk_with_config, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::{ConfigError, IngestError, ProviderCategory, ProviderError};
use crate::extractor::{DefaultExtractor, ExtractedDocument, TextExtractor};
use crate::models::{
    DocumentKind, IndexedRecord, IngestOutcome, IngestionOptions, RecordMetadata, TextChunk,
};
use crate::traits::{DocumentDescriber, VectorIndex};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn sanitize_id(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect()
}

// config and credential failures would hit every remaining file
fn is_fatal(error: &IngestError) -> bool {
    match error {
        IngestError::Config(_) => true,
        IngestError::Provider(error) => error.category() == ProviderCategory::Unauthorized,
        _ => false,
    }
}

fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub file_name: String,
    pub kind: DocumentKind,
    pub chunks_count: usize,
    pub pages: usize,
    pub vision_described: bool,
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct FolderReport {
    pub ingested: Vec<IngestReport>,
    pub skipped_files: Vec<SkippedDocument>,
}

struct PageChunk {
    page: u32,
    chunk: TextChunk,
}

pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    extractor: Arc<dyn TextExtractor>,
    describer: Option<Arc<dyn DocumentDescriber>>,
    options: IngestionOptions,
    chunking: ChunkingConfig,
}

impl IngestPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        options: IngestionOptions,
    ) -> Result<Self, ConfigError> {
        if embedder.dimensions() != index.dimensions() {
            return Err(ConfigError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }
        let chunking = ChunkingConfig::try_from(&options)?;

        Ok(Self {
            embedder,
            index,
            extractor: Arc::new(DefaultExtractor),
            describer: None,
            options,
            chunking,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_describer(mut self, describer: Arc<dyn DocumentDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    pub async fn ingest(&self, bytes: &[u8], file_name: &str) -> IngestOutcome {
        match self.ingest_bytes(bytes, file_name).await {
            Ok(report) => IngestOutcome::indexed(report.chunks_count),
            Err(error) => {
                tracing::warn!(file = file_name, %error, "ingest rejected");
                IngestOutcome::rejected(error.user_message())
            }
        }
    }

    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        self.ingest_bytes(&bytes, file_name).await
    }

    /// Per-file failures are recorded as skipped; fatal ones abort the run.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<FolderReport, IngestError> {
        let files = discover_documents(folder);
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no supported documents found in {}",
                folder.display()
            )));
        }

        let mut ingested = Vec::new();
        let mut skipped_files = Vec::new();
        for path in files {
            match self.ingest_path(&path).await {
                Ok(report) => ingested.push(report),
                Err(error) if is_fatal(&error) => return Err(error),
                Err(error) => skipped_files.push(SkippedDocument {
                    path,
                    reason: error.user_message(),
                }),
            }
        }

        Ok(FolderReport {
            ingested,
            skipped_files,
        })
    }

    pub async fn ingest_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<IngestReport, IngestError> {
        if bytes.len() > self.options.max_file_bytes {
            return Err(IngestError::FileTooLarge {
                size: bytes.len(),
                limit: self.options.max_file_bytes,
            });
        }
        if file_name.trim().is_empty() {
            return Err(IngestError::InvalidArgument("file name is empty".to_string()));
        }

        let extracted = self.extractor.extract(bytes, file_name)?;
        if !extracted.has_text() {
            return Err(IngestError::EmptyText);
        }

        let chunks = self.chunk_document(&extracted);
        if chunks.is_empty() {
            return Err(IngestError::EmptyText);
        }

        let vision_description = self.describe(&extracted, bytes, file_name).await;

        let texts: Vec<String> = chunks.iter().map(|item| item.chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ProviderError::BackendResponse {
                backend: "embedder".to_string(),
                details: format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    chunks.len()
                ),
            }
            .into());
        }

        let stamp = Utc::now().timestamp_millis();
        let prefix = sanitize_id(file_name);
        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(item, vector)| {
                if vector.len() != self.index.dimensions() {
                    return Err(ConfigError::DimensionMismatch {
                        expected: self.index.dimensions(),
                        actual: vector.len(),
                    });
                }
                Ok(IndexedRecord {
                    id: format!("{prefix}-{}-{stamp}", item.chunk.index),
                    vector,
                    metadata: RecordMetadata {
                        file_name: file_name.to_string(),
                        page_number: Some(item.page),
                        text: truncate_chars(&item.chunk.text, self.options.metadata_text_cap),
                        vision_description: vision_description.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        self.index.upsert(&records).await?;

        tracing::info!(
            file = file_name,
            chunks = records.len(),
            pages = extracted.pages.len(),
            "document ingested"
        );

        Ok(IngestReport {
            file_name: file_name.to_string(),
            kind: extracted.kind,
            chunks_count: records.len(),
            pages: extracted.pages.len(),
            vision_described: vision_description.is_some(),
        })
    }

    fn chunk_document(&self, extracted: &ExtractedDocument) -> Vec<PageChunk> {
        let mut chunks = Vec::new();
        let mut cursor = 0usize;

        for page in &extracted.pages {
            for mut chunk in chunk_with_config(&page.text, self.chunking) {
                chunk.index = cursor;
                cursor += 1;
                chunks.push(PageChunk {
                    page: page.number,
                    chunk,
                });
            }
        }

        chunks
    }

    async fn describe(
        &self,
        extracted: &ExtractedDocument,
        bytes: &[u8],
        file_name: &str,
    ) -> Option<String> {
        let describer = self.describer.as_ref()?;
        if extracted.kind != DocumentKind::Paged || bytes.len() > self.options.max_vision_bytes {
            return None;
        }

        match describer.describe_document(bytes, "application/pdf").await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(file = file_name, %error, "vision description failed");
                None
            }
        }
    }
}
