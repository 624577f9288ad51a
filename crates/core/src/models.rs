use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const MAX_FILE_SIZE_BYTES: usize = 20 * 1024 * 1024;
pub const MAX_VISION_BYTES: usize = 4 * 1024 * 1024;
pub const METADATA_TEXT_CAP: usize = 1_000;

pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const FALLBACK_CANDIDATES: usize = 15;
pub const FINAL_RESULTS: usize = 5;
pub const CONDENSE_TURNS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Paged,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let is_pdf = file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            Self::Paged
        } else {
            Self::Text
        }
    }
}

/// A trimmed slice of a source text. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub file_name: String,
    pub page_number: Option<u32>,
    pub text: String,
    pub vision_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataFilter {
    FileName(String),
}

impl MetadataFilter {
    pub fn from_scope(scope: Option<&str>) -> Option<Self> {
        scope
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "all")
            .map(|value| Self::FileName(value.to_string()))
    }

    pub fn matches(&self, metadata: &RecordMetadata) -> bool {
        match self {
            Self::FileName(name) => metadata.file_name == *name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub text: String,
    pub file_name: Option<String>,
    pub page_number: Option<u32>,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedPrompt {
    pub raw_question: String,
    pub search_query: String,
    pub top_score: f32,
    pub used_keyword_fallback: bool,
    pub matches: Vec<Match>,
    pub context: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSource {
    pub file_name: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ParsedSource>,
    pub prompt: PreparedPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestOutcome {
    Indexed {
        success: bool,
        #[serde(rename = "chunksCount")]
        chunks_count: usize,
    },
    Rejected {
        success: bool,
        error: String,
    },
}

impl IngestOutcome {
    pub fn indexed(chunks_count: usize) -> Self {
        Self::Indexed {
            success: true,
            chunks_count,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self::Rejected {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_file_bytes: usize,
    pub max_vision_bytes: usize,
    pub metadata_text_cap: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
            max_vision_bytes: MAX_VISION_BYTES,
            metadata_text_cap: METADATA_TEXT_CAP,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub threshold: f32,
    pub fallback_candidates: usize,
    pub final_results: usize,
    pub condense_turns: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            threshold: LOW_CONFIDENCE_THRESHOLD,
            fallback_candidates: FALLBACK_CANDIDATES,
            final_results: FINAL_RESULTS,
            condense_turns: CONDENSE_TURNS,
        }
    }
}
