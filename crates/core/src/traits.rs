use crate::error::ProviderError;
use crate::models::{ChatTurn, IndexQuery, IndexedRecord, Match};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), ProviderError>;

    /// At most `top_k` matches, highest score first.
    async fn query(&self, query: &IndexQuery) -> Result<Vec<Match>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait DocumentDescriber: Send + Sync {
    async fn describe_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError>;
}
