use crate::client::SharedHttpClient;
use crate::config::GeminiConfig;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_NGRAM_DIMENSIONS: usize = 128;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::BackendResponse {
                backend: "embedder".to_string(),
                details: "empty embedding response".to_string(),
            })
    }
}

pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: SharedHttpClient,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig, client: SharedHttpClient) -> Self {
        Self { config, client }
    }

    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let client = self.client.get().await?;
        let response = client
            .post(self.config.model_url(&self.config.embedding_model, "embedContent"))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({
                "model": format!("models/{}", self.config.embedding_model),
                "content": { "parts": [{ "text": text }] },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("gemini-embed", status, &body));
        }

        let parsed: Value = response.json().await?;
        parse_embedding(&parsed, self.config.embedding_dimensions)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_single(text).await?);
        }
        tracing::debug!(count = vectors.len(), "gemini embeddings created");
        Ok(vectors)
    }
}

fn parse_embedding(payload: &Value, dimensions: usize) -> Result<Vec<f32>, ProviderError> {
    let values = payload
        .pointer("/embedding/values")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: "gemini-embed".to_string(),
            details: "response has no embedding.values".to_string(),
        })?;

    let vector = values
        .iter()
        .map(|value| value.as_f64().map(|number| number as f32))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: "gemini-embed".to_string(),
            details: "embedding contains non-numeric values".to_string(),
        })?;

    if vector.len() != dimensions {
        return Err(ConfigError::DimensionMismatch {
            expected: dimensions,
            actual: vector.len(),
        }
        .into());
    }

    Ok(vector)
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_NGRAM_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for c in window {
                let mut buffer = [0u8; 4];
                for byte in c.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ngram_vectors_are_deterministic_and_normalized() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.vectorize("Hydraulic pressure and flow");
        let second = embedder.vectorize("Hydraulic pressure and flow");
        assert_eq!(first, second);

        let norm = first.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_dimension() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|vector| vector.len() == 32));
        assert_eq!(vectors[1], embedder.vectorize("gamma delta"));
    }

    #[tokio::test]
    async fn embed_one_unwraps_the_single_batch() {
        let embedder = CharacterNgramEmbedder::default();
        let vector = embedder.embed_one("serial number").await.unwrap();
        assert_eq!(vector, embedder.vectorize("serial number"));
    }

    #[tokio::test]
    async fn gemini_empty_batch_makes_no_request() {
        let config = GeminiConfig::new("test-key").unwrap();
        let client = SharedHttpClient::default();
        let embedder = GeminiEmbedder::new(config, client.clone());

        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
        assert!(!client.is_initialized());
    }

    #[test]
    fn gemini_payload_is_parsed_and_dimension_checked() {
        let payload = json!({ "embedding": { "values": [0.25, -0.5, 1.0] } });
        assert_eq!(parse_embedding(&payload, 3).unwrap(), vec![0.25, -0.5, 1.0]);
        assert!(matches!(
            parse_embedding(&payload, 768),
            Err(ProviderError::Config(ConfigError::DimensionMismatch {
                expected: 768,
                actual: 3
            }))
        ));
        assert!(matches!(
            parse_embedding(&json!({ "error": {} }), 3),
            Err(ProviderError::BackendResponse { .. })
        ));
    }
}
