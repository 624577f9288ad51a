use crate::error::ConfigError;
use url::Url;

pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
pub const PINECONE_INDEX_HOST_ENV: &str = "PINECONE_INDEX_HOST";
pub const QDRANT_URL_ENV: &str = "QDRANT_URL";
pub const QDRANT_COLLECTION_ENV: &str = "QDRANT_COLLECTION";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CONDENSE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;
pub const DEFAULT_QDRANT_COLLECTION: &str = "nexus-ai";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub generation_model: String,
    pub condense_model: String,
    pub vision_model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require(GEMINI_API_KEY_ENV, api_key.into())?,
            base_url: parse_endpoint(DEFAULT_GEMINI_BASE_URL)?,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: GEMINI_EMBEDDING_DIMENSIONS,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            condense_model: DEFAULT_CONDENSE_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(read_env(GEMINI_API_KEY_ENV)?)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_endpoint(base_url)?;
        Ok(self)
    }

    pub fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.as_str().trim_end_matches('/'),
            model,
            method
        )
    }
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_host: Url,
    pub namespace: Option<String>,
    pub dimensions: usize,
}

impl PineconeConfig {
    pub fn new(
        api_key: impl Into<String>,
        index_host: &str,
        dimensions: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require(PINECONE_API_KEY_ENV, api_key.into())?,
            index_host: parse_endpoint(&with_scheme(&require(
                PINECONE_INDEX_HOST_ENV,
                index_host.to_string(),
            )?))?,
            namespace: None,
            dimensions,
        })
    }

    pub fn from_env(dimensions: usize) -> Result<Self, ConfigError> {
        Self::new(
            read_env(PINECONE_API_KEY_ENV)?,
            &read_env(PINECONE_INDEX_HOST_ENV)?,
            dimensions,
        )
    }
}

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub endpoint: Url,
    pub collection: String,
    pub dimensions: usize,
}

impl QdrantConfig {
    pub fn new(endpoint: &str, collection: &str, dimensions: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            collection: require(QDRANT_COLLECTION_ENV, collection.to_string())?,
            dimensions,
        })
    }

    pub fn from_env(dimensions: usize) -> Result<Self, ConfigError> {
        let collection = std::env::var(QDRANT_COLLECTION_ENV)
            .unwrap_or_else(|_| DEFAULT_QDRANT_COLLECTION.to_string());
        Self::new(&read_env(QDRANT_URL_ENV)?, &collection, dimensions)
    }
}

fn read_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingCredential(name.to_string()))
}

fn require(name: &str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::MissingCredential(name.to_string()));
    }
    Ok(value)
}

fn with_scheme(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    Url::parse(endpoint.trim()).map_err(|source| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_a_missing_credential() {
        let error = GeminiConfig::new("   ").unwrap_err();
        assert!(matches!(error, ConfigError::MissingCredential(name) if name == GEMINI_API_KEY_ENV));
    }

    #[test]
    fn model_url_joins_model_and_method() {
        let config = GeminiConfig::new("key").unwrap();
        assert_eq!(
            config.model_url("text-embedding-004", "embedContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn pinecone_host_without_scheme_gets_https() {
        let config = PineconeConfig::new("key", "vault-abc123.svc.pinecone.io", 768).unwrap();
        assert_eq!(config.index_host.scheme(), "https");
        assert_eq!(
            config.index_host.host_str(),
            Some("vault-abc123.svc.pinecone.io")
        );
    }

    #[test]
    fn qdrant_rejects_unparseable_endpoint() {
        let error = QdrantConfig::new("not a url", "vault", 768).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidEndpoint { .. }));
    }
}
