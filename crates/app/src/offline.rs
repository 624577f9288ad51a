use async_trait::async_trait;
use vault_rag_core::{ConfigError, GenerationRequest, ProviderError, TextGenerator};

/// Used when no Gemini key is configured.
pub struct MissingGenerator;

#[async_trait]
impl TextGenerator for MissingGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ConfigError::MissingCredential("GOOGLE_GENERATIVE_AI_API_KEY".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_rag_core::{ChatTurn, ProviderCategory};

    #[tokio::test]
    async fn generation_reports_missing_credential() {
        let request = GenerationRequest {
            system: "system".to_string(),
            messages: vec![ChatTurn::user("hello")],
            max_tokens: None,
        };
        let error = MissingGenerator.generate(&request).await.unwrap_err();
        assert_eq!(error.category(), ProviderCategory::Unauthorized);
        assert!(error.to_string().contains("GOOGLE_GENERATIVE_AI_API_KEY"));
    }
}
