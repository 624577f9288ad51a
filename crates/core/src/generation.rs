use crate::client::SharedHttpClient;
use crate::config::GeminiConfig;
use crate::error::ProviderError;
use crate::models::Role;
use crate::traits::{DocumentDescriber, GenerationRequest, TextGenerator};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};

pub const VISION_MAX_TOKENS: u32 = 1_024;

const VISION_INSTRUCTION: &str = "Describe any images, charts, figures, or tables in this \
document. Be concise. If there are none, say 'No images or tables detected.'";

/// Gemini `generateContent` client bound to one model.
pub struct GeminiGenerator {
    config: GeminiConfig,
    client: SharedHttpClient,
    model: String,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig, client: SharedHttpClient, model: impl Into<String>) -> Self {
        Self {
            config,
            client,
            model: model.into(),
        }
    }

    pub fn answering(config: GeminiConfig, client: SharedHttpClient) -> Self {
        let model = config.generation_model.clone();
        Self::new(config, client, model)
    }

    pub fn condensing(config: GeminiConfig, client: SharedHttpClient) -> Self {
        let model = config.condense_model.clone();
        Self::new(config, client, model)
    }

    pub fn vision(config: GeminiConfig, client: SharedHttpClient) -> Self {
        let model = config.vision_model.clone();
        Self::new(config, client, model)
    }

    async fn generate_content(&self, body: &Value) -> Result<String, ProviderError> {
        let client = self.client.get().await?;
        let response = client
            .post(self.config.model_url(&self.model, "generateContent"))
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("gemini", status, &body));
        }

        let parsed: Value = response.json().await?;
        Ok(candidate_text(&parsed))
    }
}

pub(crate) fn request_body(request: &GenerationRequest) -> Value {
    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|turn| turn.role != Role::System)
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                _ => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.content }] })
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if !request.system.trim().is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": request.system }] });
    }
    if let Some(max_tokens) = request.max_tokens {
        body["generationConfig"] = json!({ "maxOutputTokens": max_tokens });
    }
    body
}

fn candidate_text(payload: &Value) -> String {
    payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.generate_content(&request_body(request)).await
    }
}

#[async_trait]
impl DocumentDescriber for GeminiGenerator {
    async fn describe_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(bytes) } },
                    { "text": VISION_INSTRUCTION },
                ]
            }],
            "generationConfig": { "maxOutputTokens": VISION_MAX_TOKENS },
        });
        self.generate_content(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatTurn;

    #[test]
    fn request_maps_roles_and_system_instruction() {
        let request = GenerationRequest {
            system: "Answer from excerpts.".to_string(),
            messages: vec![
                ChatTurn::user("What was Q3 profit?"),
                ChatTurn::assistant("$4M."),
                ChatTurn::user("Who managed it?"),
            ],
            max_tokens: Some(150),
        };

        let body = request_body(&request);
        assert_eq!(body["contents"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["contents"][1]["role"], json!("model"));
        assert_eq!(body["contents"][2]["parts"][0]["text"], json!("Who managed it?"));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("Answer from excerpts.")
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(150));
    }

    #[test]
    fn request_without_limit_has_no_generation_config() {
        let request = GenerationRequest {
            system: String::new(),
            messages: vec![ChatTurn::user("hi")],
            max_tokens: None,
        };
        let body = request_body(&request);
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn candidate_parts_are_concatenated() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "The chart " }, { "text": "shows revenue. " }] } }]
        });
        assert_eq!(candidate_text(&payload), "The chart shows revenue.");
        assert_eq!(candidate_text(&json!({ "candidates": [] })), "");
    }
}
