use crate::client::SharedHttpClient;
use crate::config::QdrantConfig;
use crate::error::{ConfigError, ProviderError};
use crate::models::{IndexQuery, IndexedRecord, Match, MetadataFilter};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

pub struct QdrantIndex {
    config: QdrantConfig,
    client: SharedHttpClient,
}

impl QdrantIndex {
    pub fn new(config: QdrantConfig, client: SharedHttpClient) -> Self {
        Self { config, client }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.config.endpoint.as_str().trim_end_matches('/'),
            self.config.collection,
            suffix
        )
    }

    /// Creates the collection with cosine distance when it does not exist.
    pub async fn ensure_collection(&self) -> Result<(), ProviderError> {
        let client = self.client.get().await?;
        let response = client.get(self.collection_url("")).send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        let response = client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": { "size": self.config.dimensions, "distance": "Cosine" }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("qdrant", status, &body));
        }
        tracing::info!(collection = %self.config.collection, "qdrant collection created");
        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), ConfigError> {
        if actual != self.config.dimensions {
            return Err(ConfigError::DimensionMismatch {
                expected: self.config.dimensions,
                actual,
            });
        }
        Ok(())
    }
}

/// Qdrant only accepts integer or UUID point ids.
pub fn point_id(record_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes())
}

fn filter_body(filter: &MetadataFilter) -> Value {
    match filter {
        MetadataFilter::FileName(name) => json!({
            "must": [{ "key": "fileName", "match": { "value": name } }]
        }),
    }
}

fn hit_to_match(hit: &Value) -> Match {
    Match {
        text: hit
            .pointer("/payload/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        file_name: hit
            .pointer("/payload/fileName")
            .and_then(Value::as_str)
            .map(str::to_string),
        page_number: hit
            .pointer("/payload/pageNumber")
            .and_then(Value::as_u64)
            .map(|page| page as u32),
        score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), ProviderError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| -> Result<Value, ProviderError> {
                self.check_dimension(record.vector.len())?;
                let mut payload = serde_json::to_value(&record.metadata)?;
                if let Some(object) = payload.as_object_mut() {
                    object.insert("recordId".to_string(), json!(record.id));
                }
                Ok(json!({
                    "id": point_id(&record.id),
                    "vector": record.vector,
                    "payload": payload,
                }))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        let client = self.client.get().await?;
        let response = client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("qdrant", status, &body));
        }

        Ok(())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<Match>, ProviderError> {
        self.check_dimension(query.vector.len())?;

        let mut body = json!({
            "vector": query.vector,
            "limit": query.top_k,
            "with_payload": true,
        });
        if let Some(filter) = &query.filter {
            body["filter"] = filter_body(filter);
        }

        let client = self.client.get().await?;
        let response = client
            .post(self.collection_url("/points/search"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("qdrant", status, &body));
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(hits.iter().map(hit_to_match).take(query.top_k).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_stable_per_record_id() {
        assert_eq!(point_id("manual_pdf-0-1"), point_id("manual_pdf-0-1"));
        assert_ne!(point_id("manual_pdf-0-1"), point_id("manual_pdf-1-1"));
    }

    #[test]
    fn filter_matches_file_name_payload_key() {
        let body = filter_body(&MetadataFilter::FileName("manual.pdf".to_string()));
        assert_eq!(body.pointer("/must/0/key"), Some(&json!("fileName")));
        assert_eq!(body.pointer("/must/0/match/value"), Some(&json!("manual.pdf")));
    }

    #[test]
    fn search_hit_is_read_from_payload() {
        let hit = json!({
            "id": "6f1c",
            "score": 0.82,
            "payload": { "fileName": "manual.pdf", "pageNumber": 4, "text": "torque specs" }
        });
        let found = hit_to_match(&hit);
        assert_eq!(found.text, "torque specs");
        assert_eq!(found.file_name.as_deref(), Some("manual.pdf"));
        assert_eq!(found.page_number, Some(4));
        assert!((found.score - 0.82).abs() < 1e-6);
    }
}
