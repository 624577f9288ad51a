use crate::client::SharedHttpClient;
use crate::config::PineconeConfig;
use crate::error::{ConfigError, ProviderError};
use crate::models::{IndexQuery, IndexedRecord, Match, MetadataFilter};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use serde_json::{json, Value};

const UPSERT_BATCH: usize = 100;

/// Pinecone data-plane client for a single serverless index host.
pub struct PineconeIndex {
    config: PineconeConfig,
    client: SharedHttpClient,
}

impl PineconeIndex {
    pub fn new(config: PineconeConfig, client: SharedHttpClient) -> Self {
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.index_host.as_str().trim_end_matches('/'),
            path
        )
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

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let client = self.client.get().await?;
        let response = client
            .post(self.url(path))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", "2024-07")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status("pinecone", status, &body));
        }

        Ok(response.json().await?)
    }
}

fn filter_body(filter: &MetadataFilter) -> Value {
    match filter {
        MetadataFilter::FileName(name) => json!({ "fileName": { "$eq": name } }),
    }
}

fn vector_body(record: &IndexedRecord) -> Result<Value, ProviderError> {
    Ok(json!({
        "id": record.id,
        "values": record.vector,
        "metadata": serde_json::to_value(&record.metadata)?,
    }))
}

fn parse_matches(payload: &Value) -> Vec<Match> {
    payload
        .pointer("/matches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .map(|hit| Match {
                    text: hit
                        .pointer("/metadata/text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    file_name: hit
                        .pointer("/metadata/fileName")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    // Pinecone stores every metadata number as a float.
                    page_number: hit
                        .pointer("/metadata/pageNumber")
                        .and_then(Value::as_f64)
                        .map(|page| page as u32),
                    score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), ProviderError> {
        for record in records {
            self.check_dimension(record.vector.len())?;
        }

        for batch in records.chunks(UPSERT_BATCH) {
            let vectors = batch
                .iter()
                .map(vector_body)
                .collect::<Result<Vec<_>, _>>()?;

            let mut body = json!({ "vectors": vectors });
            if let Some(namespace) = &self.config.namespace {
                body["namespace"] = json!(namespace);
            }

            let response = self.post("vectors/upsert", &body).await?;
            let upserted = response.pointer("/upsertedCount").and_then(Value::as_u64);
            tracing::debug!(upserted, "pinecone upsert batch");
        }

        Ok(())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<Match>, ProviderError> {
        self.check_dimension(query.vector.len())?;

        let mut body = json!({
            "vector": query.vector,
            "topK": query.top_k,
            "includeMetadata": true,
        });
        if let Some(filter) = &query.filter {
            body["filter"] = filter_body(filter);
        }
        if let Some(namespace) = &self.config.namespace {
            body["namespace"] = json!(namespace);
        }

        let payload = self.post("query", &body).await?;
        let mut matches = parse_matches(&payload);
        matches.truncate(query.top_k);
        Ok(matches)
    }
}
