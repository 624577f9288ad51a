use crate::error::{ConfigError, ProviderError};
use crate::models::{IndexQuery, IndexedRecord, Match};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Brute-force cosine index kept in process memory.
pub struct InMemoryIndex {
    dimensions: usize,
    records: RwLock<HashMap<String, IndexedRecord>>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<IndexedRecord> {
        self.records
            .read()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_dimension(&self, actual: usize) -> Result<(), ProviderError> {
        if actual != self.dimensions {
            return Err(ConfigError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            }
            .into());
        }
        Ok(())
    }
}

fn poisoned() -> ProviderError {
    ProviderError::BackendResponse {
        backend: "memory".to_string(),
        details: "index lock poisoned".to_string(),
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<(), ProviderError> {
        for record in records {
            self.check_dimension(record.vector.len())?;
        }

        let mut stored = self.records.write().map_err(|_| poisoned())?;
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<Match>, ProviderError> {
        self.check_dimension(query.vector.len())?;

        let stored = self.records.read().map_err(|_| poisoned())?;
        let mut scored: Vec<(f32, &IndexedRecord)> = stored
            .values()
            .filter(|record| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.matches(&record.metadata))
            })
            .map(|record| (cosine_similarity(&query.vector, &record.vector), record))
            .collect();

        scored.sort_by(|left, right| {
            right
                .0
                .total_cmp(&left.0)
                .then_with(|| left.1.id.cmp(&right.1.id))
        });

        Ok(scored
            .into_iter()
            .take(query.top_k)
            .map(|(score, record)| Match {
                text: record.metadata.text.clone(),
                file_name: Some(record.metadata.file_name.clone()),
                page_number: record.metadata.page_number,
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetadataFilter, RecordMetadata};

    fn record(id: &str, file_name: &str, vector: Vec<f32>) -> IndexedRecord {
        IndexedRecord {
            id: id.to_string(),
            vector,
            metadata: RecordMetadata {
                file_name: file_name.to_string(),
                page_number: Some(1),
                text: format!("text of {id}"),
                vision_description: None,
            },
        }
    }

    #[tokio::test]
    async fn query_orders_by_descending_similarity_and_truncates() {
        let index = InMemoryIndex::new(2);
        index
            .upsert(&[
                record("a", "one.txt", vec![1.0, 0.0]),
                record("b", "one.txt", vec![0.7, 0.7]),
                record("c", "two.txt", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let matches = index
            .query(&IndexQuery {
                vector: vec![1.0, 0.1],
                top_k: 2,
                filter: None,
            })
            .await
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "text of a");
        assert_eq!(matches[1].text, "text of b");
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn file_name_filter_is_exact_equality() {
        let index = InMemoryIndex::new(2);
        index
            .upsert(&[
                record("a", "one.txt", vec![1.0, 0.0]),
                record("c", "one.txt.bak", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = index
            .query(&IndexQuery {
                vector: vec![1.0, 0.0],
                top_k: 10,
                filter: Some(MetadataFilter::FileName("one.txt".to_string())),
            })
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_name.as_deref(), Some("one.txt"));
    }

    #[tokio::test]
    async fn upsert_with_same_id_overwrites() {
        let index = InMemoryIndex::new(2);
        index.upsert(&[record("a", "old.txt", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(&[record("a", "new.txt", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.records()[0].metadata.file_name, "new.txt");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_a_config_error() {
        let index = InMemoryIndex::new(3);
        let error = index
            .upsert(&[record("a", "one.txt", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ProviderError::Config(ConfigError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(index.is_empty());
    }
}
