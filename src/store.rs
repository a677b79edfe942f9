//! Vector store abstraction and backends.
//!
//! The [`VectorStore`] trait covers the three operations the pipeline
//! needs: idempotent collection creation, acknowledged point upserts, and
//! cosine-similarity search with an optional locale filter. The production
//! backend is [`QdrantStore`], a thin client over the Qdrant REST API;
//! [`InMemoryStore`] is a brute-force implementation for tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::VectorStoreConfig;
use crate::embedding::cosine_similarity;
use crate::locale::Locale;
use crate::models::{Point, PointPayload, RetrievalHit};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection at the given dimensionality if it doesn't
    /// exist. Idempotent; only a "not found" existence check is recovered,
    /// any other store error propagates.
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Upsert a batch of points, waiting for the write to be acknowledged.
    /// No-op on empty input.
    async fn upsert_points(&self, points: &[Point]) -> Result<()>;

    /// Similarity search, most-similar first. When `locale` is supplied,
    /// results are constrained to points whose payload locale matches it
    /// exactly.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        locale: Option<Locale>,
    ) -> Result<Vec<RetrievalHit>>;
}

// ============ Qdrant backend ============

pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl QdrantStore {
    /// Build a client from configuration. An API key is picked up from
    /// `QDRANT_API_KEY` when present (hosted clusters require it).
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: std::env::var("QDRANT_API_KEY").ok(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: serde_json::Value,
    score: f64,
    payload: Option<PointPayload>,
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);

        let response = self.request(self.http.get(&url)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            bail!("vector store existence check failed ({}): {}", status, body);
        }

        let body = serde_json::json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        let response = self
            .request(self.http.put(&url))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("vector store collection create failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn upsert_points(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let url = format!("{}/collections/{}/points", self.base_url, self.collection);
        let body = serde_json::json!({ "points": points });
        let response = self
            .request(self.http.put(&url))
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("vector store upsert failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        locale: Option<Locale>,
    ) -> Result<Vec<RetrievalHit>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );

        let mut body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(locale) = locale {
            body["filter"] = serde_json::json!({
                "must": [{ "key": "locale", "match": { "value": locale.as_str() } }]
            });
        }

        let response = self.request(self.http.post(&url)).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("vector store search failed ({}): {}", status, body);
        }

        let parsed: SearchResponse = response.json().await?;
        let hits = parsed
            .result
            .into_iter()
            .filter_map(|entry| {
                let payload = entry.payload?;
                let id = match entry.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some(RetrievalHit {
                    id,
                    score: entry.score,
                    payload,
                })
            })
            .collect();

        Ok(hits)
    }
}

// ============ In-memory backend ============

/// Brute-force in-memory store for tests. Upserts replace by id, search is
/// a full scan with cosine similarity.
pub struct InMemoryStore {
    points: RwLock<HashMap<String, Point>>,
    dimension: RwLock<Option<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
            dimension: RwLock::new(None),
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.read().unwrap().len()
    }

    pub fn point_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.points.read().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut dim = self.dimension.write().unwrap();
        match *dim {
            Some(existing) if existing != dimension => {
                bail!(
                    "collection already exists at dimension {}, requested {}",
                    existing,
                    dimension
                )
            }
            _ => {
                *dim = Some(dimension);
                Ok(())
            }
        }
    }

    async fn upsert_points(&self, points: &[Point]) -> Result<()> {
        let mut stored = self.points.write().unwrap();
        for point in points {
            stored.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        locale: Option<Locale>,
    ) -> Result<Vec<RetrievalHit>> {
        let stored = self.points.read().unwrap();
        let mut hits: Vec<RetrievalHit> = stored
            .values()
            .filter(|point| locale.map_or(true, |l| point.payload.locale == l))
            .map(|point| RetrievalHit {
                id: point.id.clone(),
                score: cosine_similarity(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::local_embed;
    use crate::models::point_id;

    fn make_point(source_id: &str, chunk_index: i64, locale: Locale, text: &str) -> Point {
        Point {
            id: point_id(source_id, chunk_index),
            vector: local_embed(text, 128),
            payload: PointPayload {
                source_id: source_id.to_string(),
                title: source_id.to_string(),
                locale,
                url: format!("/{}", source_id),
                updated_at: None,
                chunk_index,
                text: text.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        let points = vec![
            make_point("content:page.home:en", 0, Locale::En, "welcome to the guesthouse"),
            make_point("content:page.home:en", 1, Locale::En, "rooms and rates overview"),
        ];
        store.upsert_points(&points).await.unwrap();
        let first_ids = store.point_ids();

        store.upsert_points(&points).await.unwrap();
        assert_eq!(store.point_count(), 2, "re-upsert must not grow the store");
        assert_eq!(store.point_ids(), first_ids);
    }

    #[tokio::test]
    async fn test_locale_filter_is_exact() {
        let store = InMemoryStore::new();
        store
            .upsert_points(&[
                make_point("hotel:flamingo:en", 0, Locale::En, "flamingo apartment amenities"),
                make_point("hotel:flamingo:de", 0, Locale::De, "flamingo apartment ausstattung"),
            ])
            .await
            .unwrap();

        let query = local_embed("flamingo amenities", 128);
        let hits = store.search(&query, 10, Some(Locale::De)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.locale, Locale::De);

        let all = store.search(&query, 10, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = InMemoryStore::new();
        store
            .upsert_points(&[
                make_point("a", 0, Locale::En, "flamingo apartment air conditioning"),
                make_point("b", 0, Locale::En, "monthly billing and invoices"),
            ])
            .await
            .unwrap();

        let query = local_embed("flamingo apartment air conditioning", 128);
        let hits = store.search(&query, 2, None).await.unwrap();
        assert_eq!(hits[0].payload.source_id, "a");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_ensure_collection_dimension_conflict() {
        let store = InMemoryStore::new();
        store.ensure_collection(128).await.unwrap();
        store.ensure_collection(128).await.unwrap();
        assert!(store.ensure_collection(256).await.is_err());
    }
}
