use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::EntityKind;
use crate::cache::EmbeddingCache;
use crate::embeddings::EmbeddingClient;

/// One scored candidate from a vector index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub canonical_id: String,
    pub display_name: String,
    pub score: f32,
    /// Category (products) or market (locations) label, kept as a
    /// display hint for the prompt.
    pub group_label: Option<String>,
}

/// Seam for the vector search backend so the resolver can be tested
/// without a running index.
#[async_trait]
pub trait EntitySearch: Send + Sync {
    async fn search(&self, kind: EntityKind, text: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}

/// REST client for the vector index: one collection per entity kind.
pub struct VectorIndexClient {
    base_url: String,
    product_collection: String,
    location_collection: String,
    embedding_client: EmbeddingClient,
    embedding_cache: Arc<EmbeddingCache>,
    client: reqwest::Client,
}

impl VectorIndexClient {
    pub fn new(
        base_url: String,
        product_collection: String,
        location_collection: String,
        embedding_client: EmbeddingClient,
        embedding_cache: Arc<EmbeddingCache>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build vector index HTTP client")?;
        Ok(Self {
            base_url,
            product_collection,
            location_collection,
            embedding_client,
            embedding_cache,
            client,
        })
    }

    fn collection_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Product => &self.product_collection,
            EntityKind::Location => &self.location_collection,
        }
    }

    async fn embed_cached(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.embedding_cache.get(text) {
            return Ok(hit);
        }
        let embedding = self.embedding_client.embed(text).await?;
        self.embedding_cache.set(text, embedding.clone());
        Ok(embedding)
    }
}

#[async_trait]
impl EntitySearch for VectorIndexClient {
    async fn search(&self, kind: EntityKind, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let embedding = self
            .embed_cached(text)
            .await
            .context("Failed to embed search fragment")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url,
            self.collection_for(kind)
        );

        let body = json!({
            "vector": embedding,
            "limit": top_k,
            "with_payload": true
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send vector search request")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Vector search failed: {}", error_text);
        }

        let result: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse vector search response")?;

        let points = result["result"]
            .as_array()
            .context("Invalid vector search response format")?;

        let mut hits = Vec::new();
        for point in points {
            let score = point["score"].as_f64().unwrap_or(0.0) as f32;
            let payload = point["payload"].as_object().context("Missing payload")?;

            let canonical_id = payload
                .get("entity_id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let display_name = payload
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let group_label = payload
                .get("group")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());

            if !canonical_id.is_empty() {
                hits.push(SearchHit {
                    canonical_id,
                    display_name,
                    score,
                    group_label,
                });
            }
        }

        Ok(hits)
    }
}
