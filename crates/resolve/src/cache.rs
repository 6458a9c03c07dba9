use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// In-memory embedding cache keyed by content hash. Fragments repeat
/// heavily across questions ("milk", "northeast"), so this saves a
/// round trip to the embedding service for most of them.
pub struct EmbeddingCache {
    embeddings: Arc<DashMap<String, Vec<f32>>>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            embeddings: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    pub fn set(&self, text: &str, embedding: Vec<f32>) {
        if self.embeddings.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .embeddings
                .iter()
                .take(self.max_entries / 4)
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.embeddings.remove(&key);
            }
        }
        let key = hash_text(text);
        self.embeddings.insert(key, embedding);
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = hash_text(text);
        self.embeddings.get(&key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = EmbeddingCache::new(10);
        cache.set("organic milk", vec![0.1, 0.2]);
        assert_eq!(cache.get("organic milk"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("whole milk"), None);
    }

    #[test]
    fn test_eviction_keeps_cache_bounded() {
        let cache = EmbeddingCache::new(8);
        for i in 0..20 {
            cache.set(&format!("fragment-{i}"), vec![i as f32]);
        }
        assert!(cache.len() <= 8);
    }
}
