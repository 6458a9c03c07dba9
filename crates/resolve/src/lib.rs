pub mod cache;
pub mod embeddings;
pub mod resolver;
pub mod search;

pub use cache::EmbeddingCache;
pub use embeddings::EmbeddingClient;
pub use resolver::{EntityResolver, ResolverConfig};
pub use search::{EntitySearch, SearchHit, VectorIndexClient};

use serde::{Deserialize, Serialize};

/// The two entity families the vector indexes cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Location,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Location => "location",
        }
    }
}

/// A resolved entity mention. Per-query only, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub canonical_id: String,
    pub display_name: String,
    pub confidence: f32,
}
