pub mod neo4j;

pub use neo4j::Neo4jExpander;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use resolve::{EntityKind, EntityRef};

/// How an entity entered the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Resolved directly from the question text.
    Direct,
    /// Sibling product sharing a category with a direct product.
    SameCategory,
    /// Sibling store sharing a market with a direct location.
    SameMarket,
}

/// An entity plus its provenance. `via` holds the canonical id of the
/// direct entity a sibling was derived from; it is `None` exactly when
/// the relation is `Direct`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedRef {
    pub entity: EntityRef,
    pub relation: RelationKind,
    pub via: Option<String>,
}

impl ExpandedRef {
    pub fn direct(entity: EntityRef) -> Self {
        Self {
            entity,
            relation: RelationKind::Direct,
            via: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpanderConfig {
    pub product_sibling_cap: usize,
    pub store_sibling_cap: usize,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            product_sibling_cap: 8,
            store_sibling_cap: 20,
        }
    }
}

/// One-hop sibling expansion. `preferred` carries prior-turn entity
/// ids; siblings seen in earlier turns win cap tie-breaks. An
/// implementation must degrade to passing the direct references
/// through unchanged when the graph is down; expansion never fails a
/// query.
#[async_trait]
pub trait Expander: Send + Sync {
    async fn expand(&self, direct: &[EntityRef], preferred: &BTreeSet<String>) -> Vec<ExpandedRef>;
}

/// Used when no graph backend is configured. Direct references pass
/// through unchanged.
pub struct NoopExpander;

#[async_trait]
impl Expander for NoopExpander {
    async fn expand(&self, direct: &[EntityRef], _preferred: &BTreeSet<String>) -> Vec<ExpandedRef> {
        direct.iter().cloned().map(ExpandedRef::direct).collect()
    }
}

/// Apply the sibling cap for one entity kind deterministically:
/// preferred ids first, then ascending canonical id.
pub fn apply_sibling_cap(
    mut siblings: Vec<ExpandedRef>,
    cap: usize,
    preferred: &BTreeSet<String>,
) -> Vec<ExpandedRef> {
    siblings.sort_by(|a, b| a.entity.canonical_id.cmp(&b.entity.canonical_id));
    siblings.dedup_by(|a, b| a.entity.canonical_id == b.entity.canonical_id);
    siblings.sort_by_key(|s| !preferred.contains(&s.entity.canonical_id));
    siblings.truncate(cap);
    siblings
}

pub fn cap_for(config: &ExpanderConfig, kind: EntityKind) -> usize {
    match kind {
        EntityKind::Product => config.product_sibling_cap,
        EntityKind::Location => config.store_sibling_cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> EntityRef {
        EntityRef {
            kind: EntityKind::Product,
            canonical_id: id.to_string(),
            display_name: id.to_string(),
            confidence: 1.0,
        }
    }

    fn sibling(id: &str, via: &str) -> ExpandedRef {
        ExpandedRef {
            entity: entity(id),
            relation: RelationKind::SameCategory,
            via: Some(via.to_string()),
        }
    }

    #[test]
    fn test_cap_is_deterministic_ascending_id() {
        let siblings = vec![
            sibling("P-300", "P-001"),
            sibling("P-100", "P-001"),
            sibling("P-200", "P-001"),
        ];
        let capped = apply_sibling_cap(siblings, 2, &BTreeSet::new());
        let ids: Vec<&str> = capped.iter().map(|s| s.entity.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["P-100", "P-200"]);
    }

    #[test]
    fn test_cap_prefers_prior_turn_ids() {
        let siblings = vec![
            sibling("P-100", "P-001"),
            sibling("P-200", "P-001"),
            sibling("P-300", "P-001"),
        ];
        let preferred = BTreeSet::from(["P-300".to_string()]);
        let capped = apply_sibling_cap(siblings, 2, &preferred);
        let ids: Vec<&str> = capped.iter().map(|s| s.entity.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["P-300", "P-100"]);
    }

    #[test]
    fn test_cap_dedups_shared_siblings() {
        let siblings = vec![
            sibling("P-100", "P-001"),
            sibling("P-100", "P-002"),
        ];
        let capped = apply_sibling_cap(siblings, 8, &BTreeSet::new());
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_noop_passes_direct_through() {
        let direct = vec![entity("P-001"), entity("P-002")];
        let expanded = NoopExpander.expand(&direct, &BTreeSet::new()).await;
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|e| e.relation == RelationKind::Direct && e.via.is_none()));
    }
}
