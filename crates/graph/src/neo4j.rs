use anyhow::Result;
use async_trait::async_trait;
use neo4rs::{Graph, Query};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::warn;

use resolve::{EntityKind, EntityRef};

use crate::{Expander, ExpandedRef, ExpanderConfig, RelationKind, apply_sibling_cap, cap_for};

// Raw fetch bound per sibling query, before the configured cap.
const FETCH_LIMIT: usize = 200;

pub struct Neo4jExpander {
    graph: Graph,
    config: ExpanderConfig,
    query_timeout: Duration,
}

impl Neo4jExpander {
    pub fn new(graph: Graph, config: ExpanderConfig, query_timeout: Duration) -> Self {
        Self {
            graph,
            config,
            query_timeout,
        }
    }

    async fn fetch_siblings(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<ExpandedRef>> {
        let (cypher, relation) = match kind {
            EntityKind::Product => (
                format!(
                    r#"
                    MATCH (p:Product)-[:IN_CATEGORY]->(c:Category)<-[:IN_CATEGORY]-(sib:Product)
                    WHERE p.id IN $ids AND NOT sib.id IN $ids
                    RETURN DISTINCT sib.id as id, sib.name as name, p.id as via
                    ORDER BY sib.id
                    LIMIT {FETCH_LIMIT}
                    "#
                ),
                RelationKind::SameCategory,
            ),
            EntityKind::Location => (
                format!(
                    r#"
                    MATCH (s:Store)-[:IN_MARKET]->(m:Market)<-[:IN_MARKET]-(sib:Store)
                    WHERE s.id IN $ids AND NOT sib.id IN $ids
                    RETURN DISTINCT sib.id as id, sib.name as name, s.id as via
                    ORDER BY sib.id
                    LIMIT {FETCH_LIMIT}
                    "#
                ),
                RelationKind::SameMarket,
            ),
        };

        let query = Query::new(cypher).param("ids", ids.to_vec());
        let mut result = self.graph.execute(query).await?;

        let mut siblings = Vec::new();
        while let Some(row) = result.next().await? {
            let id: String = row.get("id")?;
            let name: String = row.get("name").unwrap_or_else(|_| id.clone());
            let via: String = row.get("via")?;
            siblings.push(ExpandedRef {
                entity: EntityRef {
                    kind,
                    canonical_id: id,
                    display_name: name,
                    confidence: 0.0,
                },
                relation,
                via: Some(via),
            });
            if siblings.len() >= FETCH_LIMIT {
                break;
            }
        }

        Ok(siblings)
    }

    async fn expand_kind(
        &self,
        kind: EntityKind,
        ids: &[String],
        preferred: &BTreeSet<String>,
    ) -> Vec<ExpandedRef> {
        if ids.is_empty() {
            return Vec::new();
        }

        let fetched = tokio::time::timeout(self.query_timeout, self.fetch_siblings(kind, ids)).await;

        match fetched {
            Ok(Ok(siblings)) => apply_sibling_cap(siblings, cap_for(&self.config, kind), preferred),
            Ok(Err(e)) => {
                warn!(kind = kind.as_str(), error = %e, "Graph expansion unavailable, passing direct refs through");
                Vec::new()
            }
            Err(_) => {
                warn!(kind = kind.as_str(), timeout_ms = self.query_timeout.as_millis(), "Graph expansion timed out, passing direct refs through");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Expander for Neo4jExpander {
    async fn expand(&self, direct: &[EntityRef], preferred: &BTreeSet<String>) -> Vec<ExpandedRef> {
        let product_ids: Vec<String> = direct
            .iter()
            .filter(|r| r.kind == EntityKind::Product)
            .map(|r| r.canonical_id.clone())
            .collect();
        let location_ids: Vec<String> = direct
            .iter()
            .filter(|r| r.kind == EntityKind::Location)
            .map(|r| r.canonical_id.clone())
            .collect();

        let mut expanded: Vec<ExpandedRef> =
            direct.iter().cloned().map(ExpandedRef::direct).collect();

        expanded.extend(
            self.expand_kind(EntityKind::Product, &product_ids, preferred)
                .await,
        );
        expanded.extend(
            self.expand_kind(EntityKind::Location, &location_ids, preferred)
                .await,
        );

        expanded
    }
}
