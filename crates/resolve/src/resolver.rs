use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::search::EntitySearch;
use crate::{EntityKind, EntityRef};

/// Words that never name a product or a store. Fragments are what is
/// left of the question after these are stripped.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "do", "does", "did", "how", "what",
    "which", "who", "when", "where", "why", "show", "me", "my", "our", "their", "of", "in", "on",
    "at", "to", "for", "from", "by", "with", "and", "or", "vs", "versus", "per", "last", "this",
    "next", "past", "week", "weeks", "month", "months", "year", "years", "quarter", "quarters",
    "day", "days", "today", "yesterday", "tomorrow", "much", "many", "most", "least", "top",
    "bottom", "all", "any", "each", "every", "compare", "compared", "between", "across", "about",
    "i", "we", "you", "it", "they", "them", "there", "out", "up", "down", "running", "going",
    "have", "has", "had", "will", "would", "should", "could", "can", "get", "give", "list", "tell",
];

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum similarity score for a hit to count as a resolution.
    pub acceptance_threshold: f32,
    pub product_top_k: usize,
    pub location_top_k: usize,
    /// Upper bound on fragments searched per question.
    pub max_fragments: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.78,
            product_top_k: 5,
            location_top_k: 10,
            max_fragments: 8,
        }
    }
}

pub struct EntityResolver {
    search: Arc<dyn EntitySearch>,
    config: ResolverConfig,
}

impl EntityResolver {
    pub fn new(search: Arc<dyn EntitySearch>, config: ResolverConfig) -> Self {
        Self { search, config }
    }

    /// Resolve free text to canonical entity references. A backend
    /// failure degrades to an empty result; it never fails the query.
    pub async fn resolve(&self, query: &str) -> Vec<EntityRef> {
        let fragments = extract_fragments(query, self.config.max_fragments);

        // Dedup by (kind, id), keeping the best confidence.
        let mut best: HashMap<(EntityKind, String), EntityRef> = HashMap::new();

        for fragment in &fragments {
            for (kind, top_k) in [
                (EntityKind::Product, self.config.product_top_k),
                (EntityKind::Location, self.config.location_top_k),
            ] {
                let hits = match self.search.search(kind, fragment, top_k).await {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!(
                            fragment = fragment.as_str(),
                            kind = kind.as_str(),
                            error = %e,
                            "Entity search unavailable, skipping fragment"
                        );
                        continue;
                    }
                };

                // Only the best hit per index can resolve a fragment.
                let Some(top) = hits
                    .iter()
                    .max_by(|a, b| a.score.total_cmp(&b.score))
                else {
                    continue;
                };

                if top.score < self.config.acceptance_threshold {
                    continue;
                }

                let entry = EntityRef {
                    kind,
                    canonical_id: top.canonical_id.clone(),
                    display_name: top.display_name.clone(),
                    confidence: top.score,
                };

                best.entry((kind, top.canonical_id.clone()))
                    .and_modify(|existing| {
                        if entry.confidence > existing.confidence {
                            *existing = entry.clone();
                        }
                    })
                    .or_insert(entry);
            }
        }

        let mut refs: Vec<EntityRef> = best.into_values().collect();
        refs.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.canonical_id.cmp(&b.canonical_id))
        });
        refs
    }
}

/// Split a question into searchable fragments: contiguous runs of
/// non-stopword tokens, plus the individual tokens of multi-word runs.
pub fn extract_fragments(query: &str, max_fragments: usize) -> Vec<String> {
    let tokens: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut fragments = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    let mut flush = |run: &mut Vec<&str>, fragments: &mut Vec<String>| {
        if run.is_empty() {
            return;
        }
        fragments.push(run.join(" "));
        if run.len() > 1 {
            for word in run.iter() {
                fragments.push((*word).to_string());
            }
        }
        run.clear();
    };

    for token in &tokens {
        if STOPWORDS.contains(&token.as_str()) || token.chars().all(|c| c.is_ascii_digit()) {
            flush(&mut run, &mut fragments);
        } else {
            run.push(token);
        }
    }
    flush(&mut run, &mut fragments);

    // Repeated mentions may be far apart ("milk ... milk"); keep the
    // first occurrence only.
    let mut seen = HashSet::new();
    fragments.retain(|f| seen.insert(f.clone()));
    fragments.truncate(max_fragments);
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use anyhow::Result;
    use async_trait::async_trait;

    struct StubSearch {
        hits: Vec<(EntityKind, &'static str, SearchHit)>,
        fail: bool,
    }

    #[async_trait]
    impl EntitySearch for StubSearch {
        async fn search(
            &self,
            kind: EntityKind,
            text: &str,
            _top_k: usize,
        ) -> Result<Vec<SearchHit>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self
                .hits
                .iter()
                .filter(|(k, t, _)| *k == kind && *t == text)
                .map(|(_, _, h)| h.clone())
                .collect())
        }
    }

    fn hit(id: &str, name: &str, score: f32) -> SearchHit {
        SearchHit {
            canonical_id: id.to_string(),
            display_name: name.to_string(),
            score,
            group_label: None,
        }
    }

    #[test]
    fn test_fragment_extraction_drops_distant_repeats() {
        let fragments = extract_fragments("milk in boston and milk", 8);
        assert_eq!(
            fragments.iter().filter(|f| f.as_str() == "milk").count(),
            1
        );
        assert_eq!(fragments, vec!["milk".to_string(), "boston".to_string()]);
    }

    #[test]
    fn test_fragment_extraction_strips_stopwords() {
        let fragments = extract_fragments("show me organic milk sales in boston last week", 8);
        assert!(fragments.contains(&"organic milk sales".to_string()));
        assert!(fragments.contains(&"boston".to_string()));
        assert!(!fragments.iter().any(|f| f == "last" || f == "week"));
    }

    #[tokio::test]
    async fn test_resolve_accepts_above_threshold_only() {
        let search = StubSearch {
            hits: vec![
                (EntityKind::Product, "milk", hit("P-100", "Whole Milk", 0.91)),
                (EntityKind::Product, "boston", hit("P-999", "Boston Creme", 0.40)),
                (EntityKind::Location, "boston", hit("S-017", "Boston Downtown", 0.88)),
            ],
            fail: false,
        };
        let resolver = EntityResolver::new(std::sync::Arc::new(search), ResolverConfig::default());

        let refs = resolver.resolve("milk in boston").await;
        let ids: Vec<&str> = refs.iter().map(|r| r.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["P-100", "S-017"]);
    }

    #[tokio::test]
    async fn test_resolve_dedups_repeated_mentions() {
        let search = StubSearch {
            hits: vec![
                (EntityKind::Product, "milk", hit("P-100", "Whole Milk", 0.85)),
                (EntityKind::Product, "whole milk", hit("P-100", "Whole Milk", 0.95)),
                (EntityKind::Product, "whole", hit("P-100", "Whole Milk", 0.80)),
            ],
            fail: false,
        };
        let resolver = EntityResolver::new(std::sync::Arc::new(search), ResolverConfig::default());

        let refs = resolver.resolve("whole milk versus milk").await;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].canonical_id, "P-100");
        assert!((refs[0].confidence - 0.95).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_empty() {
        let search = StubSearch {
            hits: vec![],
            fail: true,
        };
        let resolver = EntityResolver::new(std::sync::Arc::new(search), ResolverConfig::default());

        let refs = resolver.resolve("milk in boston").await;
        assert!(refs.is_empty());
    }
}
