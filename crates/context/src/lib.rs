pub mod dates;
pub mod tags;

pub use dates::{DateHint, detect_date_hint};
pub use tags::{FormulaTag, detect_tags};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use graph::{ExpandedRef, RelationKind};
use resolve::EntityKind;

/// Display pairing for the prompt: "when the user says X, filter on Y".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHint {
    pub kind: EntityKind,
    pub canonical_id: String,
    pub display_name: String,
    pub relation: RelationKind,
}

/// Everything the prompt builder needs, fully resolved. A pure
/// function of its inputs: sets are ordered, nothing reads a clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub product_ids: BTreeSet<String>,
    pub location_ids: BTreeSet<String>,
    pub date_hint: Option<DateHint>,
    pub formula_tags: BTreeSet<FormulaTag>,
    pub entity_hints: Vec<EntityHint>,
    pub current_date: NaiveDate,
}

/// Merge expanded references with what the question text itself says.
/// Dedup is by canonical id; when an entity appears both directly and
/// as a sibling, the direct reading wins.
pub fn merge(expanded: &[ExpandedRef], raw_query: &str, current_date: NaiveDate) -> QueryContext {
    let mut product_ids = BTreeSet::new();
    let mut location_ids = BTreeSet::new();
    let mut hints: Vec<EntityHint> = Vec::new();

    for item in expanded {
        let ids = match item.entity.kind {
            EntityKind::Product => &mut product_ids,
            EntityKind::Location => &mut location_ids,
        };
        ids.insert(item.entity.canonical_id.clone());

        let hint = EntityHint {
            kind: item.entity.kind,
            canonical_id: item.entity.canonical_id.clone(),
            display_name: item.entity.display_name.clone(),
            relation: item.relation,
        };

        match hints
            .iter_mut()
            .find(|h| h.kind == hint.kind && h.canonical_id == hint.canonical_id)
        {
            Some(existing) => {
                if existing.relation != RelationKind::Direct
                    && hint.relation == RelationKind::Direct
                {
                    *existing = hint;
                }
            }
            None => hints.push(hint),
        }
    }

    hints.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.canonical_id.cmp(&b.canonical_id))
    });

    QueryContext {
        product_ids,
        location_ids,
        date_hint: detect_date_hint(raw_query, current_date),
        formula_tags: detect_tags(raw_query),
        entity_hints: hints,
        current_date,
    }
}
