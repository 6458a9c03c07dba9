pub mod formulas;
pub mod schema;

pub use formulas::{FORMULA_CATALOG, FormulaDoc, select_formulas};
pub use schema::{MANDATORY_RULES, SCHEMA_CATALOG, render_rules, render_schema};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use context::QueryContext;
use graph::RelationKind;
use resolve::EntityKind;

/// Section names that must be present in every rendered prompt.
pub const MANDATORY_SECTIONS: &[&str] = &["date context", "rules", "schema", "question"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPrompt {
    sections: Vec<PromptSection>,
}

impl GenerationPrompt {
    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("## {}\n{}\n\n", section.name.to_uppercase(), section.body));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Horizon splitting short-term (normal-weather baseline) from
    /// long-term (last-year baseline) demand comparisons.
    pub demand_horizon_weeks: i64,
    pub row_limit: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            demand_horizon_weeks: 4,
            row_limit: 30,
        }
    }
}

/// Assemble the generation prompt. The four mandatory sections are
/// built unconditionally; formula and entity sections appear only when
/// the context calls for them.
pub fn build(ctx: &QueryContext, raw_query: &str, config: &PromptConfig) -> GenerationPrompt {
    let mut sections = Vec::new();

    sections.push(PromptSection {
        name: "date context".to_string(),
        body: date_context_body(ctx, config),
    });

    sections.push(PromptSection {
        name: "rules".to_string(),
        body: render_rules(),
    });

    sections.push(PromptSection {
        name: "schema".to_string(),
        body: render_schema(),
    });

    let selected = select_formulas(&ctx.formula_tags);
    if !selected.is_empty() {
        let mut body = String::from("Formulas relevant to this question:\n");
        for doc in selected {
            body.push_str(&format!("- {}: {}\n", doc.name, doc.sql_hint));
        }
        sections.push(PromptSection {
            name: "formulas".to_string(),
            body,
        });
    }

    if !ctx.entity_hints.is_empty() {
        let mut body = String::new();
        for hint in &ctx.entity_hints {
            let column = match hint.kind {
                EntityKind::Product => "product_id",
                EntityKind::Location => "store_id",
            };
            let origin = match hint.relation {
                RelationKind::Direct => "mentioned in the question",
                RelationKind::SameCategory => "same category as a mentioned product",
                RelationKind::SameMarket => "same market as a mentioned store",
            };
            body.push_str(&format!(
                "- \"{}\" means {} = '{}' ({})\n",
                hint.display_name, column, hint.canonical_id, origin
            ));
        }
        sections.push(PromptSection {
            name: "resolved entities".to_string(),
            body,
        });
    }

    sections.push(PromptSection {
        name: "question".to_string(),
        body: format!(
            "{raw_query}\n\nWrite a single PostgreSQL SELECT statement answering the question. \
             End it with LIMIT {}. Output only SQL, no explanation.",
            config.row_limit
        ),
    });

    GenerationPrompt { sections }
}

fn date_context_body(ctx: &QueryContext, config: &PromptConfig) -> String {
    let mut body = format!("Current date: {}.\n", ctx.current_date);

    if let Some(hint) = &ctx.date_hint {
        body.push_str(&format!(
            "The question's period \"{}\" is {} through {} inclusive.\n",
            hint.label, hint.start, hint.end
        ));

        if hint.start > ctx.current_date {
            let horizon = ctx.current_date + Duration::weeks(config.demand_horizon_weeks);
            if hint.end <= horizon {
                body.push_str(
                    "For forecast comparisons over this short horizon, compare metrics.metric \
                     against metrics.metric_nrm.\n",
                );
            } else {
                body.push_str(
                    "For forecast comparisons over this long horizon, compare metrics.metric \
                     against metrics.metric_ly.\n",
                );
            }
        }
    } else {
        body.push_str("The question names no period; do not invent a date filter.\n");
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use context::merge;
    use graph::ExpandedRef;
    use resolve::EntityRef;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn ctx_for(query: &str) -> QueryContext {
        let direct = ExpandedRef::direct(EntityRef {
            kind: EntityKind::Product,
            canonical_id: "P-100".to_string(),
            display_name: "Whole Milk".to_string(),
            confidence: 0.9,
        });
        merge(&[direct], query, today())
    }

    #[test]
    fn test_mandatory_sections_always_present() {
        for query in ["", "milk", "overstocked milk in boston last week"] {
            let prompt = build(&ctx_for(query), query, &PromptConfig::default());
            for name in MANDATORY_SECTIONS {
                assert!(prompt.has_section(name), "missing {name:?} for {query:?}");
            }
        }
    }

    #[test]
    fn test_formula_section_follows_tags() {
        let with = build(
            &ctx_for("overstocked milk"),
            "overstocked milk",
            &PromptConfig::default(),
        );
        assert!(with.has_section("formulas"));
        assert!(with.render().contains("Overstock percentage"));

        let without = build(&ctx_for("milk"), "milk", &PromptConfig::default());
        assert!(!without.has_section("formulas"));
    }

    #[test]
    fn test_entity_hints_name_filter_columns() {
        let prompt = build(&ctx_for("milk"), "milk", &PromptConfig::default());
        assert!(prompt.render().contains("product_id = 'P-100'"));
    }

    #[test]
    fn test_short_horizon_uses_normal_weather_baseline() {
        let query = "demand for milk next 2 weeks";
        let prompt = build(&ctx_for(query), query, &PromptConfig::default());
        assert!(prompt.render().contains("metric_nrm"));
    }

    #[test]
    fn test_long_horizon_uses_last_year_baseline() {
        let query = "demand for milk next 12 weeks";
        let prompt = build(&ctx_for(query), query, &PromptConfig::default());
        assert!(prompt.render().contains("metric_ly"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let query = "overstocked milk in boston last week";
        let a = build(&ctx_for(query), query, &PromptConfig::default());
        let b = build(&ctx_for(query), query, &PromptConfig::default());
        assert_eq!(a.render(), b.render());
    }
}
