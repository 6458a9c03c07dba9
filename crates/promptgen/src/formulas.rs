//! Formula catalog. Each entry carries the tags that pull it into the
//! prompt and a short SQL sketch the model can adapt.

use context::FormulaTag;

pub struct FormulaDoc {
    pub name: &'static str,
    pub tags: &'static [FormulaTag],
    pub sql_hint: &'static str,
}

pub const FORMULA_CATALOG: &[FormulaDoc] = &[
    FormulaDoc {
        name: "Daily sales velocity",
        tags: &[FormulaTag::SalesVelocity, FormulaTag::Sales],
        sql_hint: "SUM(sales_units) / NULLIF(COUNT(DISTINCT date), 0) over the chosen window",
    },
    FormulaDoc {
        name: "Weather-adjusted sales velocity",
        tags: &[FormulaTag::SalesVelocity, FormulaTag::WeatherDemand],
        sql_hint: "daily velocity * (m.metric / NULLIF(m.metric_nrm, 0)) joining metrics on store, product and week",
    },
    FormulaDoc {
        name: "Weather-adjusted demand",
        tags: &[FormulaTag::WeatherDemand],
        sql_hint: "short horizon: compare m.metric against m.metric_nrm; long horizon: compare m.metric against m.metric_ly",
    },
    FormulaDoc {
        name: "Days until stockout",
        tags: &[FormulaTag::Stockout, FormulaTag::Inventory],
        sql_hint: "SUM(quantity_on_hand) / NULLIF(daily velocity, 0) per store and product",
    },
    FormulaDoc {
        name: "Stockout loss",
        tags: &[FormulaTag::Stockout, FormulaTag::Sales],
        sql_hint: "(forecast demand - available stock) * AVG(total_amount), floored at zero with GREATEST(..., 0)",
    },
    FormulaDoc {
        name: "Week-over-week sales change",
        tags: &[FormulaTag::Sales],
        sql_hint: "(this_week - prior_week) / NULLIF(prior_week, 0) using two aggregates grouped by week_end_date",
    },
    FormulaDoc {
        name: "Sales uplift versus normal weather",
        tags: &[FormulaTag::WeatherDemand, FormulaTag::Sales],
        sql_hint: "(m.metric - m.metric_nrm) / NULLIF(m.metric_nrm, 0)",
    },
    FormulaDoc {
        name: "Overstock percentage",
        tags: &[FormulaTag::Overstock, FormulaTag::Inventory],
        sql_hint: "(stock on hand - forecast demand) / NULLIF(forecast demand, 0), only rows where stock exceeds demand",
    },
    FormulaDoc {
        name: "Shelf-life risk",
        tags: &[FormulaTag::Spoilage, FormulaTag::Inventory],
        sql_hint: "quantity_on_hand in batches with expiry_date inside the window, minus expected sales over the same days",
    },
    FormulaDoc {
        name: "Stockout rate",
        tags: &[FormulaTag::Stockout],
        sql_hint: "COUNT of days with zero on-hand stock / NULLIF(COUNT of tracked days, 0)",
    },
    FormulaDoc {
        name: "Predicted total loss",
        tags: &[FormulaTag::Spoilage, FormulaTag::Stockout],
        sql_hint: "spoilage_value plus stockout loss over the same window",
    },
    FormulaDoc {
        name: "Weeks of cover",
        tags: &[FormulaTag::WeeksOfCover, FormulaTag::Inventory],
        sql_hint: "stock on hand / NULLIF(weekly sales velocity, 0)",
    },
    FormulaDoc {
        name: "Warm weekend demand filter",
        tags: &[FormulaTag::WeatherDemand, FormulaTag::Events],
        sql_hint: "weeks where weekly_weather.avg_temperature >= 75 and condition = 'sunny'",
    },
    FormulaDoc {
        name: "Quarter-over-quarter change",
        tags: &[FormulaTag::Sales],
        sql_hint: "(this_quarter - prior_quarter) / NULLIF(prior_quarter, 0) grouped by calendar.quarter and year",
    },
    FormulaDoc {
        name: "Event window uplift",
        tags: &[FormulaTag::Events],
        sql_hint: "sales between events.start_date and end_date versus the same-length window before start_date, joined via location.market",
    },
    FormulaDoc {
        name: "Regional rollup",
        tags: &[FormulaTag::Regional],
        sql_hint: "GROUP BY location.region (remember: lowercase region values)",
    },
    FormulaDoc {
        name: "Category rollup",
        tags: &[FormulaTag::Hierarchy],
        sql_hint: "GROUP BY product_hierarchy.category or department",
    },
    FormulaDoc {
        name: "Recommended order quantity",
        tags: &[FormulaTag::Inventory, FormulaTag::WeatherDemand],
        sql_hint: "GREATEST(forecast demand - stock on hand, 0), demand from metrics for the coming weeks",
    },
];

/// Select formulas whose tag set intersects the query's tags,
/// preserving catalog order.
pub fn select_formulas(tags: &std::collections::BTreeSet<FormulaTag>) -> Vec<&'static FormulaDoc> {
    FORMULA_CATALOG
        .iter()
        .filter(|doc| doc.tags.iter().any(|t| tags.contains(t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_every_tag_selects_at_least_one_formula() {
        for tag in [
            FormulaTag::Stockout,
            FormulaTag::Overstock,
            FormulaTag::Regional,
            FormulaTag::WeatherDemand,
            FormulaTag::Spoilage,
            FormulaTag::SalesVelocity,
            FormulaTag::Events,
            FormulaTag::Hierarchy,
            FormulaTag::Sales,
            FormulaTag::Inventory,
            FormulaTag::WeeksOfCover,
        ] {
            let selected = select_formulas(&BTreeSet::from([tag]));
            assert!(!selected.is_empty(), "tag {tag:?} selects nothing");
        }
    }

    #[test]
    fn test_no_tags_selects_nothing() {
        assert!(select_formulas(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_selection_is_ordered_by_catalog() {
        let tags = BTreeSet::from([FormulaTag::Sales, FormulaTag::Stockout]);
        let names: Vec<&str> = select_formulas(&tags).iter().map(|d| d.name).collect();
        let mut sorted_by_catalog = names.clone();
        sorted_by_catalog.sort_by_key(|n| {
            FORMULA_CATALOG
                .iter()
                .position(|d| d.name == *n)
                .unwrap_or(usize::MAX)
        });
        assert_eq!(names, sorted_by_catalog);
    }
}
