use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tags selecting which formula snippets get included in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaTag {
    Stockout,
    Overstock,
    Regional,
    WeatherDemand,
    Spoilage,
    SalesVelocity,
    Events,
    Hierarchy,
    Sales,
    Inventory,
    WeeksOfCover,
}

/// Keyword table. Matching is lowercase substring; a phrase earlier in
/// the table does not shadow a later one, every match contributes its
/// tag.
pub const TAG_KEYWORDS: &[(&str, FormulaTag)] = &[
    ("stockout", FormulaTag::Stockout),
    ("stock-out", FormulaTag::Stockout),
    ("out of stock", FormulaTag::Stockout),
    ("running out", FormulaTag::Stockout),
    ("run out", FormulaTag::Stockout),
    ("overstock", FormulaTag::Overstock),
    ("excess stock", FormulaTag::Overstock),
    ("region", FormulaTag::Regional),
    ("weather", FormulaTag::WeatherDemand),
    ("heatwave", FormulaTag::WeatherDemand),
    ("heat wave", FormulaTag::WeatherDemand),
    ("cold spell", FormulaTag::WeatherDemand),
    ("temperature", FormulaTag::WeatherDemand),
    ("wdd", FormulaTag::WeatherDemand),
    ("spoilage", FormulaTag::Spoilage),
    ("spoil", FormulaTag::Spoilage),
    ("waste", FormulaTag::Spoilage),
    ("expired", FormulaTag::Spoilage),
    ("velocity", FormulaTag::SalesVelocity),
    ("selling speed", FormulaTag::SalesVelocity),
    ("sales rate", FormulaTag::SalesVelocity),
    ("event", FormulaTag::Events),
    ("festival", FormulaTag::Events),
    ("concert", FormulaTag::Events),
    ("game", FormulaTag::Events),
    ("category", FormulaTag::Hierarchy),
    ("department", FormulaTag::Hierarchy),
    ("hierarchy", FormulaTag::Hierarchy),
    ("revenue", FormulaTag::Sales),
    ("sales", FormulaTag::Sales),
    ("sold", FormulaTag::Sales),
    ("performance", FormulaTag::Sales),
    ("inventory", FormulaTag::Inventory),
    ("stock", FormulaTag::Inventory),
    ("batch", FormulaTag::Inventory),
    ("expiry", FormulaTag::Inventory),
    ("shelf life", FormulaTag::Inventory),
    ("shelf-life", FormulaTag::Inventory),
    ("weeks of cover", FormulaTag::WeeksOfCover),
];

pub fn detect_tags(query: &str) -> BTreeSet<FormulaTag> {
    let q = query.to_lowercase();
    TAG_KEYWORDS
        .iter()
        .filter(|(keyword, _)| q.contains(keyword))
        .map(|(_, tag)| *tag)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_maps_to_its_tag() {
        for (keyword, tag) in TAG_KEYWORDS {
            let tags = detect_tags(&format!("question about {keyword} please"));
            assert!(tags.contains(tag), "keyword {keyword:?} missed tag {tag:?}");
        }
    }

    #[test]
    fn test_multiple_tags_accumulate() {
        let tags = detect_tags("Is milk overstocked in the northeast region due to weather?");
        assert!(tags.contains(&FormulaTag::Overstock));
        assert!(tags.contains(&FormulaTag::Regional));
        assert!(tags.contains(&FormulaTag::WeatherDemand));
    }

    #[test]
    fn test_no_keywords_no_tags() {
        assert!(detect_tags("hello there").is_empty());
    }
}
