use async_trait::async_trait;

use super::categories::{BillClassifier, ClassifierError};

pub const FALLBACK_CATEGORY: &str = "Other";

const KEYWORD_CATEGORIES: &[(&str, &[&str])] = &[
    ("Health", &["health", "medical", "pharmac", "dental", "disease", "hospital"]),
    ("Indigenous Affairs", &["indigenous", "first nation", "inuit", "métis", "metis", "treaty"]),
    ("Environment", &["environment", "climate", "emission", "pollution", "fisheries", "oceans", "species"]),
    ("Justice & Public Safety", &["criminal", "justice", "firearm", "police", "correction", "sentenc", "court"]),
    ("Defence & Foreign Affairs", &["defence", "military", "armed forces", "foreign", "sanction", "veteran"]),
    ("Economy & Finance", &["budget", "tax", "financ", "economic", "appropriation", "supply", "customs", "tariff", "bank"]),
    ("Infrastructure & Transport", &["transport", "infrastructure", "railway", "aeronautic", "shipping", "housing"]),
    ("Social Programs", &["child care", "pension", "employment insurance", "benefit", "income support", "senior"]),
    ("Democratic Institutions", &["elections", "parliament", "senate", "house of commons", "ethics", "lobby"]),
];

/// Keyword table classifier used when no external classifier is configured.
///
/// First category whose keyword appears in the hint wins; unmatched hints fall
/// back to [`FALLBACK_CATEGORY`]. Deterministic for identical input.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn category_for(&self, text: &str) -> &'static str {
        let haystack = text.to_lowercase();
        KEYWORD_CATEGORIES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
            .map(|(category, _)| *category)
            .unwrap_or(FALLBACK_CATEGORY)
    }
}

#[async_trait]
impl BillClassifier for KeywordClassifier {
    async fn classify(
        &self,
        _bill_number: &str,
        title_hint: &str,
    ) -> Result<String, ClassifierError> {
        Ok(self.category_for(title_hint).to_string())
    }
}
