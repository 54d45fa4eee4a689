use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::postal::{self, PostalCode};
use crate::store::{PostalCodeRepository, RepositoryError, RosterRepository};

pub const MAX_SUGGESTIONS: usize = 10;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Mp,
    Riding,
    PostalCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub label: String,
    /// Identifier to feed back into a lookup: representative id, riding name or postal code.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone)]
pub struct Autocomplete {
    roster: Arc<dyn RosterRepository>,
    postal_codes: Arc<dyn PostalCodeRepository>,
}

impl Autocomplete {
    pub fn new(
        roster: Arc<dyn RosterRepository>,
        postal_codes: Arc<dyn PostalCodeRepository>,
    ) -> Self {
        Self {
            roster,
            postal_codes,
        }
    }

    pub fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, RepositoryError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();
        let roster = self.roster.all()?;

        let mut ranked: Vec<(u8, Suggestion)> = Vec::new();

        for rep in &roster {
            if let Some(rank) = match_rank(&rep.name, &needle) {
                ranked.push((
                    rank,
                    Suggestion {
                        kind: SuggestionKind::Mp,
                        label: rep.name.clone(),
                        value: rep.id.0.clone(),
                        detail: Some(rep.district_name.clone()),
                    },
                ));
            }
        }

        let districts: BTreeSet<&str> = roster
            .iter()
            .map(|rep| rep.district_name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        for district in districts {
            if let Some(rank) = match_rank(district, &needle) {
                ranked.push((
                    rank,
                    Suggestion {
                        kind: SuggestionKind::Riding,
                        label: district.to_string(),
                        value: district.to_string(),
                        detail: None,
                    },
                ));
            }
        }

        let mut complete_code = None;
        if postal::looks_like_partial(query) {
            let prefix = postal::normalize(query);
            complete_code = PostalCode::parse(&prefix).ok();

            for mapping in self.postal_codes.with_prefix(&prefix, MAX_SUGGESTIONS)? {
                if complete_code.as_ref() == Some(&mapping.postal_code) {
                    continue;
                }
                ranked.push((
                    0,
                    Suggestion {
                        kind: SuggestionKind::PostalCode,
                        label: mapping.postal_code.to_string(),
                        value: mapping.postal_code.to_string(),
                        detail: Some(mapping.district_name),
                    },
                ));
            }
        }

        ranked.sort_by(|(rank_a, a), (rank_b, b)| {
            rank_a
                .cmp(rank_b)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.label.cmp(&b.label))
        });

        let mut suggestions: Vec<Suggestion> = Vec::with_capacity(MAX_SUGGESTIONS);
        if let Some(code) = complete_code {
            let detail = self
                .postal_codes
                .fetch(&code)?
                .map(|mapping| mapping.district_name);
            suggestions.push(Suggestion {
                kind: SuggestionKind::PostalCode,
                label: code.to_string(),
                value: code.to_string(),
                detail,
            });
        }
        suggestions.extend(ranked.into_iter().map(|(_, suggestion)| suggestion));
        suggestions.truncate(MAX_SUGGESTIONS);
        Ok(suggestions)
    }
}

/// 0 = prefix, 1 = prefix of a later word, 2 = substring anywhere.
fn match_rank(candidate: &str, needle: &str) -> Option<u8> {
    let haystack = candidate.trim().to_lowercase();
    if haystack.starts_with(needle) {
        return Some(0);
    }
    let word_prefix = haystack
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '—')
        .skip(1)
        .any(|word| word.starts_with(needle));
    if word_prefix {
        Some(1)
    } else if haystack.contains(needle) {
        Some(2)
    } else {
        None
    }
}
