use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::domain::Representative;
use crate::postal::PostalCode;
use crate::store::{ManualMappingRepository, RepositoryError};

/// Which override table produced the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum FallbackRoute {
    PostalCode { district_name: String },
    DistrictAlias { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMatch {
    pub representative: Representative,
    pub route: FallbackRoute,
}

/// Last tier of postal code resolution, driven by hand-maintained overrides.
#[derive(Clone)]
pub struct ManualMappingFallback {
    mappings: Arc<dyn ManualMappingRepository>,
}

impl ManualMappingFallback {
    pub fn new(mappings: Arc<dyn ManualMappingRepository>) -> Self {
        Self { mappings }
    }

    /// Tries the postal code override first, then district aliases for
    /// `known_district` (cached or upstream name) and the override's own district.
    pub fn resolve(
        &self,
        code: &PostalCode,
        known_district: Option<&str>,
        roster: &[Representative],
    ) -> Result<Option<FallbackMatch>, RepositoryError> {
        let manual_district = self.mappings.district_for_postal_code(code)?;

        if let Some(district) = manual_district.as_deref() {
            if let Some(rep) = find_in_district(roster, district) {
                debug!(postal_code = %code, district, "manual postal code mapping matched");
                return Ok(Some(FallbackMatch {
                    representative: rep.clone(),
                    route: FallbackRoute::PostalCode {
                        district_name: district.to_string(),
                    },
                }));
            }
        }

        let mut tried: Vec<&str> = Vec::new();
        for district in known_district.into_iter().chain(manual_district.as_deref()) {
            if tried.iter().any(|seen| seen.eq_ignore_ascii_case(district)) {
                continue;
            }
            tried.push(district);

            let Some(alias) = self.mappings.district_alias(district)? else {
                continue;
            };
            if let Some(rep) = find_in_district(roster, &alias) {
                debug!(postal_code = %code, from = district, to = %alias, "district alias matched");
                return Ok(Some(FallbackMatch {
                    representative: rep.clone(),
                    route: FallbackRoute::DistrictAlias {
                        from: district.to_string(),
                        to: alias,
                    },
                }));
            }
        }

        Ok(None)
    }
}

fn find_in_district<'a>(roster: &'a [Representative], district: &str) -> Option<&'a Representative> {
    let wanted = district.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    roster
        .iter()
        .filter(|rep| rep.district_name.trim().to_lowercase() == wanted)
        .min_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)))
}
