//! Matching an upstream district name against the local roster.
//!
//! Upstream boundaries move ahead of the roster after redistricting, so an
//! upstream `"Oakville"` may have to land on a roster `"Oakville East"`. The
//! containment step is a heuristic; it picks one candidate deterministically
//! but cannot know which half of a split district a postal code now falls in.

use serde::Serialize;
use std::cmp::Ordering;

use crate::domain::Representative;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    /// A single roster district contains, or is contained in, the upstream name.
    Containment,
    /// Several containment candidates; exactly one extends the upstream name.
    ExtensionPrefix,
    /// Several candidates remained; the alphabetically first district won.
    Alphabetical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation<'a> {
    pub representative: &'a Representative,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DistrictReconciler;

impl DistrictReconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile<'a>(
        &self,
        district: &str,
        roster: &'a [Representative],
    ) -> Option<Reconciliation<'a>> {
        if district.trim().is_empty() {
            return None;
        }

        // Storage order is not guaranteed, so every tie-break works on a sorted view.
        let mut sorted: Vec<&'a Representative> = roster.iter().collect();
        sorted.sort_by(|a, b| by_district(a, b));

        if let Some(rep) = sorted.iter().find(|rep| rep.district_name == district) {
            return Some(Reconciliation {
                representative: rep,
                strategy: MatchStrategy::Exact,
            });
        }

        let wanted = district.trim().to_lowercase();

        if let Some(rep) = sorted
            .iter()
            .find(|rep| rep.district_name.trim().to_lowercase() == wanted)
        {
            return Some(Reconciliation {
                representative: rep,
                strategy: MatchStrategy::CaseInsensitive,
            });
        }

        let candidates: Vec<&'a Representative> = sorted
            .into_iter()
            .filter(|rep| {
                let name = rep.district_name.trim().to_lowercase();
                !name.is_empty()
                    && (name == wanted || wanted.contains(&name) || name.contains(&wanted))
            })
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(Reconciliation {
                representative: only,
                strategy: MatchStrategy::Containment,
            }),
            _ => Some(pick_among(&wanted, candidates)),
        }
    }
}

fn pick_among<'a>(wanted: &str, candidates: Vec<&'a Representative>) -> Reconciliation<'a> {
    let extension = format!("{wanted} ");
    let extending: Vec<&'a Representative> = candidates
        .iter()
        .copied()
        .filter(|rep| {
            let name = rep.district_name.trim().to_lowercase();
            name.strip_prefix(&extension)
                .is_some_and(|rest| !rest.is_empty() && !rest.starts_with(' '))
        })
        .collect();

    if let [only] = extending.as_slice() {
        return Reconciliation {
            representative: only,
            strategy: MatchStrategy::ExtensionPrefix,
        };
    }

    let pool = if extending.is_empty() {
        candidates
    } else {
        extending
    };
    // Candidates arrive sorted by district name, so the first is the alphabetical winner.
    Reconciliation {
        representative: pool[0],
        strategy: MatchStrategy::Alphabetical,
    }
}

fn by_district(a: &Representative, b: &Representative) -> Ordering {
    a.district_name
        .cmp(&b.district_name)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}
