use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{PostalCodeCache, REPRESENT_SOURCE};
use super::fallback::{FallbackRoute, ManualMappingFallback};
use super::reconcile::{DistrictReconciler, MatchStrategy};
use super::upstream::{DistrictLookup, FailureReason, UpstreamDistrict, UpstreamFailure};
use crate::domain::Representative;
use crate::inflight::InFlight;
use crate::postal::{PostalCode, PostalCodeError};
use crate::store::{Repositories, RepositoryError, RosterRepository};

/// Knobs for the postal code pipeline, usually taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub upstream_timeout: Duration,
    pub cache_ttl_days: i64,
    pub source: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_millis(5_000),
            cache_ttl_days: 30,
            source: REPRESENT_SOURCE.to_string(),
        }
    }
}

/// Where the district name used for matching came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistrictSource {
    Cache,
    Upstream,
    Manual,
}

/// Which stage picked the representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ResolvedBy {
    PersonId { person_id: String },
    District { strategy: MatchStrategy },
    ManualMapping { route: FallbackRoute },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub postal_code: PostalCode,
    pub representative: Representative,
    pub resolved_by: ResolvedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_source: Option<DistrictSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] PostalCodeError),
    #[error("no representative found for postal code {postal_code}")]
    NotFound { postal_code: PostalCode },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    NotFound,
    Unique(Representative),
    Ambiguous(Vec<Representative>),
}

impl NameResolution {
    pub fn matches(&self) -> Vec<Representative> {
        match self {
            NameResolution::NotFound => Vec::new(),
            NameResolution::Unique(rep) => vec![rep.clone()],
            NameResolution::Ambiguous(reps) => reps.clone(),
        }
    }
}

type UpstreamOutcome = Result<UpstreamDistrict, UpstreamFailure>;

/// Resolves postal codes and names to roster representatives.
pub struct RepresentativeResolver {
    roster: Arc<dyn RosterRepository>,
    cache: PostalCodeCache,
    upstream: Arc<dyn DistrictLookup>,
    fallback: ManualMappingFallback,
    reconciler: DistrictReconciler,
    upstream_timeout: Duration,
    inflight: InFlight<PostalCode, UpstreamOutcome>,
}

/// District name plus the upstream person id, when the upstream was consulted.
struct DistrictHint {
    name: Option<String>,
    source: Option<DistrictSource>,
    person_id: Option<String>,
}

impl RepresentativeResolver {
    pub fn new(
        repositories: &Repositories,
        upstream: Arc<dyn DistrictLookup>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            roster: repositories.roster.clone(),
            cache: PostalCodeCache::with_source(
                repositories.postal_codes.clone(),
                settings.cache_ttl_days,
                settings.source,
            ),
            upstream,
            fallback: ManualMappingFallback::new(repositories.manual_mappings.clone()),
            reconciler: DistrictReconciler::new(),
            upstream_timeout: settings.upstream_timeout,
            inflight: InFlight::new(),
        }
    }

    pub fn cache(&self) -> &PostalCodeCache {
        &self.cache
    }

    pub async fn resolve_by_postal_code(&self, raw: &str) -> Result<Resolution, ResolveError> {
        let code = PostalCode::parse(raw)?;
        let hint = self.district_hint(&code).await?;
        let roster = self.roster.all()?;

        if let Some(person_id) = hint.person_id.as_deref() {
            if let Some(rep) = self.roster.find_by_person_id(person_id)? {
                debug!(postal_code = %code, person_id, "resolved by upstream person id");
                return Ok(Resolution {
                    postal_code: code,
                    representative: rep,
                    resolved_by: ResolvedBy::PersonId {
                        person_id: person_id.to_string(),
                    },
                    district_name: hint.name,
                    district_source: hint.source,
                });
            }
        }

        if let Some(district) = hint.name.as_deref() {
            if let Some(found) = self.reconciler.reconcile(district, &roster) {
                debug!(
                    postal_code = %code,
                    district,
                    matched = %found.representative.district_name,
                    strategy = ?found.strategy,
                    "district reconciled"
                );
                return Ok(Resolution {
                    postal_code: code,
                    representative: found.representative.clone(),
                    resolved_by: ResolvedBy::District {
                        strategy: found.strategy,
                    },
                    district_name: hint.name.clone(),
                    district_source: hint.source,
                });
            }
        }

        if let Some(found) = self
            .fallback
            .resolve(&code, hint.name.as_deref(), &roster)?
        {
            let district_name = match &found.route {
                FallbackRoute::PostalCode { district_name } => district_name.clone(),
                FallbackRoute::DistrictAlias { to, .. } => to.clone(),
            };
            return Ok(Resolution {
                postal_code: code,
                representative: found.representative,
                resolved_by: ResolvedBy::ManualMapping { route: found.route },
                district_name: Some(district_name),
                district_source: Some(DistrictSource::Manual),
            });
        }

        info!(postal_code = %code, district = ?hint.name, "no representative for postal code");
        Err(ResolveError::NotFound { postal_code: code })
    }

    /// Cache first, then the upstream service. Upstream failures are absorbed.
    async fn district_hint(&self, code: &PostalCode) -> Result<DistrictHint, RepositoryError> {
        if let Some(mapping) = self.cache.get(code)? {
            return Ok(DistrictHint {
                name: Some(mapping.district_name),
                source: Some(DistrictSource::Cache),
                person_id: mapping.person_id,
            });
        }

        match self.fetch_upstream(code).await {
            Ok(district) => Ok(DistrictHint {
                name: district.preferred_district_name().map(str::to_string),
                source: district
                    .preferred_district_name()
                    .map(|_| DistrictSource::Upstream),
                person_id: district.person_id,
            }),
            Err(failure) => {
                record_failure(code, &failure);
                Ok(DistrictHint {
                    name: None,
                    source: None,
                    person_id: None,
                })
            }
        }
    }

    /// One upstream call per postal code at a time; the winner also writes the cache row.
    async fn fetch_upstream(&self, code: &PostalCode) -> UpstreamOutcome {
        self.inflight
            .run(code.clone(), || async {
                let district =
                    match tokio::time::timeout(self.upstream_timeout, self.upstream.lookup(code))
                        .await
                    {
                        Ok(Ok(district)) => district,
                        Ok(Err(failure)) => return Err(failure),
                        Err(_) => return Err(UpstreamFailure::timeout(self.upstream_timeout)),
                    };

                if let Some(name) = district.preferred_district_name() {
                    if let Err(err) = self.cache.store(
                        code,
                        name,
                        district.external_id.clone(),
                        district.person_id.clone(),
                    ) {
                        warn!(postal_code = %code, error = %err, "failed to cache district mapping");
                    }
                }
                Ok(district)
            })
            .await
    }

    /// Case-insensitive name search. Exact full-name matches shadow partial ones.
    pub fn resolve_by_name(&self, query: &str) -> Result<NameResolution, RepositoryError> {
        let wanted = query.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(NameResolution::NotFound);
        }

        let roster = self.roster.all()?;
        let exact: Vec<Representative> = roster
            .iter()
            .filter(|rep| rep.name.trim().to_lowercase() == wanted)
            .cloned()
            .collect();

        let mut matches = if exact.is_empty() {
            roster
                .into_iter()
                .filter(|rep| rep.name.to_lowercase().contains(&wanted))
                .collect()
        } else {
            exact
        };
        matches.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(match matches.len() {
            0 => NameResolution::NotFound,
            1 => NameResolution::Unique(matches.remove(0)),
            _ => NameResolution::Ambiguous(matches),
        })
    }
}

fn record_failure(code: &PostalCode, failure: &UpstreamFailure) {
    let reason = failure.reason.label();
    if failure.reason == FailureReason::NotFound {
        info!(postal_code = %code, reason, "upstream has no district for postal code");
    } else {
        warn!(
            postal_code = %code,
            reason,
            status = ?failure.status,
            detail = %failure.detail,
            "upstream lookup failed, falling through"
        );
    }
    metrics::counter!("upstream_lookup_failures_total", "reason" => reason).increment(1);
}
