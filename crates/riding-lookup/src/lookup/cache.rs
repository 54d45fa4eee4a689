use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::domain::DistrictMapping;
use crate::postal::PostalCode;
use crate::store::{PostalCodeRepository, RepositoryError};

/// Source tag written on rows that came from the Represent service.
pub const REPRESENT_SOURCE: &str = "represent";

/// Longest TTL a mapping may carry; larger settings are clamped to it.
pub const MAX_TTL_DAYS: i64 = 3_650;

/// TTL-aware view over the postal code → district table.
///
/// Expired rows stay in the table until the next upstream success overwrites
/// them; reads simply treat them as misses.
#[derive(Clone)]
pub struct PostalCodeCache {
    repository: Arc<dyn PostalCodeRepository>,
    ttl: Duration,
    source: String,
}

impl PostalCodeCache {
    pub fn new(repository: Arc<dyn PostalCodeRepository>, ttl_days: i64) -> Self {
        Self::with_source(repository, ttl_days, REPRESENT_SOURCE)
    }

    pub fn with_source(
        repository: Arc<dyn PostalCodeRepository>,
        ttl_days: i64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            ttl: Duration::days(ttl_days.clamp(0, MAX_TTL_DAYS)),
            source: source.into(),
        }
    }

    pub fn get(&self, code: &PostalCode) -> Result<Option<DistrictMapping>, RepositoryError> {
        self.get_at(code, Utc::now())
    }

    pub fn get_at(
        &self,
        code: &PostalCode,
        now: DateTime<Utc>,
    ) -> Result<Option<DistrictMapping>, RepositoryError> {
        match self.repository.fetch(code)? {
            Some(mapping) if !mapping.is_expired_at(now) => {
                metrics::counter!("postal_cache_lookups_total", "outcome" => "hit").increment(1);
                Ok(Some(mapping))
            }
            Some(mapping) => {
                debug!(postal_code = %code, expired_at = %mapping.expires_at, "postal code cache entry expired");
                metrics::counter!("postal_cache_lookups_total", "outcome" => "expired")
                    .increment(1);
                Ok(None)
            }
            None => {
                metrics::counter!("postal_cache_lookups_total", "outcome" => "miss").increment(1);
                Ok(None)
            }
        }
    }

    /// Upserts the mapping for `code`, replacing any earlier (possibly expired) row.
    pub fn store(
        &self,
        code: &PostalCode,
        district_name: &str,
        external_id: Option<String>,
        person_id: Option<String>,
    ) -> Result<DistrictMapping, RepositoryError> {
        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            RepositoryError::Unavailable(format!("cache expiry for {code} is out of range"))
        })?;
        let mapping = DistrictMapping {
            postal_code: code.clone(),
            district_name: district_name.to_string(),
            external_id,
            person_id,
            source: self.source.clone(),
            expires_at,
        };
        self.repository.upsert(mapping.clone())?;
        Ok(mapping)
    }
}
