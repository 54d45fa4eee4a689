use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::domain::{Representative, RepresentativeId};
use crate::lookup::upstream::{DistrictLookup, FailureReason, UpstreamDistrict, UpstreamFailure};
use crate::lookup::{RepresentativeResolver, ResolverSettings};
use crate::postal::PostalCode;
use crate::store::{InMemoryStore, Repositories};

/// Upstream fake returning a fixed outcome, optionally after a delay.
pub(super) struct ScriptedLookup {
    outcome: Result<UpstreamDistrict, UpstreamFailure>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedLookup {
    pub(super) fn district(boundary: &str, representative_facing: Option<&str>) -> Self {
        Self::returning(Ok(UpstreamDistrict {
            boundary_name: Some(boundary.to_string()),
            representative_district_name: representative_facing.map(str::to_string),
            external_id: Some("35076".to_string()),
            person_id: None,
        }))
    }

    pub(super) fn with_person(person_id: &str, boundary: &str) -> Self {
        Self::returning(Ok(UpstreamDistrict {
            boundary_name: Some(boundary.to_string()),
            representative_district_name: None,
            external_id: None,
            person_id: Some(person_id.to_string()),
        }))
    }

    pub(super) fn failing(reason: FailureReason) -> Self {
        Self::returning(Err(UpstreamFailure {
            reason,
            status: None,
            detail: "scripted failure".to_string(),
        }))
    }

    pub(super) fn returning(outcome: Result<UpstreamDistrict, UpstreamFailure>) -> Self {
        Self {
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistrictLookup for ScriptedLookup {
    async fn lookup(&self, _code: &PostalCode) -> Result<UpstreamDistrict, UpstreamFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

pub(super) fn representative(
    id: &str,
    name: &str,
    district: &str,
    person_id: Option<&str>,
) -> Representative {
    Representative {
        id: RepresentativeId(id.to_string()),
        name: name.to_string(),
        district_name: district.to_string(),
        district_id: None,
        party_name: "Liberal".to_string(),
        email: Some(format!("{id}@parl.gc.ca")),
        phone: None,
        url: None,
        gender: None,
        person_id: person_id.map(str::to_string),
    }
}

/// Post-redistricting roster: Oakville was split and renamed.
pub(super) fn roster() -> Vec<Representative> {
    vec![
        representative("mp-west", "Pam Damoff", "Oakville West", Some("88888")),
        representative("mp-east", "Anita Anand", "Oakville East", Some("12345")),
        representative("mp-ottawa", "Yasir Naqvi", "Ottawa Centre", None),
        representative("mp-milton", "Adam van Koeverden", "Milton East—Halton Hills South", None),
        representative("mp-anne", "Anne Martin", "Halifax", None),
        representative("mp-anna", "Anna Martinez", "Halifax West", None),
    ]
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.replace_roster(roster()).expect("seed roster");
    store
}

pub(super) fn test_settings() -> ResolverSettings {
    ResolverSettings {
        upstream_timeout: Duration::from_millis(100),
        ..ResolverSettings::default()
    }
}

pub(super) fn resolver(
    store: Arc<InMemoryStore>,
    upstream: Arc<ScriptedLookup>,
) -> RepresentativeResolver {
    RepresentativeResolver::new(&Repositories::in_memory(store), upstream, test_settings())
}

pub(super) fn code(raw: &str) -> PostalCode {
    PostalCode::parse(raw).expect("valid postal code")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
