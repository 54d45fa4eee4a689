//! Client for the Represent postal code service.
//!
//! Every way the call can go wrong is folded into an [`UpstreamFailure`] with
//! an explicit [`FailureReason`] right here, so the resolver never inspects
//! transport errors or status codes itself.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::postal::PostalCode;

const FEDERAL_BOUNDARY_SET: &str = "Federal electoral district";
const FEDERAL_OFFICE: &str = "MP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    RateLimited,
    NotFound,
    Other,
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::RateLimited => "rate_limited",
            FailureReason::NotFound => "not_found",
            FailureReason::Other => "other",
        }
    }
}

/// Non-fatal upstream failure. The resolver logs it and moves to the next tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream lookup failed ({}): {detail}", .reason.label())]
pub struct UpstreamFailure {
    pub reason: FailureReason,
    pub status: Option<u16>,
    pub detail: String,
}

impl UpstreamFailure {
    pub fn timeout(after: Duration) -> Self {
        Self {
            reason: FailureReason::Timeout,
            status: None,
            detail: format!("no response within {} ms", after.as_millis()),
        }
    }

    pub fn from_status(status: StatusCode, body: String) -> Self {
        let reason = match status {
            StatusCode::NOT_FOUND => FailureReason::NotFound,
            StatusCode::TOO_MANY_REQUESTS => FailureReason::RateLimited,
            _ => FailureReason::Other,
        };
        Self {
            reason,
            status: Some(status.as_u16()),
            detail: body,
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            FailureReason::Timeout
        } else {
            FailureReason::Other
        };
        Self {
            reason,
            status: err.status().map(|status| status.as_u16()),
            detail: err.to_string(),
        }
    }
}

/// What the upstream service knows about a postal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamDistrict {
    /// Raw electoral boundary name.
    pub boundary_name: Option<String>,
    /// District name as attached to the sitting representative, usually more current.
    pub representative_district_name: Option<String>,
    pub external_id: Option<String>,
    pub person_id: Option<String>,
}

impl UpstreamDistrict {
    pub fn preferred_district_name(&self) -> Option<&str> {
        non_blank(self.representative_district_name.as_deref())
            .or_else(|| non_blank(self.boundary_name.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Upstream geographic lookup. Implementations must not retry internally.
#[async_trait]
pub trait DistrictLookup: Send + Sync {
    async fn lookup(&self, code: &PostalCode) -> Result<UpstreamDistrict, UpstreamFailure>;
}

/// HTTP client for `GET {base}/postcodes/{CODE}/`.
pub struct RepresentClient {
    client: reqwest::Client,
    base_url: String,
}

impl RepresentClient {
    /// `base_url` should be like `https://represent.opennorth.ca` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn postcode_url(&self, code: &PostalCode) -> String {
        format!("{}/postcodes/{}/", self.base_url, code)
    }
}

#[async_trait]
impl DistrictLookup for RepresentClient {
    async fn lookup(&self, code: &PostalCode) -> Result<UpstreamDistrict, UpstreamFailure> {
        let url = self.postcode_url(code);
        debug!(url = %url, "querying represent");

        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(UpstreamFailure::transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamFailure::from_status(status, body));
        }

        let payload: PostcodeResponse = resp.json().await.map_err(UpstreamFailure::transport)?;
        Ok(payload.into_district())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PostcodeResponse {
    #[serde(default)]
    boundaries_centroid: Vec<BoundaryEntry>,
    #[serde(default)]
    representatives_centroid: Vec<RepresentativeEntry>,
}

#[derive(Debug, Deserialize)]
struct BoundaryEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    boundary_set_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepresentativeEntry {
    #[serde(default)]
    district_name: Option<String>,
    #[serde(default)]
    elected_office: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl PostcodeResponse {
    fn into_district(self) -> UpstreamDistrict {
        let boundary = self
            .boundaries_centroid
            .into_iter()
            .find(|entry| entry.boundary_set_name.as_deref() == Some(FEDERAL_BOUNDARY_SET));
        let member = self
            .representatives_centroid
            .into_iter()
            .find(|entry| entry.elected_office.as_deref() == Some(FEDERAL_OFFICE));

        let (boundary_name, external_id) = match boundary {
            Some(entry) => (entry.name, entry.external_id),
            None => (None, None),
        };
        let (representative_district_name, person_id) = match member {
            Some(entry) => (
                entry.district_name,
                entry.url.as_deref().and_then(person_id_from_profile_url),
            ),
            None => (None, None),
        };

        UpstreamDistrict {
            boundary_name,
            representative_district_name,
            external_id,
            person_id,
        }
    }
}

/// Extracts `12345` from profile URLs like `.../Members/en/jane-doe(12345)`.
fn person_id_from_profile_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let inner = trimmed.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let id = &inner[open + 1..];
    if !id.is_empty() && id.chars().all(|ch| ch.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}
