use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::postal::PostalCode;

/// Roster identifier for a representative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepresentativeId(pub String);

impl fmt::Display for RepresentativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roster entry owned by the import process; the core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representative {
    pub id: RepresentativeId,
    pub name: String,
    pub district_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_id: Option<String>,
    pub party_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Stable person identifier used by the upstream service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
}

/// Cached postal code → district row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictMapping {
    pub postal_code: PostalCode,
    pub district_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Upstream person id seen alongside the district, replayed on cache hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    pub source: String,
    pub expires_at: DateTime<Utc>,
}

impl DistrictMapping {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    Yea,
    Nay,
    Paired,
    Abstained,
    NotVoting,
}

impl VoteType {
    pub fn label(&self) -> &'static str {
        match self {
            VoteType::Yea => "yea",
            VoteType::Nay => "nay",
            VoteType::Paired => "paired",
            VoteType::Abstained => "abstained",
            VoteType::NotVoting => "not_voting",
        }
    }

    /// Paired, abstained and absent ballots carry no position.
    pub fn took_position(&self) -> bool {
        matches!(self, VoteType::Yea | VoteType::Nay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteResult {
    AgreedTo,
    Negatived,
    Tie,
}

impl VoteResult {
    pub fn label(&self) -> &'static str {
        match self {
            VoteResult::AgreedTo => "agreed_to",
            VoteResult::Negatived => "negatived",
            VoteResult::Tie => "tie",
        }
    }
}

/// One recorded division as cast by a single representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub representative_id: RepresentativeId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
    pub motion_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_title: Option<String>,
    pub vote_type: VoteType,
    pub result: VoteResult,
    /// Whipped caucus position; `None` marks a free vote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_position: Option<VoteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillCategoryAssignment {
    pub bill_number: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyLoyaltySnapshot {
    pub representative_id: RepresentativeId,
    pub votes_with_party: u32,
    pub votes_against_party: u32,
    pub free_votes: u32,
    pub abstained_paired_votes: u32,
    pub computed_at: DateTime<Utc>,
}

impl PartyLoyaltySnapshot {
    pub fn total(&self) -> u64 {
        u64::from(self.votes_with_party)
            + u64::from(self.votes_against_party)
            + u64::from(self.free_votes)
            + u64::from(self.abstained_paired_votes)
    }

    /// Share of whipped votes cast with the party, `None` when nothing was whipped.
    pub fn loyalty_rate(&self) -> Option<f64> {
        let whipped = self.votes_with_party + self.votes_against_party;
        if whipped == 0 {
            None
        } else {
            Some(f64::from(self.votes_with_party) / f64::from(whipped))
        }
    }
}
