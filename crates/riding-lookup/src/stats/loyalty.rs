use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{PartyLoyaltySnapshot, RepresentativeId, Vote, VoteType};
use crate::store::{LoyaltySnapshotRepository, RepositoryError};

/// Turns a vote set into loyalty buckets.
pub trait LoyaltyAggregator: Send + Sync {
    fn aggregate(&self, representative_id: &RepresentativeId, votes: &[Vote])
        -> PartyLoyaltySnapshot;
}

/// Buckets every vote exactly once against the recorded party position.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartyLineAggregator;

impl LoyaltyAggregator for PartyLineAggregator {
    fn aggregate(
        &self,
        representative_id: &RepresentativeId,
        votes: &[Vote],
    ) -> PartyLoyaltySnapshot {
        let mut snapshot = PartyLoyaltySnapshot {
            representative_id: representative_id.clone(),
            votes_with_party: 0,
            votes_against_party: 0,
            free_votes: 0,
            abstained_paired_votes: 0,
            computed_at: Utc::now(),
        };

        for vote in votes {
            match (vote.vote_type, vote.party_position) {
                (VoteType::Paired | VoteType::Abstained | VoteType::NotVoting, _) => {
                    snapshot.abstained_paired_votes += 1
                }
                (_, None) => snapshot.free_votes += 1,
                (cast, Some(position)) if cast == position => snapshot.votes_with_party += 1,
                _ => snapshot.votes_against_party += 1,
            }
        }
        snapshot
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoyaltyOutcome {
    pub snapshot: PartyLoyaltySnapshot,
    /// True when the stored snapshot was missing or stale and got rebuilt.
    pub recomputed: bool,
}

/// One current snapshot per representative, trusted only while its buckets
/// add up to the vote set it is compared against.
#[derive(Clone)]
pub struct PartyLoyaltyStatsCache {
    repository: Arc<dyn LoyaltySnapshotRepository>,
}

impl PartyLoyaltyStatsCache {
    pub fn new(repository: Arc<dyn LoyaltySnapshotRepository>) -> Self {
        Self { repository }
    }

    pub fn get(
        &self,
        representative_id: &RepresentativeId,
        current_votes: &[Vote],
    ) -> Result<Option<PartyLoyaltySnapshot>, RepositoryError> {
        let Some(snapshot) = self.repository.fetch(representative_id)? else {
            return Ok(None);
        };
        if snapshot.total() == current_votes.len() as u64 {
            Ok(Some(snapshot))
        } else {
            debug!(
                representative_id = %representative_id,
                stored_total = snapshot.total(),
                current_total = current_votes.len(),
                "loyalty snapshot stale"
            );
            Ok(None)
        }
    }

    /// Replaces whatever snapshot is stored for the representative.
    pub fn put(&self, snapshot: PartyLoyaltySnapshot) -> Result<(), RepositoryError> {
        self.repository.store(snapshot)
    }

    pub fn get_or_compute(
        &self,
        representative_id: &RepresentativeId,
        votes: &[Vote],
        aggregator: &dyn LoyaltyAggregator,
    ) -> Result<LoyaltyOutcome, RepositoryError> {
        if let Some(snapshot) = self.get(representative_id, votes)? {
            metrics::counter!("loyalty_snapshot_lookups_total", "outcome" => "hit").increment(1);
            return Ok(LoyaltyOutcome {
                snapshot,
                recomputed: false,
            });
        }

        metrics::counter!("loyalty_snapshot_lookups_total", "outcome" => "recompute").increment(1);
        let snapshot = aggregator.aggregate(representative_id, votes);
        self.put(snapshot.clone())?;
        Ok(LoyaltyOutcome {
            snapshot,
            recomputed: true,
        })
    }
}
