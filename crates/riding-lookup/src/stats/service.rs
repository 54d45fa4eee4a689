use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::categories::{BillCategoryCache, BillClassifier};
use super::categorizer::VoteCategorizer;
use super::loyalty::{LoyaltyAggregator, PartyLineAggregator, PartyLoyaltyStatsCache};
use super::session::SessionFilter;
use crate::background::BackgroundTasks;
use crate::domain::{Representative, RepresentativeId, Vote};
use crate::store::{Repositories, RepositoryError, RosterRepository, VoteRepository};

pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone)]
pub struct StatisticsSettings {
    /// How many of the newest votes are shown and classified on demand.
    pub render_limit: usize,
    pub session_start: Option<NaiveDate>,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            render_limit: 20,
            session_start: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoyaltySummary {
    pub votes_with_party: u32,
    pub votes_against_party: u32,
    pub free_votes: u32,
    pub abstained_paired_votes: u32,
    pub loyalty_rate: Option<f64>,
    pub computed_at: DateTime<Utc>,
    pub recomputed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub by_category: BTreeMap<String, usize>,
    pub by_result: BTreeMap<String, usize>,
    pub by_vote_type: BTreeMap<String, usize>,
}

impl Breakdown {
    fn from_votes(votes: &[Vote]) -> Self {
        let mut breakdown = Breakdown::default();
        for vote in votes {
            let category = vote.category.as_deref().unwrap_or(UNCATEGORIZED);
            *breakdown.by_category.entry(category.to_string()).or_default() += 1;
            *breakdown
                .by_result
                .entry(vote.result.label().to_string())
                .or_default() += 1;
            *breakdown
                .by_vote_type
                .entry(vote.vote_type.label().to_string())
                .or_default() += 1;
        }
        breakdown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepresentativeStatistics {
    pub representative: Representative,
    pub session: SessionFilter,
    pub total_votes: usize,
    pub recent_votes: Vec<Vote>,
    pub loyalty: LoyaltySummary,
    pub breakdown: Breakdown,
    pub categorization_failures: usize,
    pub categorization_deferred: usize,
    /// False when the loyalty buckets do not add up to `total_votes`.
    pub data_valid: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StatisticsError {
    #[error("representative {0} not found")]
    NotFound(RepresentativeId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Voting record, loyalty and breakdown for one representative.
pub struct StatisticsService {
    roster: Arc<dyn RosterRepository>,
    votes: Arc<dyn VoteRepository>,
    categories: Arc<BillCategoryCache>,
    categorizer: VoteCategorizer,
    loyalty: PartyLoyaltyStatsCache,
    aggregator: Arc<dyn LoyaltyAggregator>,
    session: SessionFilter,
    render_limit: usize,
    background: BackgroundTasks,
}

impl StatisticsService {
    pub fn new(
        repositories: &Repositories,
        classifier: Arc<dyn BillClassifier>,
        settings: StatisticsSettings,
        background: BackgroundTasks,
    ) -> Self {
        let categories = Arc::new(BillCategoryCache::new(
            repositories.bill_categories.clone(),
            classifier,
        ));
        Self {
            roster: repositories.roster.clone(),
            votes: repositories.votes.clone(),
            categorizer: VoteCategorizer::new(categories.clone()),
            categories,
            loyalty: PartyLoyaltyStatsCache::new(repositories.loyalty.clone()),
            aggregator: Arc::new(PartyLineAggregator),
            session: SessionFilter::new(settings.session_start),
            render_limit: settings.render_limit,
            background,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn LoyaltyAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn categories(&self) -> &Arc<BillCategoryCache> {
        &self.categories
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// `limit` can shrink the configured number of rendered votes, never grow it.
    pub async fn statistics(
        &self,
        representative_id: &RepresentativeId,
        limit: Option<usize>,
    ) -> Result<RepresentativeStatistics, StatisticsError> {
        let representative = self
            .roster
            .fetch(representative_id)?
            .ok_or_else(|| StatisticsError::NotFound(representative_id.clone()))?;

        let mut votes = self.session.apply(self.votes.votes_for(representative_id)?);
        votes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        let total_votes = votes.len();
        let rendered = limit.map_or(self.render_limit, |limit| limit.min(self.render_limit));

        let categorized = self.categorizer.categorize(votes, rendered).await?;
        let deferred = categorized.deferred.len();
        for pending in categorized.deferred {
            let categories = self.categories.clone();
            self.background.spawn(
                format!("categorize {}", pending.bill_number),
                async move {
                    categories
                        .ensure(&pending.bill_number, &pending.title_hint)
                        .await
                        .map(|_| ())
                },
            );
        }

        let votes = categorized.votes;
        let outcome =
            self.loyalty
                .get_or_compute(representative_id, &votes, self.aggregator.as_ref())?;
        let data_valid = outcome.snapshot.total() == total_votes as u64;
        if !data_valid {
            warn!(
                representative_id = %representative_id,
                bucket_total = outcome.snapshot.total(),
                vote_total = total_votes,
                "loyalty buckets do not match vote count"
            );
            metrics::counter!("statistics_data_invalid_total").increment(1);
        }

        debug!(
            representative_id = %representative_id,
            total_votes,
            rendered,
            deferred,
            recomputed = outcome.recomputed,
            "statistics assembled"
        );

        let breakdown = Breakdown::from_votes(&votes);
        let snapshot = outcome.snapshot;
        let loyalty = LoyaltySummary {
            loyalty_rate: snapshot.loyalty_rate(),
            votes_with_party: snapshot.votes_with_party,
            votes_against_party: snapshot.votes_against_party,
            free_votes: snapshot.free_votes,
            abstained_paired_votes: snapshot.abstained_paired_votes,
            computed_at: snapshot.computed_at,
            recomputed: outcome.recomputed,
        };

        Ok(RepresentativeStatistics {
            representative,
            session: self.session,
            total_votes,
            recent_votes: votes.into_iter().take(rendered).collect(),
            loyalty,
            breakdown,
            categorization_failures: categorized.failures.len(),
            categorization_deferred: deferred,
            data_valid,
        })
    }
}
