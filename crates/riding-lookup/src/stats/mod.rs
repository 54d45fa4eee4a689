//! Derived voting statistics: bill categories, party loyalty and the
//! per-representative statistics payload built from them.

pub mod bill_number;
pub mod categories;
pub mod categorizer;
pub mod classifier;
pub mod loyalty;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use bill_number::{extract_bill_number, normalize_bill_number};
pub use categories::{BillCategoryCache, BillClassifier, CategoryError, ClassifierError};
pub use categorizer::{CategorizedVotes, CategoryFailure, PendingBill, VoteCategorizer};
pub use classifier::{KeywordClassifier, FALLBACK_CATEGORY};
pub use loyalty::{LoyaltyAggregator, LoyaltyOutcome, PartyLineAggregator, PartyLoyaltyStatsCache};
pub use router::statistics_router;
pub use service::{
    Breakdown, LoyaltySummary, RepresentativeStatistics, StatisticsError, StatisticsService,
    StatisticsSettings, UNCATEGORIZED,
};
pub use session::SessionFilter;
