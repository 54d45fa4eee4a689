//! Storage boundary for the roster, the vote history and the three cache tables.
//!
//! Services never reach for a global pool; they receive a [`Repositories`] handle
//! at construction time so tests can swap any table for a fake.

pub mod import;
mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    BillCategoryAssignment, DistrictMapping, PartyLoyaltySnapshot, Representative,
    RepresentativeId, Vote,
};
use crate::postal::PostalCode;

pub use memory::InMemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the imported representative roster.
pub trait RosterRepository: Send + Sync {
    fn all(&self) -> Result<Vec<Representative>, RepositoryError>;
    fn fetch(&self, id: &RepresentativeId) -> Result<Option<Representative>, RepositoryError>;
    fn find_by_person_id(&self, person_id: &str)
        -> Result<Option<Representative>, RepositoryError>;
}

/// Postal code → district cache table. One row per postal code.
pub trait PostalCodeRepository: Send + Sync {
    fn fetch(&self, code: &PostalCode) -> Result<Option<DistrictMapping>, RepositoryError>;
    fn upsert(&self, mapping: DistrictMapping) -> Result<(), RepositoryError>;
    /// Rows whose normalized code starts with `prefix`, ordered by code.
    fn with_prefix(&self, prefix: &str, limit: usize)
        -> Result<Vec<DistrictMapping>, RepositoryError>;
}

/// Explicit overrides maintained by hand when the upstream service and the roster disagree.
pub trait ManualMappingRepository: Send + Sync {
    fn district_for_postal_code(&self, code: &PostalCode)
        -> Result<Option<String>, RepositoryError>;
    /// Maps a retired or renamed district to its current roster name.
    fn district_alias(&self, district_name: &str) -> Result<Option<String>, RepositoryError>;
}

pub trait VoteRepository: Send + Sync {
    fn votes_for(&self, id: &RepresentativeId) -> Result<Vec<Vote>, RepositoryError>;
}

/// Bill number → category table, unique on bill number.
pub trait BillCategoryRepository: Send + Sync {
    fn fetch_many(&self, bill_numbers: &[String])
        -> Result<HashMap<String, String>, RepositoryError>;
    /// Inserts unless a row already exists and returns whichever category is stored afterwards.
    fn insert_if_absent(&self, assignment: BillCategoryAssignment)
        -> Result<String, RepositoryError>;
}

/// One current loyalty snapshot per representative.
pub trait LoyaltySnapshotRepository: Send + Sync {
    fn fetch(&self, id: &RepresentativeId)
        -> Result<Option<PartyLoyaltySnapshot>, RepositoryError>;
    fn store(&self, snapshot: PartyLoyaltySnapshot) -> Result<(), RepositoryError>;
}

/// Data-access handle passed explicitly into every service.
#[derive(Clone)]
pub struct Repositories {
    pub roster: Arc<dyn RosterRepository>,
    pub postal_codes: Arc<dyn PostalCodeRepository>,
    pub manual_mappings: Arc<dyn ManualMappingRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub bill_categories: Arc<dyn BillCategoryRepository>,
    pub loyalty: Arc<dyn LoyaltySnapshotRepository>,
}

impl Repositories {
    /// Backs every table with the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            roster: store.clone(),
            postal_codes: store.clone(),
            manual_mappings: store.clone(),
            votes: store.clone(),
            bill_categories: store.clone(),
            loyalty: store,
        }
    }
}
