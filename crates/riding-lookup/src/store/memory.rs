use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{
    BillCategoryRepository, LoyaltySnapshotRepository, ManualMappingRepository,
    PostalCodeRepository, RepositoryError, RosterRepository, VoteRepository,
};
use crate::domain::{
    BillCategoryAssignment, DistrictMapping, PartyLoyaltySnapshot, Representative,
    RepresentativeId, Vote,
};
use crate::postal::PostalCode;

/// Process-local store backing every repository trait.
///
/// Each table sits behind its own mutex, so the insert-if-absent and upsert
/// operations are atomic per table without any cross-table transaction.
#[derive(Default)]
pub struct InMemoryStore {
    roster: Mutex<Vec<Representative>>,
    postal_codes: Mutex<BTreeMap<PostalCode, DistrictMapping>>,
    manual_codes: Mutex<HashMap<PostalCode, String>>,
    district_aliases: Mutex<HashMap<String, String>>,
    votes: Mutex<HashMap<RepresentativeId, Vec<Vote>>>,
    bill_categories: Mutex<HashMap<String, String>>,
    loyalty: Mutex<HashMap<RepresentativeId, PartyLoyaltySnapshot>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, table: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{table} table lock poisoned")))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_roster(&self, roster: Vec<Representative>) -> Result<(), RepositoryError> {
        *lock(&self.roster, "roster")? = roster;
        Ok(())
    }

    pub fn add_votes(&self, votes: Vec<Vote>) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.votes, "votes")?;
        for vote in votes {
            guard
                .entry(vote.representative_id.clone())
                .or_default()
                .push(vote);
        }
        Ok(())
    }

    pub fn add_manual_mapping(
        &self,
        code: PostalCode,
        district_name: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        lock(&self.manual_codes, "manual mapping")?.insert(code, district_name.into());
        Ok(())
    }

    pub fn add_district_alias(
        &self,
        from_district: &str,
        to_district: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        lock(&self.district_aliases, "district alias")?
            .insert(alias_key(from_district), to_district.into());
        Ok(())
    }

    /// Every stored bill category row, sorted by bill number.
    pub fn bill_category_rows(&self) -> Result<Vec<BillCategoryAssignment>, RepositoryError> {
        let guard = lock(&self.bill_categories, "bill category")?;
        let mut rows: Vec<_> = guard
            .iter()
            .map(|(bill_number, category)| BillCategoryAssignment {
                bill_number: bill_number.clone(),
                category: category.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.bill_number.cmp(&b.bill_number));
        Ok(rows)
    }
}

fn alias_key(district_name: &str) -> String {
    district_name.trim().to_lowercase()
}

impl RosterRepository for InMemoryStore {
    fn all(&self) -> Result<Vec<Representative>, RepositoryError> {
        Ok(lock(&self.roster, "roster")?.clone())
    }

    fn fetch(&self, id: &RepresentativeId) -> Result<Option<Representative>, RepositoryError> {
        let guard = lock(&self.roster, "roster")?;
        Ok(guard.iter().find(|rep| &rep.id == id).cloned())
    }

    fn find_by_person_id(
        &self,
        person_id: &str,
    ) -> Result<Option<Representative>, RepositoryError> {
        let guard = lock(&self.roster, "roster")?;
        Ok(guard
            .iter()
            .find(|rep| rep.person_id.as_deref() == Some(person_id))
            .cloned())
    }
}

impl PostalCodeRepository for InMemoryStore {
    fn fetch(&self, code: &PostalCode) -> Result<Option<DistrictMapping>, RepositoryError> {
        Ok(lock(&self.postal_codes, "postal code")?.get(code).cloned())
    }

    fn upsert(&self, mapping: DistrictMapping) -> Result<(), RepositoryError> {
        lock(&self.postal_codes, "postal code")?.insert(mapping.postal_code.clone(), mapping);
        Ok(())
    }

    fn with_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<DistrictMapping>, RepositoryError> {
        let guard = lock(&self.postal_codes, "postal code")?;
        Ok(guard
            .values()
            .filter(|mapping| mapping.postal_code.as_str().starts_with(prefix))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl ManualMappingRepository for InMemoryStore {
    fn district_for_postal_code(
        &self,
        code: &PostalCode,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(lock(&self.manual_codes, "manual mapping")?.get(code).cloned())
    }

    fn district_alias(&self, district_name: &str) -> Result<Option<String>, RepositoryError> {
        Ok(lock(&self.district_aliases, "district alias")?
            .get(&alias_key(district_name))
            .cloned())
    }
}

impl VoteRepository for InMemoryStore {
    fn votes_for(&self, id: &RepresentativeId) -> Result<Vec<Vote>, RepositoryError> {
        Ok(lock(&self.votes, "votes")?
            .get(id)
            .cloned()
            .unwrap_or_default())
    }
}

impl BillCategoryRepository for InMemoryStore {
    fn fetch_many(
        &self,
        bill_numbers: &[String],
    ) -> Result<HashMap<String, String>, RepositoryError> {
        let guard = lock(&self.bill_categories, "bill category")?;
        Ok(bill_numbers
            .iter()
            .filter_map(|bill| {
                guard
                    .get(bill)
                    .map(|category| (bill.clone(), category.clone()))
            })
            .collect())
    }

    fn insert_if_absent(
        &self,
        assignment: BillCategoryAssignment,
    ) -> Result<String, RepositoryError> {
        let mut guard = lock(&self.bill_categories, "bill category")?;
        Ok(guard
            .entry(assignment.bill_number)
            .or_insert(assignment.category)
            .clone())
    }
}

impl LoyaltySnapshotRepository for InMemoryStore {
    fn fetch(&self, id: &RepresentativeId) -> Result<Option<PartyLoyaltySnapshot>, RepositoryError> {
        Ok(lock(&self.loyalty, "loyalty")?.get(id).cloned())
    }

    fn store(&self, snapshot: PartyLoyaltySnapshot) -> Result<(), RepositoryError> {
        lock(&self.loyalty, "loyalty")?.insert(snapshot.representative_id.clone(), snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(bill: &str, category: &str) -> BillCategoryAssignment {
        BillCategoryAssignment {
            bill_number: bill.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn insert_if_absent_keeps_the_first_writer() {
        let store = InMemoryStore::new();
        let first = store
            .insert_if_absent(assignment("C-12", "Justice"))
            .expect("insert");
        let second = store
            .insert_if_absent(assignment("C-12", "Economy"))
            .expect("insert");

        assert_eq!(first, "Justice");
        assert_eq!(second, "Justice");
        assert_eq!(store.bill_category_rows().expect("rows").len(), 1);
    }

    #[test]
    fn district_aliases_match_case_insensitively() {
        let store = InMemoryStore::new();
        store
            .add_district_alias("Oakville North—Burlington", "Oakville East")
            .expect("alias");
        assert_eq!(
            store
                .district_alias("  oakville north—burlington ")
                .expect("lookup")
                .as_deref(),
            Some("Oakville East")
        );
    }

    #[test]
    fn postal_prefix_scan_is_ordered_and_limited() {
        use chrono::Utc;

        let store = InMemoryStore::new();
        for raw in ["L6H0A2", "L6H0A1", "L6J1B1", "K1A0A6"] {
            store
                .upsert(DistrictMapping {
                    postal_code: PostalCode::parse(raw).expect("code"),
                    district_name: "Oakville".to_string(),
                    external_id: None,
                    person_id: None,
                    source: "represent".to_string(),
                    expires_at: Utc::now(),
                })
                .expect("upsert");
        }

        let rows = store.with_prefix("L6", 2).expect("scan");
        let codes: Vec<_> = rows.iter().map(|row| row.postal_code.as_str()).collect();
        assert_eq!(codes, vec!["L6H0A1", "L6H0A2"]);
    }
}
