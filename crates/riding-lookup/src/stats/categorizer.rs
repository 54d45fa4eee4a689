use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use super::bill_number::{extract_bill_number, normalize_bill_number};
use super::categories::{BillCategoryCache, CategoryError};
use crate::domain::Vote;
use crate::store::RepositoryError;

/// A bill that still needs a category, with the text to classify it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBill {
    pub bill_number: String,
    pub title_hint: String,
}

#[derive(Debug, Clone)]
pub struct CategoryFailure {
    pub bill_number: String,
    pub error: CategoryError,
}

#[derive(Debug, Clone, Default)]
pub struct CategorizedVotes {
    pub votes: Vec<Vote>,
    /// Ensures that failed inside the rendered prefix; those votes stay uncategorized.
    pub failures: Vec<CategoryFailure>,
    /// Uncategorized bills that only appear past the rendered prefix.
    pub deferred: Vec<PendingBill>,
}

/// Attaches bill numbers and categories to votes.
#[derive(Clone)]
pub struct VoteCategorizer {
    categories: Arc<BillCategoryCache>,
}

impl VoteCategorizer {
    pub fn new(categories: Arc<BillCategoryCache>) -> Self {
        Self { categories }
    }

    /// Categorizes `votes`, classifying only bills seen in the first `rendered` votes.
    pub async fn categorize(
        &self,
        mut votes: Vec<Vote>,
        rendered: usize,
    ) -> Result<CategorizedVotes, RepositoryError> {
        for vote in votes.iter_mut() {
            vote.bill_number = match vote.bill_number.as_deref() {
                Some(existing) if !existing.trim().is_empty() => {
                    Some(normalize_bill_number(existing))
                }
                _ => extract_bill_number(&vote.motion_title),
            };
        }

        let bill_numbers: Vec<String> = distinct_bills(&votes).into_keys().collect();
        let known = self.categories.get(&bill_numbers)?;

        let rendered = rendered.min(votes.len());
        let (visible, hidden) = votes.split_at(rendered);
        let to_ensure = missing(visible, &known);
        let deferred: Vec<PendingBill> = missing(hidden, &known)
            .into_iter()
            .filter(|pending| !to_ensure.iter().any(|seen| seen.bill_number == pending.bill_number))
            .collect();

        let outcomes = join_all(to_ensure.iter().map(|pending| async move {
            let outcome = self
                .categories
                .ensure(&pending.bill_number, &pending.title_hint)
                .await;
            (pending.bill_number.clone(), outcome)
        }))
        .await;

        let mut failures = Vec::new();
        for (bill_number, outcome) in outcomes {
            if let Err(error) = outcome {
                warn!(bill_number = %bill_number, error = %error, "bill categorization failed, leaving uncategorized");
                metrics::counter!("bill_categorization_failures_total").increment(1);
                failures.push(CategoryFailure { bill_number, error });
            }
        }

        let known = if to_ensure.is_empty() {
            known
        } else {
            self.categories.get(&bill_numbers)?
        };
        for vote in votes.iter_mut() {
            if let Some(category) = vote.bill_number.as_ref().and_then(|bill| known.get(bill)) {
                vote.category = Some(category.clone());
            }
        }

        Ok(CategorizedVotes {
            votes,
            failures,
            deferred,
        })
    }
}

/// Distinct bill numbers with the most descriptive title seen for each.
fn distinct_bills(votes: &[Vote]) -> BTreeMap<String, String> {
    let mut bills: BTreeMap<String, String> = BTreeMap::new();
    for vote in votes {
        if let Some(bill) = vote.bill_number.as_ref() {
            bills
                .entry(bill.clone())
                .or_insert_with(|| title_hint(vote, bill));
        }
    }
    bills
}

fn missing(votes: &[Vote], known: &HashMap<String, String>) -> Vec<PendingBill> {
    distinct_bills(votes)
        .into_iter()
        .filter(|(bill, _)| !known.contains_key(bill))
        .map(|(bill_number, title_hint)| PendingBill {
            bill_number,
            title_hint,
        })
        .collect()
}

/// Motion title, else bill title, else the bare bill number.
fn title_hint(vote: &Vote, bill_number: &str) -> String {
    [Some(vote.motion_title.as_str()), vote.bill_title.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or(bill_number)
        .to_string()
}
