use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::bill_number::normalize_bill_number;
use crate::domain::BillCategoryAssignment;
use crate::inflight::InFlight;
use crate::store::{BillCategoryRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ClassifierError(pub String);

/// External bill/motion classifier. Expensive, possibly remote, assumed deterministic.
#[async_trait]
pub trait BillClassifier: Send + Sync {
    async fn classify(&self, bill_number: &str, title_hint: &str)
        -> Result<String, ClassifierError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CategoryError {
    #[error("bill number is empty")]
    EmptyBillNumber,
    #[error("classifier failed for {bill_number}: {source}")]
    Classifier {
        bill_number: String,
        source: ClassifierError,
    },
    #[error("classifier returned no category for {bill_number}")]
    EmptyCategory { bill_number: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bill number → category memo over the category table.
///
/// Rows are written once and never replaced. Concurrent `ensure` calls for the
/// same bill inside this process share one classification; across processes
/// the table's insert-if-absent decides which category is kept.
pub struct BillCategoryCache {
    repository: Arc<dyn BillCategoryRepository>,
    classifier: Arc<dyn BillClassifier>,
    inflight: InFlight<String, Result<String, CategoryError>>,
}

impl BillCategoryCache {
    pub fn new(
        repository: Arc<dyn BillCategoryRepository>,
        classifier: Arc<dyn BillClassifier>,
    ) -> Self {
        Self {
            repository,
            classifier,
            inflight: InFlight::new(),
        }
    }

    /// Stored categories for the given (normalized) bill numbers. Never classifies.
    pub fn get(&self, bill_numbers: &[String]) -> Result<HashMap<String, String>, RepositoryError> {
        if bill_numbers.is_empty() {
            return Ok(HashMap::new());
        }
        self.repository.fetch_many(bill_numbers)
    }

    /// Returns the stored category for `bill_number`, classifying it first if needed.
    pub async fn ensure(&self, bill_number: &str, title_hint: &str) -> Result<String, CategoryError> {
        let key = normalize_bill_number(bill_number);
        if key.is_empty() {
            return Err(CategoryError::EmptyBillNumber);
        }

        if let Some(existing) = self.stored(&key)? {
            return Ok(existing);
        }

        self.inflight
            .run(key.clone(), || self.classify_and_store(key.clone(), title_hint))
            .await
    }

    fn stored(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let mut found = self.repository.fetch_many(&[key.to_string()])?;
        Ok(found.remove(key))
    }

    async fn classify_and_store(&self, key: String, title_hint: &str) -> Result<String, CategoryError> {
        // A waiter that arrived after the previous flight finished may find the row already there.
        if let Some(existing) = self.stored(&key)? {
            return Ok(existing);
        }

        let hint = if title_hint.trim().is_empty() {
            key.as_str()
        } else {
            title_hint.trim()
        };
        let category = self
            .classifier
            .classify(&key, hint)
            .await
            .map_err(|source| CategoryError::Classifier {
                bill_number: key.clone(),
                source,
            })?;
        let category = category.trim().to_string();
        if category.is_empty() {
            return Err(CategoryError::EmptyCategory { bill_number: key });
        }

        let stored = self.repository.insert_if_absent(BillCategoryAssignment {
            bill_number: key.clone(),
            category: category.clone(),
        })?;
        metrics::counter!("bill_classifications_total").increment(1);

        if stored == category {
            debug!(bill_number = %key, category = %stored, "bill categorized");
        } else {
            info!(
                bill_number = %key,
                classified = %category,
                stored = %stored,
                "bill already categorized by another writer, keeping stored category"
            );
        }
        Ok(stored)
    }
}
