use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::Vote;

/// Restricts vote history to the current parliamentary session.
///
/// Without a known session start nothing is filtered and the full history is
/// returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionFilter {
    pub start: Option<NaiveDate>,
}

impl SessionFilter {
    pub fn new(start: Option<NaiveDate>) -> Self {
        Self { start }
    }

    pub fn is_filtering(&self) -> bool {
        self.start.is_some()
    }

    pub fn apply(&self, votes: Vec<Vote>) -> Vec<Vote> {
        match self.start {
            Some(start) => votes.into_iter().filter(|vote| vote.date >= start).collect(),
            None => {
                debug!("no session start configured, returning full vote history");
                votes
            }
        }
    }
}
