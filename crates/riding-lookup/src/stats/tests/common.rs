use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::background::BackgroundTasks;
use crate::domain::{
    PartyLoyaltySnapshot, Representative, RepresentativeId, Vote, VoteResult, VoteType,
};
use crate::stats::{
    KeywordClassifier, LoyaltyAggregator, PartyLineAggregator, StatisticsService,
    StatisticsSettings,
};
use crate::store::{InMemoryStore, Repositories};

pub(super) fn rep_id() -> RepresentativeId {
    RepresentativeId("mp-1".to_string())
}

pub(super) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

pub(super) fn vote(
    id: &str,
    on: &str,
    motion: &str,
    cast: VoteType,
    position: Option<VoteType>,
    result: VoteResult,
) -> Vote {
    Vote {
        id: id.to_string(),
        representative_id: rep_id(),
        date: date(on),
        bill_number: None,
        motion_title: motion.to_string(),
        bill_title: None,
        vote_type: cast,
        result,
        party_position: position,
        category: None,
    }
}

/// Five votes, stored oldest first so ordering is the service's job.
pub(super) fn vote_history() -> Vec<Vote> {
    vec![
        vote(
            "v5",
            "2021-06-01",
            "Bill C-30, Budget Implementation Act",
            VoteType::Nay,
            Some(VoteType::Nay),
            VoteResult::AgreedTo,
        ),
        vote(
            "v4",
            "2023-12-01",
            "Bill S-5, An Act respecting climate emissions",
            VoteType::Paired,
            Some(VoteType::Nay),
            VoteResult::AgreedTo,
        ),
        vote(
            "v3",
            "2024-01-10",
            "Opposition motion (housing affordability)",
            VoteType::Yea,
            None,
            VoteResult::AgreedTo,
        ),
        vote(
            "v2",
            "2024-02-15",
            "C-21, An Act respecting firearms",
            VoteType::Nay,
            Some(VoteType::Yea),
            VoteResult::Negatived,
        ),
        vote(
            "v1",
            "2024-03-01",
            "3rd reading of Bill C-12, An Act respecting pharmacare",
            VoteType::Yea,
            Some(VoteType::Yea),
            VoteResult::AgreedTo,
        ),
    ]
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store
        .replace_roster(vec![Representative {
            id: rep_id(),
            name: "Jane Doe".to_string(),
            district_name: "Oakville East".to_string(),
            district_id: Some("35076".to_string()),
            party_name: "Liberal".to_string(),
            email: None,
            phone: None,
            url: None,
            gender: None,
            person_id: Some("12345".to_string()),
        }])
        .expect("seed roster");
    store.add_votes(vote_history()).expect("seed votes");
    store
}

pub(super) fn settings(render_limit: usize, session_start: Option<&str>) -> StatisticsSettings {
    StatisticsSettings {
        render_limit,
        session_start: session_start.map(date),
    }
}

pub(super) fn service(
    store: Arc<InMemoryStore>,
    settings: StatisticsSettings,
    background: BackgroundTasks,
) -> StatisticsService {
    StatisticsService::new(
        &Repositories::in_memory(store),
        Arc::new(KeywordClassifier::new()),
        settings,
        background,
    )
}

/// Drops abstentions on the floor, so its buckets never cover the full vote set.
pub(super) struct ForgetfulAggregator;

impl LoyaltyAggregator for ForgetfulAggregator {
    fn aggregate(&self, id: &RepresentativeId, votes: &[Vote]) -> PartyLoyaltySnapshot {
        let mut snapshot = PartyLineAggregator.aggregate(id, votes);
        snapshot.abstained_paired_votes = 0;
        snapshot
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
