use super::common::*;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::DistrictMapping;
use crate::lookup::{
    DistrictSource, FailureReason, MatchStrategy, NameResolution, ResolveError, ResolvedBy,
};
use crate::store::PostalCodeRepository;

#[tokio::test]
async fn cache_miss_calls_upstream_once_and_hit_skips_it() {
    let store = seeded_store();
    let upstream = Arc::new(ScriptedLookup::district("Ottawa Centre", None));
    let resolver = resolver(store.clone(), upstream.clone());

    let first = resolver
        .resolve_by_postal_code("k1a 0a6")
        .await
        .expect("resolves");
    assert_eq!(first.representative.id.0, "mp-ottawa");
    assert_eq!(first.district_source, Some(DistrictSource::Upstream));
    assert_eq!(upstream.calls(), 1);

    let cached = PostalCodeRepository::fetch(store.as_ref(), &code("K1A0A6"))
        .expect("fetch")
        .expect("mapping cached");
    assert_eq!(cached.source, "represent");
    assert_eq!(cached.external_id.as_deref(), Some("35076"));

    let second = resolver
        .resolve_by_postal_code("K1A0A6")
        .await
        .expect("resolves");
    assert_eq!(second.representative.id.0, "mp-ottawa");
    assert_eq!(second.district_source, Some(DistrictSource::Cache));
    assert_eq!(upstream.calls(), 1, "cache hit makes no upstream call");
}

#[tokio::test]
async fn expired_cache_rows_are_refreshed_from_upstream() {
    let store = seeded_store();
    store
        .upsert(DistrictMapping {
            postal_code: code("K1A0A6"),
            district_name: "Ottawa Vanier".to_string(),
            external_id: None,
            person_id: None,
            source: "represent".to_string(),
            expires_at: Utc::now() - ChronoDuration::days(1),
        })
        .expect("seed expired row");
    let upstream = Arc::new(ScriptedLookup::district("Ottawa Centre", None));
    let resolver = resolver(store.clone(), upstream.clone());

    let resolution = resolver
        .resolve_by_postal_code("K1A0A6")
        .await
        .expect("resolves");

    assert_eq!(upstream.calls(), 1);
    assert_eq!(resolution.representative.id.0, "mp-ottawa");
    let refreshed = PostalCodeRepository::fetch(store.as_ref(), &code("K1A0A6"))
        .expect("fetch")
        .expect("row");
    assert_eq!(refreshed.district_name, "Ottawa Centre");
    assert!(refreshed.expires_at > Utc::now());
}

#[tokio::test]
async fn redistricted_boundary_resolves_deterministically() {
    let upstream = Arc::new(ScriptedLookup::district("Oakville", None));
    let resolver = resolver(seeded_store(), upstream);

    let resolution = resolver
        .resolve_by_postal_code("L6H 0A1")
        .await
        .expect("resolves");

    assert_eq!(resolution.representative.district_name, "Oakville East");
    assert_eq!(
        resolution.resolved_by,
        ResolvedBy::District {
            strategy: MatchStrategy::Alphabetical
        }
    );
}

#[tokio::test]
async fn representative_facing_district_name_wins_over_boundary() {
    let upstream = Arc::new(ScriptedLookup::district("Oakville", Some("Oakville West")));
    let resolver = resolver(seeded_store(), upstream);

    let resolution = resolver
        .resolve_by_postal_code("L6H0A1")
        .await
        .expect("resolves");

    assert_eq!(resolution.representative.id.0, "mp-west");
    assert_eq!(resolution.district_name.as_deref(), Some("Oakville West"));
}

#[tokio::test]
async fn upstream_person_id_takes_precedence_over_district_match() {
    let upstream = Arc::new(ScriptedLookup::with_person("12345", "Oakville West"));
    let resolver = resolver(seeded_store(), upstream);

    let resolution = resolver
        .resolve_by_postal_code("L6H0A1")
        .await
        .expect("resolves");

    assert_eq!(resolution.representative.id.0, "mp-east");
    assert_eq!(
        resolution.resolved_by,
        ResolvedBy::PersonId {
            person_id: "12345".to_string()
        }
    );
}

#[tokio::test]
async fn cached_person_id_keeps_precedence_on_later_lookups() {
    let upstream = Arc::new(ScriptedLookup::with_person("12345", "Oakville West"));
    let resolver = resolver(seeded_store(), upstream.clone());

    let first = resolver
        .resolve_by_postal_code("L6H0A1")
        .await
        .expect("first resolves");
    let second = resolver
        .resolve_by_postal_code("L6H 0A1")
        .await
        .expect("second resolves");

    assert_eq!(upstream.calls(), 1);
    assert_eq!(second.district_source, Some(DistrictSource::Cache));
    assert_eq!(first.representative, second.representative);
    assert_eq!(second.representative.id.0, "mp-east");
    assert_eq!(first.resolved_by, second.resolved_by);
}

#[tokio::test]
async fn upstream_timeout_falls_through_to_manual_mapping() {
    let store = seeded_store();
    store
        .add_manual_mapping(code("L6H0A1"), "Ottawa Centre")
        .expect("manual mapping");
    let upstream = Arc::new(
        ScriptedLookup::district("Oakville", None).delayed(Duration::from_millis(500)),
    );
    let resolver = resolver(store.clone(), upstream.clone());

    let resolution = resolver
        .resolve_by_postal_code("L6H0A1")
        .await
        .expect("manual mapping resolves");

    assert_eq!(upstream.calls(), 1);
    assert_eq!(resolution.representative.id.0, "mp-ottawa");
    assert_eq!(resolution.district_source, Some(DistrictSource::Manual));
    assert!(matches!(
        resolution.resolved_by,
        ResolvedBy::ManualMapping { .. }
    ));
    assert!(
        PostalCodeRepository::fetch(store.as_ref(), &code("L6H0A1"))
            .expect("fetch")
            .is_none(),
        "timed out lookups are not cached"
    );
}

#[tokio::test]
async fn upstream_failure_without_overrides_is_not_found() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::RateLimited));
    let resolver = resolver(seeded_store(), upstream.clone());

    let error = resolver
        .resolve_by_postal_code("X0A 0H0")
        .await
        .expect_err("nothing resolves");

    assert!(matches!(error, ResolveError::NotFound { ref postal_code } if postal_code.as_str() == "X0A0H0"));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn invalid_postal_codes_fail_before_any_lookup() {
    let upstream = Arc::new(ScriptedLookup::district("Ottawa Centre", None));
    let resolver = resolver(seeded_store(), upstream.clone());

    for raw in ["", "   ", "12345", "K1A-0A6", "K1A0A"] {
        let error = resolver
            .resolve_by_postal_code(raw)
            .await
            .expect_err("invalid input");
        assert!(matches!(error, ResolveError::Validation(_)), "{raw:?}");
    }
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn concurrent_misses_share_one_upstream_call() {
    let upstream = Arc::new(
        ScriptedLookup::district("Ottawa Centre", None).delayed(Duration::from_millis(30)),
    );
    let resolver = Arc::new(resolver(seeded_store(), upstream.clone()));

    let lookups = (0..6).map(|_| {
        let resolver = resolver.clone();
        async move { resolver.resolve_by_postal_code("K1A 0A6").await }
    });
    let results = futures::future::join_all(lookups).await;

    for result in results {
        assert_eq!(result.expect("resolves").representative.id.0, "mp-ottawa");
    }
    assert_eq!(upstream.calls(), 1);
}

#[test]
fn name_search_ranks_exact_over_partial_matches() {
    let upstream = Arc::new(ScriptedLookup::failing(FailureReason::Other));
    let resolver = resolver(seeded_store(), upstream);

    match resolver.resolve_by_name("  anne MARTIN ").expect("search") {
        NameResolution::Unique(rep) => assert_eq!(rep.id.0, "mp-anne"),
        other => panic!("expected unique match, got {other:?}"),
    }

    match resolver.resolve_by_name("martin").expect("search") {
        NameResolution::Ambiguous(reps) => {
            let names: Vec<&str> = reps.iter().map(|rep| rep.name.as_str()).collect();
            assert_eq!(names, vec!["Anna Martinez", "Anne Martin"]);
        }
        other => panic!("expected ambiguous match, got {other:?}"),
    }

    assert_eq!(
        resolver.resolve_by_name("   ").expect("search"),
        NameResolution::NotFound
    );
    assert_eq!(
        resolver.resolve_by_name("Trudeau").expect("search"),
        NameResolution::NotFound
    );
}
