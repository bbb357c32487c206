// File: olivia-core/tests/postgres_tests.rs
//
// Needs a reachable Postgres; run with `cargo test -- --ignored`.

use std::sync::Arc;

use olivia_common::models::{DateWindow, SearchQuery, SessionFilter, Tier};
use olivia_common::traits::repository_traits::{CatalogRepository, EnrollmentRepository};
use olivia_core::repositories::{PostgresCatalogRepository, PostgresEnrollmentRepository};
use olivia_core::services::AvailabilitySearch;
use olivia_core::test_utils::fixtures::{self, day, local};
use olivia_core::test_utils::helpers::*;
use olivia_core::Error;

async fn seeded() -> Result<(PostgresCatalogRepository, PostgresEnrollmentRepository), Error> {
    let db = setup_test_database().await?;
    let catalog = PostgresCatalogRepository::new(db.pool().clone());
    catalog.import_seed(&fixtures::seed()).await?;
    Ok((catalog, PostgresEnrollmentRepository::new(db.pool().clone())))
}

#[tokio::test]
#[ignore = "requires a Postgres instance (TEST_DATABASE_URL)"]
async fn test_list_sessions_filters_in_sql_and_memory() -> Result<(), Error> {
    let (catalog, _) = seeded().await?;

    let filter = SessionFilter::new(local(8, 0, 0), local(9, 0, 0))
        .branches(&["campbell_county".to_string()]);
    let views = catalog.list_sessions(&filter).await?;
    // the cancelled evening yoga is excluded
    let ids: Vec<&str> = views.iter().map(|v| v.session_id.as_str()).collect();
    assert_eq!(ids, vec!["cc_swim_wed_1200"]);
    assert_eq!(views[0].remaining, 1);
    assert_eq!(views[0].branch_name, "Campbell County YMCA");

    let cancelled = catalog.get_session("cc_yoga_cancelled").await?.expect("row exists");
    assert_eq!(cancelled.status.to_string(), "cancelled");
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres instance (TEST_DATABASE_URL)"]
async fn test_search_over_postgres_matches_memory() -> Result<(), Error> {
    let (catalog, _) = seeded().await?;
    let search = AvailabilitySearch::new(Arc::new(catalog), Arc::new(fixtures::reference()), fixtures::TZ);

    let query = SearchQuery::new(DateWindow::single_day(day(9)))
        .with_branches(["blue_ash"])
        .with_buckets(["yoga"])
        .with_require_spots(true);
    let outcome = search.search(&query).await?;

    let ids: Vec<&str> = outcome.results.iter().map(|r| r.session.session_id.as_str()).collect();
    assert_eq!(ids, vec!["ba_yoga_thu_0900", "cl_yoga_thu_1800", "ma_yoga_thu_1200"]);
    assert_eq!(outcome.meta.tiers_used, vec![Tier::Primary, Tier::NearbySameDay]);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres instance (TEST_DATABASE_URL)"]
async fn test_enroll_and_cancel_round_trip() -> Result<(), Error> {
    let (catalog, enrollments) = seeded().await?;

    let first = enrollments.enroll("cl_swim_fri_0600", "m1").await?;
    assert!(!first.already_enrolled);
    assert_eq!(first.enrolled, 1);

    let again = enrollments.enroll("cl_swim_fri_0600", "m1").await?;
    assert!(again.already_enrolled);
    assert_eq!(again.enrolled, 1);

    let receipt = enrollments.cancel("cl_swim_fri_0600", "m1").await?;
    assert!(receipt.was_enrolled);
    assert_eq!(receipt.enrolled, 0);

    let view = catalog.get_session("cl_swim_fri_0600").await?.expect("row exists");
    assert_eq!(view.remaining, 8);

    assert!(matches!(enrollments.enroll("ba_yoga_sat_1000", "m1").await, Err(Error::Conflict(_))));
    assert!(matches!(enrollments.enroll("cc_yoga_cancelled", "m1").await, Err(Error::NotFound(_))));
    assert!(matches!(enrollments.enroll("missing", "m1").await, Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Postgres instance (TEST_DATABASE_URL)"]
async fn test_concurrent_enrollment_respects_capacity() -> Result<(), Error> {
    let (_, enrollments) = seeded().await?;
    let enrollments = Arc::new(enrollments);

    let mut handles = Vec::new();
    for i in 0..6 {
        let repo = enrollments.clone();
        handles.push(tokio::spawn(async move {
            repo.enroll("cc_swim_wed_1200", &format!("member_{i}")).await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(outcome) => {
                assert_eq!(outcome.enrolled, 6);
                won += 1;
            }
            Err(Error::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }
    assert_eq!(won, 1);
    Ok(())
}
