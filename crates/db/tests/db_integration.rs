//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `voting_test`)
//!   `TEST_DB_PASSWORD` (default: `voting_test`)
//!   `TEST_DB_NAME` (default: `voting_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::Set;
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use voting_db::entities::{employee, location, voting_cycle};
use voting_db::migrations::Migrator;
use voting_db::repositories::{
    BallotRepository, BallotStore, EmployeeRepository, InsertOutcome, LocationRepository,
    NewBallot, VoteInviteRepository, VotingCycleRepository,
};
use voting_db::test_utils::{TestDatabase, TestDbConfig};

async fn seeded_database() -> (TestDatabase, Arc<sea_orm::DatabaseConnection>) {
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create test database");
    Migrator::up(db.connection(), None)
        .await
        .expect("Failed to run migrations");

    let conn = db
        .shared_connection()
        .await
        .expect("Failed to open repository connection");
    let now = Utc::now();

    LocationRepository::new(Arc::clone(&conn))
        .create(location::ActiveModel {
            id: Set("l1".to_string()),
            name: Set("Downtown".to_string()),
            code: Set("DT".to_string()),
            created_at: Set(now.into()),
        })
        .await
        .unwrap();

    let employees = EmployeeRepository::new(Arc::clone(&conn));
    for (id, code) in [("v1", "E-1"), ("n1", "E-2"), ("n2", "E-3")] {
        employees
            .create(employee::ActiveModel {
                id: Set(id.to_string()),
                first_name: Set(id.to_uppercase()),
                last_name: Set("Test".to_string()),
                employee_code: Set(code.to_string()),
                email: Set(format!("{id}@example.com")),
                location_ids: Set(json!(["l1"])),
                created_at: Set(now.into()),
            })
            .await
            .unwrap();
    }

    VotingCycleRepository::new(Arc::clone(&conn))
        .create(voting_cycle::ActiveModel {
            id: Set("c1".to_string()),
            name: Set("Integration".to_string()),
            location_ids: Set(json!(["l1"])),
            voter_ids: Set(json!(["v1"])),
            nominee_ids: Set(json!(["n1", "n2"])),
            start_at: Set((now - Duration::hours(1)).into()),
            end_at: Set((now + Duration::hours(1)).into()),
            vote_points: Set(1),
            max_votes_per_voter: Set(1),
            results_notified_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    (db, conn)
}

fn new_ballot(id: &str) -> NewBallot {
    NewBallot {
        id: id.to_string(),
        cycle_id: "c1".to_string(),
        voter_id: "v1".to_string(),
        nominee_ids: vec!["n1".to_string()],
        cast_at: Utc::now().into(),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_second_ballot_is_rejected_by_unique_index() {
    let (db, conn) = seeded_database().await;
    let repo = BallotRepository::new(conn);

    let first = repo.insert_ballot(new_ballot("b1")).await.unwrap();
    let second = repo.insert_ballot(new_ballot("b2")).await.unwrap();

    assert!(matches!(first, InsertOutcome::Inserted(_)));
    assert_eq!(second, InsertOutcome::AlreadyExists);
    assert_eq!(repo.count_ballots("c1").await.unwrap(), 1);

    db.drop_database().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_ballots_exactly_one_inserted() {
    let (db, conn) = seeded_database().await;
    let repo = Arc::new(BallotRepository::new(conn));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.insert_ballot(new_ballot(&format!("b{i}"))).await })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if matches!(handle.await.unwrap().unwrap(), InsertOutcome::Inserted(_)) {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(repo.count_ballots("c1").await.unwrap(), 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_upsert_winner_replaces_previous_announcement() {
    let (db, conn) = seeded_database().await;
    let repo = VotingCycleRepository::new(conn);

    repo.upsert_winner("c1", "l1", "n1", Utc::now().into())
        .await
        .unwrap();
    repo.upsert_winner("c1", "l1", "n2", Utc::now().into())
        .await
        .unwrap();

    let winners = repo.find_winners("c1").await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].employee_id, "n2");

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_reissued_invite_resets_token() {
    let (db, conn) = seeded_database().await;
    let repo = VoteInviteRepository::new(conn);

    let first = repo
        .upsert_for_employee("i1", "c1", "v1", "token-a", Utc::now().into())
        .await
        .unwrap();
    repo.mark_used(&first.id, Utc::now().into()).await.unwrap();

    let second = repo
        .upsert_for_employee("i2", "c1", "v1", "token-b", Utc::now().into())
        .await
        .unwrap();

    assert_eq!(second.id, "i1");
    assert_eq!(second.token, "token-b");
    assert!(!second.used);
    assert!(repo.find_by_token("c1", "token-a").await.unwrap().is_none());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_cycle_cascades() {
    let (db, conn) = seeded_database().await;
    let ballots = BallotRepository::new(Arc::clone(&conn));
    let cycles = VotingCycleRepository::new(conn);

    ballots.insert_ballot(new_ballot("b1")).await.unwrap();
    cycles.delete("c1").await.unwrap();

    assert!(cycles.find_by_id("c1").await.unwrap().is_none());
    assert_eq!(ballots.count_ballots("c1").await.unwrap(), 0);

    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
