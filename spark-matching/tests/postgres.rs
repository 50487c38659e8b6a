//! Engine tests against a real PostgreSQL.
//!
//! Ignored by default. Point `DATABASE_URL` at a scratch database and run
//! `cargo test -p spark-matching --test postgres -- --ignored`. The schema is
//! created on first use; every test works on fresh user ids.

use std::sync::mpsc;
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use uuid::Uuid;

use spark_matching::models::{Match, PairKey, ProfileChanges};
use spark_matching::services::{conversation_service, matching_service, profile_service, safety_service};
use spark_matching::store::{Database, PgStore, RetryPolicy, Store};
use spark_shared::clients::db::{create_pool, DbPool};
use spark_shared::ErrorCode;

fn pool() -> DbPool {
    static POOL: OnceLock<DbPool> = OnceLock::new();
    POOL.get_or_init(|| {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
        let pool = create_pool(&url, 24).unwrap();
        let mut conn = pool.get().unwrap();
        let migrated = diesel::select(diesel::dsl::sql::<Bool>("to_regclass('public.users') IS NOT NULL"))
            .get_result::<bool>(&mut conn)
            .unwrap();
        if !migrated {
            conn.batch_execute(include_str!("../migrations/0001_init.sql")).unwrap();
        }
        pool
    })
    .clone()
}

fn store(statement_timeout_ms: u64) -> PgStore {
    PgStore::new(pool(), statement_timeout_ms)
}

fn database() -> Database {
    Database::postgres(store(5_000), RetryPolicy::default())
}

fn onboarded(db: &Database) -> Uuid {
    let id = Uuid::now_v7();
    let changes = ProfileChanges {
        name: Some(Some(format!("pg-{id}"))),
        age: Some(Some(31)),
        ..Default::default()
    };
    profile_service::onboard(db, id, changes).unwrap();
    id
}

fn matched_pair(db: &Database) -> (Uuid, Uuid, Match) {
    let (a, b) = (onboarded(db), onboarded(db));
    matching_service::record_swipe(db, a, b, true).unwrap();
    let m = matching_service::record_swipe(db, b, a, true).unwrap().created_match.unwrap();
    (a, b, m)
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn concurrent_reciprocal_likes_produce_exactly_one_match() {
    let db = database();

    for _ in 0..10 {
        let (a, b) = (onboarded(&db), onboarded(&db));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a, b), (b, a)]
            .into_iter()
            .map(|(actor, target)| {
                let db = db.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    matching_service::record_swipe(&db, actor, target, true).unwrap()
                })
            })
            .collect();

        let matched = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.outcome.matched)
            .count();
        assert_eq!(matched, 1);
        assert_eq!(conversation_service::list_matches(&db, a).unwrap().len(), 1);
    }
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn disjoint_pairs_match_in_parallel() {
    let db = database();
    let pairs: Vec<(Uuid, Uuid)> = (0..8).map(|_| (onboarded(&db), onboarded(&db))).collect();
    let barrier = Arc::new(Barrier::new(pairs.len() * 2));

    let handles: Vec<_> = pairs
        .iter()
        .flat_map(|&(a, b)| [(a, b), (b, a)])
        .map(|(actor, target)| {
            let db = db.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                matching_service::record_swipe(&db, actor, target, true).unwrap().outcome.matched
            })
        })
        .collect();

    let matched = handles.into_iter().map(|h| h.join().unwrap()).filter(|m| *m).count();
    assert_eq!(matched, pairs.len());
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn block_removes_match_and_its_messages() {
    let db = database();
    let (a, b, m) = matched_pair(&db);
    conversation_service::send_message(&db, a, m.id, "hi").unwrap();
    conversation_service::send_message(&db, b, m.id, "hey").unwrap();

    let outcome = safety_service::create_block(&db, b, a).unwrap();
    assert_eq!(outcome.removed_match.map(|r| r.id), Some(m.id));

    assert!(conversation_service::list_matches(&db, a).unwrap().is_empty());
    assert!(conversation_service::list_matches(&db, b).unwrap().is_empty());

    // rows cascaded away with the match
    let left = store(5_000).transaction(|tx| tx.list_messages(m.id, 100)).unwrap();
    assert!(left.is_empty());

    // a later like across the block records but never re-matches
    let again = matching_service::record_swipe(&db, a, b, true).unwrap();
    assert!(!again.outcome.matched);
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn message_limit_returns_earliest_in_order() {
    let db = database();
    let (a, b, m) = matched_pair(&db);

    for i in 0..5 {
        let sender = if i % 2 == 0 { a } else { b };
        conversation_service::send_message(&db, sender, m.id, &format!("m{i}")).unwrap();
    }

    let texts: Vec<String> = conversation_service::list_messages(&db, m.id, 3)
        .unwrap()
        .into_iter()
        .map(|msg| msg.text)
        .collect();
    assert_eq!(texts, ["m0", "m1", "m2"]);

    let summary = &conversation_service::list_matches(&db, b).unwrap()[0];
    assert_eq!(summary.last_message.as_ref().map(|msg| msg.text.as_str()), Some("m4"));
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn duplicate_match_insert_is_a_transient_conflict() {
    let db = database();
    let (a, b) = (onboarded(&db), onboarded(&db));
    let pair = PairKey::new(a, b);

    let err = store(5_000)
        .transaction(|tx| {
            tx.insert_match(&Match::new(pair, Utc::now()))?;
            tx.insert_match(&Match::new(pair, Utc::now()))
        })
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.code(), ErrorCode::Conflict);

    // the failed transaction left nothing behind
    assert!(store(5_000).transaction(|tx| tx.find_match_for_pair(pair)).unwrap().is_none());

    let retrying = Database::postgres(
        store(5_000),
        RetryPolicy { max_attempts: 2, backoff_base: Duration::from_millis(1) },
    );
    let err = retrying
        .transaction("duplicate_match", |tx| {
            tx.insert_match(&Match::new(pair, Utc::now()))?;
            tx.insert_match(&Match::new(pair, Utc::now()))
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres"]
fn pair_lock_wait_is_bounded_by_statement_timeout() {
    let pair = PairKey::new(Uuid::now_v7(), Uuid::now_v7());
    let (locked_tx, locked_rx) = mpsc::channel();

    let holder = thread::spawn(move || {
        store(5_000)
            .transaction(|tx| {
                tx.lock_pair(pair)?;
                locked_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(1_000));
                Ok(())
            })
            .unwrap();
    });

    locked_rx.recv().unwrap();
    let err = store(100).transaction(|tx| tx.lock_pair(pair)).unwrap_err();
    assert!(!err.is_transient());

    holder.join().unwrap();
    // released at commit
    store(100).transaction(|tx| tx.lock_pair(pair)).unwrap();
}
