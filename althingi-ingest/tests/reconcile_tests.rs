//! Reconciliation engine integration tests over fixture XML

mod common;

use althingi_common::Error;
use althingi_ingest::sync::{self, SyncContext};
use common::{fixture_dir, full_run, memory_pool, offline_context, offline_settings};
use sqlx::Row;

#[tokio::test]
async fn test_full_reconciliation_is_idempotent() {
    let mut ctx = offline_context(&fixture_dir("full")).await;

    full_run(&mut ctx, 148).await;
    assert!(ctx.stats.added > 0, "first run must create rows");

    ctx.clear();
    full_run(&mut ctx, 148).await;

    assert_eq!(
        ctx.stats.writes(),
        0,
        "second run over an unchanged snapshot must write nothing: {:?}",
        ctx.stats
    );
    assert!(ctx.stats.unchanged > 0);
}

#[tokio::test]
async fn test_full_run_populates_expected_entities() {
    let mut ctx = offline_context(&fixture_dir("full")).await;
    full_run(&mut ctx, 148).await;
    let pool = ctx.pool.clone();

    let persons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM persons")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(persons, 3);

    // Issue 1 carries two documents, two reviews, one rapporteur and a
    // category link; the counters are projections of the child sets.
    let row = sqlx::query(
        "SELECT id, document_count, review_count, time_published FROM issues
         WHERE issue_num = 1 AND issue_group = 'A'
           AND parliament_id = (SELECT id FROM parliaments WHERE parliament_num = 148)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let issue_id: i64 = row.get("id");
    assert_eq!(row.get::<i64, _>("document_count"), 2);
    assert_eq!(row.get::<i64, _>("review_count"), 2);
    assert!(row.get::<Option<String>, _>("time_published").is_some());

    // The lowest-numbered document is the main one.
    let is_main: bool =
        sqlx::query_scalar("SELECT is_main FROM documents WHERE issue_id = ? AND doc_num = 1")
            .bind(issue_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(is_main);

    // The previously-published chain points into parliament 147.
    let previous: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM issue_links WHERE issue_id = ?")
            .bind(issue_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(previous, 1);

    // The docless issue from the session agenda exists with its speakers.
    let row = sqlx::query(
        "SELECT special_inquisitor_id FROM issues WHERE issue_num = 51 AND issue_group = 'B'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(row.get::<Option<i64>, _>("special_inquisitor_id").is_some());

    // Minister and president seats came through their listings.
    let minister_seats: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM minister_seats")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(minister_seats, 1);
    let president_seats: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM president_seats")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(president_seats, 1);
}

#[tokio::test]
async fn test_vote_casting_destination_resolution() {
    let mut ctx = offline_context(&fixture_dir("full")).await;
    full_run(&mut ctx, 148).await;
    let pool = ctx.pool.clone();

    // An exact committee name resolves to that committee.
    let row = sqlx::query(
        "SELECT to_committee_id, to_minister_id FROM vote_castings WHERE vote_casting_xml_id = 54801",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(row.get::<Option<i64>, _>("to_committee_id").is_some());
    assert_eq!(row.get::<Option<i64>, _>("to_minister_id"), None);

    // An unrecognized name resolves to nothing rather than a guess.
    let row = sqlx::query(
        "SELECT to_committee_id, to_minister_id FROM vote_castings WHERE vote_casting_xml_id = 54803",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<Option<i64>, _>("to_committee_id"), None);
    assert_eq!(row.get::<Option<i64>, _>("to_minister_id"), None);
}

#[tokio::test]
async fn test_single_field_drift_yields_minimal_writes() {
    let mut ctx = offline_context(&fixture_dir("full")).await;
    full_run(&mut ctx, 148).await;
    let pool = ctx.pool.clone();

    // Same database, drifted snapshot: the issue's description changed and
    // one review disappeared upstream.
    let mut drift_ctx =
        SyncContext::new(pool.clone(), offline_settings(&fixture_dir("drift"))).unwrap();
    sync::issues::sync_issue(&mut drift_ctx, 1, Some(148))
        .await
        .unwrap();

    assert_eq!(drift_ctx.stats.added, 0, "{:?}", drift_ctx.stats);
    assert_eq!(drift_ctx.stats.updated, 1, "{:?}", drift_ctx.stats);
    assert_eq!(drift_ctx.stats.deleted, 1, "{:?}", drift_ctx.stats);

    let description: String = sqlx::query_scalar(
        "SELECT description FROM issues WHERE issue_num = 1 AND issue_group = 'A'
         AND parliament_id = (SELECT id FROM parliaments WHERE parliament_num = 148)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(description, "Niðurstöðutölur ársins 2018.");

    // Exactly the dropped review is gone; its sibling survives.
    let issue_id: i64 = sqlx::query_scalar(
        "SELECT id FROM issues WHERE issue_num = 1 AND issue_group = 'A'
         AND parliament_id = (SELECT id FROM parliaments WHERE parliament_num = 148)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let reviews = althingi_ingest::db::reviews::list_for_issue(&pool, issue_id)
        .await
        .unwrap();
    let log_nums: Vec<i64> = reviews.iter().map(|r| r.log_num).collect();
    assert_eq!(log_nums, vec![7]);
}

#[tokio::test]
async fn test_speech_order_is_stable_across_runs() {
    let mut ctx = offline_context(&fixture_dir("full")).await;

    full_run(&mut ctx, 148).await;
    let pool = ctx.pool.clone();

    let orders = |pool: sqlx::SqlitePool| async move {
        sqlx::query_as::<_, (String, Option<i64>)>(
            "SELECT timing_start, order_in_issue FROM speeches ORDER BY timing_start",
        )
        .fetch_all(&pool)
        .await
        .unwrap()
    };

    let first = orders(pool.clone()).await;
    assert_eq!(first.len(), 3);
    // Two speeches on the bill, numbered in listing order; one on the
    // docless issue with its own counter.
    assert_eq!(first[0].1, Some(1));
    assert_eq!(first[1].1, Some(2));
    assert_eq!(first[2].1, Some(1));

    ctx.clear();
    full_run(&mut ctx, 148).await;
    let second = orders(pool).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_committee_listing_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("PARLIAMENT.148.xml"),
        "<löggjafarþing><þing númer=\"148\"><tímabil>2017-2018</tímabil></þing></löggjafarþing>",
    )
    .unwrap();
    // The per-parliament listing is missing committee 202...
    std::fs::write(
        dir.path().join("COMMITTEE_LIST.148.xml"),
        r#"<nefndir>
            <nefnd id="201"><heiti>allsherjar- og menntamálanefnd</heiti>
              <skammstafanir><stuttskammstöfun>am</stuttskammstöfun><löngskammstöfun>allsh.- og menntmn.</löngskammstöfun></skammstafanir>
            </nefnd>
           </nefndir>"#,
    )
    .unwrap();
    // ...but the parliament-agnostic full listing knows it.
    std::fs::write(
        dir.path().join("COMMITTEE_FULL_LIST.xml"),
        r#"<nefndir>
            <nefnd id="201"><heiti>allsherjar- og menntamálanefnd</heiti>
              <skammstafanir><stuttskammstöfun>am</stuttskammstöfun><löngskammstöfun>allsh.- og menntmn.</löngskammstöfun></skammstafanir>
            </nefnd>
            <nefnd id="202"><heiti>sérnefnd um stjórnarskrármál</heiti>
              <skammstafanir><stuttskammstöfun>sn</stuttskammstöfun><löngskammstöfun>sérn. um stjórnarskrármál</löngskammstöfun></skammstafanir>
            </nefnd>
           </nefndir>"#,
    )
    .unwrap();

    let mut ctx = offline_context(dir.path()).await;

    let committee = sync::committees::sync_committee(&mut ctx, 202, Some(148))
        .await
        .unwrap();
    assert_eq!(committee.name, "sérnefnd um stjórnarskrármál");

    // A committee in neither listing is a domain error.
    match sync::committees::sync_committee(&mut ctx, 999, Some(148)).await {
        Err(Error::NotFoundUpstream(_)) => {}
        other => panic!("expected NotFoundUpstream, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_out_of_range_parliament_mutates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = offline_context(dir.path()).await;

    match sync::parliaments::sync_parliament(&mut ctx, Some(10)).await {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("expected InvalidInput, got {:?}", other.map(|_| ())),
    }
    match sync::parliaments::sync_parliament(&mut ctx, Some(9999)).await {
        Err(Error::InvalidInput(_)) => {}
        other => panic!("expected InvalidInput, got {:?}", other.map(|_| ())),
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parliaments")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(ctx.stats.writes(), 0);
}

#[tokio::test]
async fn test_upcoming_sessions() {
    let mut ctx = offline_context(&fixture_dir("full")).await;

    sync::sessions::sync_next_sessions(&mut ctx).await.unwrap();

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_agenda_items")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(items, 2);
}

#[tokio::test]
async fn test_missing_person_is_not_found_upstream() {
    // An empty feed document: the person does not exist upstream.
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("PARLIAMENT.148.xml"),
        "<löggjafarþing><þing númer=\"148\"><tímabil>2017-2018</tímabil></þing></löggjafarþing>",
    )
    .unwrap();
    std::fs::write(dir.path().join("PERSON.3.xml"), "<þingmannaskrá/>").unwrap();

    let mut ctx = offline_context(dir.path()).await;

    match sync::persons::sync_person(&mut ctx, 3, Some(148)).await {
        Err(Error::NotFoundUpstream(message)) => {
            assert!(message.contains("3"), "message: {}", message);
        }
        other => panic!("expected NotFoundUpstream, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_deleted_session_is_removed_locally() {
    let mut ctx = offline_context(&fixture_dir("full")).await;
    full_run(&mut ctx, 148).await;
    let pool = ctx.pool.clone();

    // The feed forgets session 3 entirely.
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(
        fixture_dir("full").join("PARLIAMENT.148.xml"),
        dir.path().join("PARLIAMENT.148.xml"),
    )
    .unwrap();
    std::fs::write(dir.path().join("SESSION_AGENDA.148.3.xml"), "<þingfundardagskrá/>").unwrap();

    let mut drift_ctx = SyncContext::new(pool.clone(), offline_settings(dir.path())).unwrap();
    let result = sync::sessions::sync_session(&mut drift_ctx, 3, Some(148))
        .await
        .unwrap();
    assert!(result.is_none());

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sessions, 0);

    // The cascade took the agenda items with it.
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_agenda_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, 0);

    // An unknown session that never existed locally is a domain error.
    match sync::sessions::sync_session(&mut drift_ctx, 3, Some(148)).await {
        Err(Error::NotFoundUpstream(_)) => {}
        other => panic!("expected NotFoundUpstream, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_memoization_bounds_fetches() {
    // With the memo cache live, reconciling the same person twice in one
    // run must not re-diff (the second call is a cache hit).
    let mut ctx = offline_context(&fixture_dir("full")).await;

    sync::persons::sync_person(&mut ctx, 1166, Some(148))
        .await
        .unwrap();
    let stats_after_first = ctx.stats;

    sync::persons::sync_person(&mut ctx, 1166, Some(148))
        .await
        .unwrap();
    assert_eq!(ctx.stats, stats_after_first);
}

#[tokio::test]
async fn test_memory_pool_has_schema() {
    let pool = memory_pool().await;
    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'issues'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(tables, 1);
}
