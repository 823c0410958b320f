//! Shared helpers for integration tests
//!
//! Tests run the engine fully offline: the feed client is pointed at a
//! fixture directory through the on-disk XML cache, so every "fetch" is a
//! cache hit.

use althingi_common::config::Settings;
use althingi_ingest::status;
use althingi_ingest::sync::{self, SyncContext};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn offline_settings(cache_dir: &Path) -> Settings {
    Settings {
        current_parliament_num: 148,
        xml_use_cache: true,
        xml_cache_dir: cache_dir.to_path_buf(),
        ..Settings::default()
    }
}

pub async fn memory_pool() -> SqlitePool {
    althingi_common::db::init_memory_pool()
        .await
        .expect("schema bootstrap failed")
}

pub async fn offline_context(cache_dir: &Path) -> SyncContext {
    let pool = memory_pool().await;
    SyncContext::new(pool, offline_settings(cache_dir)).expect("context setup failed")
}

/// The full per-parliament reconciliation sequence, as the `all` command
/// runs it (without the final full-sync stamp).
pub async fn full_run(ctx: &mut SyncContext, parliament_num: i64) {
    let parliament_num = Some(parliament_num);

    sync::parties::sync_parties(ctx, parliament_num).await.unwrap();
    sync::constituencies::sync_constituencies(ctx, parliament_num)
        .await
        .unwrap();
    sync::categories::sync_categories(ctx).await.unwrap();
    sync::committees::sync_committees(ctx, parliament_num).await.unwrap();
    sync::persons::sync_persons(ctx, parliament_num).await.unwrap();
    sync::ministers::sync_ministers(ctx, parliament_num).await.unwrap();
    sync::presidents::sync_presidents(ctx, parliament_num).await.unwrap();
    sync::issues::sync_issues(ctx, parliament_num).await.unwrap();
    sync::sessions::sync_sessions(ctx, parliament_num, None)
        .await
        .unwrap();
    sync::speeches::sync_speeches(ctx, parliament_num, None)
        .await
        .unwrap();
    sync::committee_agendas::sync_committee_agendas(ctx, parliament_num, None)
        .await
        .unwrap();
    sync::vote_castings::sync_vote_castings(ctx, parliament_num, None)
        .await
        .unwrap();
    status::sync_issue_statuses(ctx, parliament_num).await.unwrap();
}
