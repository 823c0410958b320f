//! Issue status and fate derivation
//!
//! Derives, per issue, the ordered set of legislative steps taken (from
//! evidence rows accumulated by reconciliation) and the final disposition,
//! and persists both. Running twice over unchanged evidence produces zero
//! writes on the second run.

pub mod evidence;
pub mod fate;
pub mod steps;
pub mod votes;

use crate::db::issue_steps;
use crate::db::issues::{self, Issue};
use crate::sync::issues::sync_issue;
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use althingi_common::db::fields::FieldChange;
use althingi_common::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

pub use evidence::determine_status;
pub use fate::determine_fate;
pub use steps::{IssueType, Step, StepMap};

/// Write counts of one status application.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrites {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
}

impl StatusWrites {
    pub fn total(&self) -> u64 {
        self.added + self.updated + self.deleted
    }
}

/// Derive and persist status and fate for every group-A issue of a
/// parliament.
pub async fn sync_issue_statuses(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    for issue in issues::list_group_a(&ctx.pool, parliament.id).await? {
        let writes = update_issue_status(&ctx.pool, &issue).await?;
        ctx.stats.added += writes.added;
        ctx.stats.updated += writes.updated;
        ctx.stats.deleted += writes.deleted;
    }

    Ok(())
}

/// Derive and persist status and fate for one issue, reconciling the issue
/// first so the evidence is current.
pub async fn sync_issue_status(
    ctx: &mut SyncContext,
    issue_num: i64,
    parliament_num: Option<i64>,
) -> Result<()> {
    let issue = sync_issue(ctx, issue_num, parliament_num).await?;
    let writes = update_issue_status(&ctx.pool, &issue).await?;
    ctx.stats.added += writes.added;
    ctx.stats.updated += writes.updated;
    ctx.stats.deleted += writes.deleted;

    Ok(())
}

/// Derive the step map and fate for one issue and persist both.
pub async fn update_issue_status(pool: &SqlitePool, issue: &Issue) -> Result<StatusWrites> {
    let mut writes = StatusWrites::default();

    match determine_status(pool, issue).await? {
        Some(map) => {
            apply_status(pool, issue, &map, &mut writes).await?;
        }
        None => {
            // No vocabulary for this type: any stale step state is removed.
            let purged = issue_steps::delete_all_for_issue(pool, issue.id).await?;
            writes.deleted += purged;

            if issue.current_step.is_some() {
                issues::update(
                    pool,
                    issue.id,
                    &[FieldChange::text("current_step", None::<String>)],
                )
                .await?;
                writes.updated += 1;
            }
            return Ok(writes);
        }
    }

    let fate = determine_fate(pool, issue).await?;
    if issue.fate != fate {
        issues::update(pool, issue.id, &[FieldChange::text("fate", fate.clone())]).await?;
        writes.updated += 1;
        tracing::info!(
            "Issue {} fate: {}",
            issue.issue_num,
            fate.as_deref().unwrap_or("undecided")
        );
    }

    Ok(writes)
}

/// Persist a derived step map: create missing taken steps, fix orders,
/// delete steps no longer taken, and record the last taken step as the
/// issue's current step.
async fn apply_status(
    pool: &SqlitePool,
    issue: &Issue,
    map: &StepMap,
    writes: &mut StatusWrites,
) -> Result<()> {
    let mut existing = issue_steps::list_for_issue(pool, issue.id).await?;

    // Self-healing: duplicated step rows mean earlier state is corrupt;
    // rebuild from scratch.
    let mut seen = HashSet::new();
    let has_duplicates = existing.iter().any(|row| !seen.insert(row.step.clone()));
    if has_duplicates {
        let purged = issue_steps::delete_all_for_issue(pool, issue.id).await?;
        writes.deleted += purged;
        tracing::warn!(
            "Purged {} duplicated step rows of issue {}",
            purged,
            issue.issue_num
        );
        existing.clear();
    }

    // Steps outside the current vocabulary are leftovers from an issue
    // type change.
    let vocabulary: HashSet<&str> = map.entries().iter().map(|(s, _)| s.name()).collect();
    for row in &existing {
        if !vocabulary.contains(row.step.as_str()) {
            issue_steps::delete(pool, row.id).await?;
            writes.deleted += 1;
        }
    }

    let mut order_num = 0;
    for (step, taken) in map.entries() {
        let row = existing.iter().find(|r| r.step == step.name());

        if *taken {
            order_num += 1;
            match row {
                None => {
                    issue_steps::insert(pool, issue.id, step.name(), order_num).await?;
                    writes.added += 1;
                }
                Some(row) if row.order_num != order_num => {
                    issue_steps::update_order(pool, row.id, order_num).await?;
                    writes.updated += 1;
                }
                Some(_) => {}
            }
        } else if let Some(row) = row {
            issue_steps::delete(pool, row.id).await?;
            writes.deleted += 1;
        }
    }

    let current_step = map.current_step().map(|s| s.name().to_string());
    if issue.current_step != current_step {
        issues::update(
            pool,
            issue.id,
            &[FieldChange::text("current_step", current_step.clone())],
        )
        .await?;
        writes.updated += 1;
        tracing::info!(
            "Issue {} current step: {}",
            issue.issue_num,
            current_step.as_deref().unwrap_or("none")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use althingi_common::db::init_memory_pool;

    async fn fixture_issue(pool: &SqlitePool, issue_type: &str) -> Issue {
        sqlx::query("INSERT INTO parliaments (parliament_num) VALUES (148)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO issues (parliament_id, issue_num, issue_type, name) VALUES (1, 1, ?, 'mál')",
        )
        .bind(issue_type)
        .execute(pool)
        .await
        .unwrap();
        issues::find_by_num(pool, 1, 1, "A").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_evidence_free_bill_is_distributed() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        let writes = update_issue_status(&pool, &issue).await.unwrap();
        assert_eq!(writes.added, 1); // the distributed step row
        assert_eq!(writes.updated, 1); // current_step

        let current: Option<String> =
            sqlx::query_scalar("SELECT current_step FROM issues WHERE id = ?")
                .bind(issue.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(current.as_deref(), Some("distributed"));

        let steps = issue_steps::list_for_issue(&pool, issue.id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step, "distributed");
        assert_eq!(steps[0].order_num, 1);
    }

    #[tokio::test]
    async fn test_second_application_writes_nothing() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        update_issue_status(&pool, &issue).await.unwrap();

        // Reload so current_step reflects the first pass.
        let issue = issues::find_by_num(&pool, 1, 1, "A").await.unwrap().unwrap();
        let writes = update_issue_status(&pool, &issue).await.unwrap();
        assert_eq!(writes.total(), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_has_no_status() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "s").await;

        let writes = update_issue_status(&pool, &issue).await.unwrap();
        assert_eq!(writes.total(), 0);

        let current: Option<String> =
            sqlx::query_scalar("SELECT current_step FROM issues WHERE id = ?")
                .bind(issue.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(current, None);
    }

    #[tokio::test]
    async fn test_duplicate_rows_are_purged_and_rebuilt() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "l").await;

        // Simulate corrupt state left behind by an earlier run.
        issue_steps::insert(&pool, issue.id, "distributed", 1).await.unwrap();
        issue_steps::insert(&pool, issue.id, "distributed", 2).await.unwrap();

        let writes = update_issue_status(&pool, &issue).await.unwrap();
        assert!(writes.deleted >= 2);

        let steps = issue_steps::list_for_issue(&pool, issue.id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step, "distributed");
    }

    #[tokio::test]
    async fn test_step_rows_track_lost_evidence() {
        let pool = init_memory_pool().await.unwrap();
        let issue = fixture_issue(&pool, "q").await;

        // Answered once...
        sqlx::query(
            "INSERT INTO documents (issue_id, doc_num, doc_type, time_published) VALUES (?, 1, 'svar', '2018-01-01 00:00:00+00:00')",
        )
        .bind(issue.id)
        .execute(&pool)
        .await
        .unwrap();
        update_issue_status(&pool, &issue).await.unwrap();

        let steps = issue_steps::list_for_issue(&pool, issue.id).await.unwrap();
        assert_eq!(steps.len(), 2);

        // ...then the answer document vanishes upstream.
        sqlx::query("DELETE FROM documents WHERE issue_id = ?")
            .bind(issue.id)
            .execute(&pool)
            .await
            .unwrap();
        let issue = issues::find_by_num(&pool, 1, 1, "A").await.unwrap().unwrap();
        let writes = update_issue_status(&pool, &issue).await.unwrap();
        assert_eq!(writes.deleted, 1);

        let steps = issue_steps::list_for_issue(&pool, issue.id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step, "distributed");
    }
}
