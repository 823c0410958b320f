//! Issue step database operations
//!
//! One row per taken legislative step, with an explicit order. The status
//! machine makes the row set exactly match the derived step map on every
//! pass; uniqueness per (issue, step) is maintained there, with duplicated
//! rows treated as corruption and rebuilt wholesale.

use althingi_common::Result;
use sqlx::SqlitePool;

/// Issue step record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueStep {
    pub id: i64,
    pub issue_id: i64,
    pub step: String,
    pub order_num: i64,
}

pub async fn list_for_issue(pool: &SqlitePool, issue_id: i64) -> Result<Vec<IssueStep>> {
    let steps = sqlx::query_as::<_, IssueStep>(
        "SELECT * FROM issue_steps WHERE issue_id = ? ORDER BY order_num",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    Ok(steps)
}

pub async fn insert(pool: &SqlitePool, issue_id: i64, step: &str, order_num: i64) -> Result<i64> {
    let result =
        sqlx::query("INSERT INTO issue_steps (issue_id, step, order_num) VALUES (?, ?, ?)")
            .bind(issue_id)
            .bind(step)
            .bind(order_num)
            .execute(pool)
            .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_order(pool: &SqlitePool, id: i64, order_num: i64) -> Result<()> {
    sqlx::query("UPDATE issue_steps SET order_num = ? WHERE id = ?")
        .bind(order_num)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM issue_steps WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Purge every step row of the issue. Used for defensive self-healing when
/// duplicates are detected.
pub async fn delete_all_for_issue(pool: &SqlitePool, issue_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM issue_steps WHERE issue_id = ?")
        .bind(issue_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
