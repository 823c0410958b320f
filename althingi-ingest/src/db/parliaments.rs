//! Parliament database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Parliament record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Parliament {
    pub id: i64,
    pub parliament_num: i64,
    pub era: String,
    pub timing_start: Option<DateTime<Utc>>,
    pub timing_end: Option<DateTime<Utc>>,
    pub last_full_update: Option<DateTime<Utc>>,
}

pub async fn find_by_num(pool: &SqlitePool, parliament_num: i64) -> Result<Option<Parliament>> {
    let parliament = sqlx::query_as::<_, Parliament>(
        "SELECT * FROM parliaments WHERE parliament_num = ?",
    )
    .bind(parliament_num)
    .fetch_optional(pool)
    .await?;

    Ok(parliament)
}

pub async fn insert(
    pool: &SqlitePool,
    parliament_num: i64,
    era: &str,
    timing_start: Option<DateTime<Utc>>,
    timing_end: Option<DateTime<Utc>>,
) -> Result<Parliament> {
    let result = sqlx::query(
        r#"
        INSERT INTO parliaments (parliament_num, era, timing_start, timing_end)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(parliament_num)
    .bind(era)
    .bind(timing_start)
    .bind(timing_end)
    .execute(pool)
    .await?;

    Ok(Parliament {
        id: result.last_insert_rowid(),
        parliament_num,
        era: era.to_string(),
        timing_start,
        timing_end,
        last_full_update: None,
    })
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "parliaments", id, changes).await
}

/// Stamp the parliament as fully synchronized. Only called after every
/// sub-step of a full update has succeeded.
pub async fn set_last_full_update(
    pool: &SqlitePool,
    id: i64,
    when: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE parliaments SET last_full_update = ? WHERE id = ?")
        .bind(when)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
