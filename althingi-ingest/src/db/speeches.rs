//! Speech database operations
//!
//! Older terms lack stable speech identifiers upstream, so speech identity
//! is the (parliament, start-timestamp) pair.

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Speech record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Speech {
    pub id: i64,
    pub parliament_id: i64,
    pub person_id: i64,
    pub session_id: Option<i64>,
    pub issue_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub timing_start: DateTime<Utc>,
    pub timing_end: DateTime<Utc>,
    pub seconds: i64,
    pub speech_type: String,
    pub iteration: Option<String>,
    pub order_in_issue: Option<i64>,
    pub html_remote_path: Option<String>,
    pub sgml_remote_path: Option<String>,
    pub xml_remote_path: Option<String>,
    pub text_remote_path: Option<String>,
    pub sound_remote_path: Option<String>,
}

pub async fn find_by_timing(
    pool: &SqlitePool,
    parliament_id: i64,
    timing_start: DateTime<Utc>,
) -> Result<Option<Speech>> {
    let speech = sqlx::query_as::<_, Speech>(
        "SELECT * FROM speeches WHERE parliament_id = ? AND timing_start = ?",
    )
    .bind(parliament_id)
    .bind(timing_start)
    .fetch_optional(pool)
    .await?;

    Ok(speech)
}

/// Whether the issue has any speech with the given iteration marker.
/// Evidence query for the status machine.
pub async fn issue_has_iteration(
    pool: &SqlitePool,
    issue_id: i64,
    iteration: &str,
) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM speeches WHERE issue_id = ? AND iteration = ?",
    )
    .bind(issue_id)
    .bind(iteration)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Whether the issue has any speech at all.
pub async fn issue_has_any(pool: &SqlitePool, issue_id: i64) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM speeches WHERE issue_id = ?")
        .bind(issue_id)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Highest order_in_issue currently assigned for the issue, or 0.
/// Seeds the per-run counter on partial (days-limited) reconciliations.
pub async fn max_order_in_issue(pool: &SqlitePool, issue_id: i64) -> Result<i64> {
    let max = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT MAX(order_in_issue) FROM speeches WHERE issue_id = ?",
    )
    .bind(issue_id)
    .fetch_one(pool)
    .await?;

    Ok(max.unwrap_or(0))
}

pub async fn insert(pool: &SqlitePool, speech: &Speech) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO speeches (
            parliament_id, person_id, session_id, issue_id, date, timing_start,
            timing_end, seconds, speech_type, iteration, order_in_issue,
            html_remote_path, sgml_remote_path, xml_remote_path,
            text_remote_path, sound_remote_path
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(speech.parliament_id)
    .bind(speech.person_id)
    .bind(speech.session_id)
    .bind(speech.issue_id)
    .bind(speech.date)
    .bind(speech.timing_start)
    .bind(speech.timing_end)
    .bind(speech.seconds)
    .bind(&speech.speech_type)
    .bind(&speech.iteration)
    .bind(speech.order_in_issue)
    .bind(&speech.html_remote_path)
    .bind(&speech.sgml_remote_path)
    .bind(&speech.xml_remote_path)
    .bind(&speech.text_remote_path)
    .bind(&speech.sound_remote_path)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "speeches", id, changes).await
}
