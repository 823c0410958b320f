//! Session and session agenda item database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Parliamentary session record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub parliament_id: i64,
    pub session_num: i64,
    pub name: String,
    pub timing_start_planned: Option<DateTime<Utc>>,
    pub timing_start: Option<DateTime<Utc>>,
    pub timing_end: Option<DateTime<Utc>>,
    pub timing_text: Option<String>,
}

/// Ordered session agenda item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionAgendaItem {
    pub id: i64,
    pub session_id: i64,
    pub order_num: i64,
    pub discussion_type: String,
    pub discussion_continued: bool,
    pub comment_type: Option<String>,
    pub comment_text: Option<String>,
    pub comment_description: Option<String>,
    pub issue_id: Option<i64>,
}

pub async fn find_by_num(
    pool: &SqlitePool,
    parliament_id: i64,
    session_num: i64,
) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE parliament_id = ? AND session_num = ?",
    )
    .bind(parliament_id)
    .bind(session_num)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

pub async fn insert(pool: &SqlitePool, session: &Session) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO sessions (
            parliament_id, session_num, name, timing_start_planned,
            timing_start, timing_end, timing_text
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.parliament_id)
    .bind(session.session_num)
    .bind(&session.name)
    .bind(session.timing_start_planned)
    .bind(session.timing_start)
    .bind(session.timing_end)
    .bind(&session.timing_text)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "sessions", id, changes).await
}

/// Delete a session that the feed no longer knows (cascades to its agenda).
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn find_agenda_item(
    pool: &SqlitePool,
    session_id: i64,
    order_num: i64,
) -> Result<Option<SessionAgendaItem>> {
    let item = sqlx::query_as::<_, SessionAgendaItem>(
        "SELECT * FROM session_agenda_items WHERE session_id = ? AND order_num = ?",
    )
    .bind(session_id)
    .bind(order_num)
    .fetch_optional(pool)
    .await?;

    Ok(item)
}

/// Whether the issue appears on any session agenda with the given
/// discussion type. Evidence query for the status machine.
pub async fn issue_on_agenda_with_type(
    pool: &SqlitePool,
    issue_id: i64,
    discussion_type: &str,
) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM session_agenda_items WHERE issue_id = ? AND discussion_type = ?",
    )
    .bind(issue_id)
    .bind(discussion_type)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn insert_agenda_item(pool: &SqlitePool, item: &SessionAgendaItem) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO session_agenda_items (
            session_id, order_num, discussion_type, discussion_continued,
            comment_type, comment_text, comment_description, issue_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.session_id)
    .bind(item.order_num)
    .bind(&item.discussion_type)
    .bind(item.discussion_continued)
    .bind(&item.comment_type)
    .bind(&item.comment_text)
    .bind(&item.comment_description)
    .bind(item.issue_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_agenda_item(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "session_agenda_items", id, changes).await
}

/// Delete agenda items beyond the highest order the feed reported.
/// Returns the number of rows deleted.
pub async fn delete_agenda_items_above(
    pool: &SqlitePool,
    session_id: i64,
    max_order: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM session_agenda_items WHERE session_id = ? AND order_num > ?",
    )
    .bind(session_id)
    .bind(max_order)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
