//! Committee agenda and agenda item database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Committee meeting agenda record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitteeAgenda {
    pub id: i64,
    pub parliament_id: i64,
    pub committee_id: i64,
    pub timing_start_planned: Option<DateTime<Utc>>,
    pub timing_start: Option<DateTime<Utc>>,
    pub timing_end: Option<DateTime<Utc>>,
    pub timing_text: Option<String>,
    pub committee_agenda_xml_id: i64,
}

/// Ordered committee agenda item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitteeAgendaItem {
    pub id: i64,
    pub committee_agenda_id: i64,
    pub order_num: i64,
    pub name: String,
    pub issue_id: Option<i64>,
}

pub async fn find_by_xml_id(
    pool: &SqlitePool,
    committee_agenda_xml_id: i64,
) -> Result<Option<CommitteeAgenda>> {
    let agenda = sqlx::query_as::<_, CommitteeAgenda>(
        "SELECT * FROM committee_agendas WHERE committee_agenda_xml_id = ?",
    )
    .bind(committee_agenda_xml_id)
    .fetch_optional(pool)
    .await?;

    Ok(agenda)
}

pub async fn insert(pool: &SqlitePool, agenda: &CommitteeAgenda) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committee_agendas (
            parliament_id, committee_id, timing_start_planned, timing_start,
            timing_end, timing_text, committee_agenda_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(agenda.parliament_id)
    .bind(agenda.committee_id)
    .bind(agenda.timing_start_planned)
    .bind(agenda.timing_start)
    .bind(agenda.timing_end)
    .bind(&agenda.timing_text)
    .bind(agenda.committee_agenda_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "committee_agendas", id, changes).await
}

pub async fn find_item(
    pool: &SqlitePool,
    committee_agenda_id: i64,
    order_num: i64,
) -> Result<Option<CommitteeAgendaItem>> {
    let item = sqlx::query_as::<_, CommitteeAgendaItem>(
        "SELECT * FROM committee_agenda_items WHERE committee_agenda_id = ? AND order_num = ?",
    )
    .bind(committee_agenda_id)
    .bind(order_num)
    .fetch_optional(pool)
    .await?;

    Ok(item)
}

/// Whether the issue appears on any committee meeting agenda.
/// Evidence query for the status machine.
pub async fn issue_on_any_agenda(pool: &SqlitePool, issue_id: i64) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM committee_agenda_items WHERE issue_id = ?",
    )
    .bind(issue_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn insert_item(pool: &SqlitePool, item: &CommitteeAgendaItem) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committee_agenda_items (committee_agenda_id, order_num, name, issue_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(item.committee_agenda_id)
    .bind(item.order_num)
    .bind(&item.name)
    .bind(item.issue_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_item(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "committee_agenda_items", id, changes).await
}

/// Delete agenda items beyond the highest order the feed reported.
/// Returns the number of rows deleted.
pub async fn delete_items_above(
    pool: &SqlitePool,
    committee_agenda_id: i64,
    max_order: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM committee_agenda_items WHERE committee_agenda_id = ? AND order_num > ?",
    )
    .bind(committee_agenda_id)
    .bind(max_order)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
