//! Minister (ministerial office) database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// Minister record: the office, not the office-holder
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Minister {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub minister_xml_id: i64,
}

pub async fn find_by_xml_id(pool: &SqlitePool, minister_xml_id: i64) -> Result<Option<Minister>> {
    let minister =
        sqlx::query_as::<_, Minister>("SELECT * FROM ministers WHERE minister_xml_id = ?")
            .bind(minister_xml_id)
            .fetch_optional(pool)
            .await?;

    Ok(minister)
}

/// Case-exact name lookup among the ministers attached to a parliament.
/// Used to resolve the free-text "sent to" field of vote castings.
pub async fn find_by_name_in_parliament(
    pool: &SqlitePool,
    parliament_id: i64,
    name: &str,
) -> Result<Option<Minister>> {
    let minister = sqlx::query_as::<_, Minister>(
        r#"
        SELECT m.* FROM ministers m
        JOIN minister_parliaments mp ON mp.minister_id = m.id
        WHERE mp.parliament_id = ? AND m.name = ?
        "#,
    )
    .bind(parliament_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(minister)
}

pub async fn insert(pool: &SqlitePool, minister: &Minister) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO ministers (name, abbreviation, minister_xml_id) VALUES (?, ?, ?)",
    )
    .bind(&minister.name)
    .bind(&minister.abbreviation)
    .bind(minister.minister_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "ministers", id, changes).await
}

/// Attach the minister to a parliament. Returns true if the link is new.
pub async fn link_parliament(pool: &SqlitePool, minister_id: i64, parliament_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO minister_parliaments (minister_id, parliament_id) VALUES (?, ?)",
    )
    .bind(minister_id)
    .bind(parliament_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
