//! Constituency database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// Constituency record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Constituency {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub abbreviation_short: String,
    pub abbreviation_long: Option<String>,
    pub parliament_num_first: i64,
    pub parliament_num_last: Option<i64>,
    pub constituency_xml_id: i64,
}

pub async fn find_by_xml_id(
    pool: &SqlitePool,
    constituency_xml_id: i64,
) -> Result<Option<Constituency>> {
    let constituency = sqlx::query_as::<_, Constituency>(
        "SELECT * FROM constituencies WHERE constituency_xml_id = ?",
    )
    .bind(constituency_xml_id)
    .fetch_optional(pool)
    .await?;

    Ok(constituency)
}

pub async fn insert(pool: &SqlitePool, constituency: &Constituency) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO constituencies (
            name, description, abbreviation_short, abbreviation_long,
            parliament_num_first, parliament_num_last, constituency_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&constituency.name)
    .bind(&constituency.description)
    .bind(&constituency.abbreviation_short)
    .bind(&constituency.abbreviation_long)
    .bind(constituency.parliament_num_first)
    .bind(constituency.parliament_num_last)
    .bind(constituency.constituency_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "constituencies", id, changes).await
}

/// Attach the constituency to a parliament. Returns true if the link is new.
pub async fn link_parliament(
    pool: &SqlitePool,
    constituency_id: i64,
    parliament_id: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO constituency_parliaments (constituency_id, parliament_id) VALUES (?, ?)",
    )
    .bind(constituency_id)
    .bind(parliament_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
