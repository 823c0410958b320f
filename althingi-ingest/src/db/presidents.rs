//! President (presiding-officer office) database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// President record: the office, not the office-holder
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct President {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub president_type: String,
    pub is_main: bool,
    pub order_num: Option<i64>,
    pub president_xml_id: i64,
}

pub async fn find_by_xml_id(pool: &SqlitePool, president_xml_id: i64) -> Result<Option<President>> {
    let president =
        sqlx::query_as::<_, President>("SELECT * FROM presidents WHERE president_xml_id = ?")
            .bind(president_xml_id)
            .fetch_optional(pool)
            .await?;

    Ok(president)
}

pub async fn insert(pool: &SqlitePool, president: &President) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO presidents (
            name, abbreviation, president_type, is_main, order_num, president_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&president.name)
    .bind(&president.abbreviation)
    .bind(&president.president_type)
    .bind(president.is_main)
    .bind(president.order_num)
    .bind(president.president_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "presidents", id, changes).await
}

/// Attach the president to a parliament. Returns true if the link is new.
pub async fn link_parliament(
    pool: &SqlitePool,
    president_id: i64,
    parliament_id: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO president_parliaments (president_id, parliament_id) VALUES (?, ?)",
    )
    .bind(president_id)
    .bind(parliament_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
