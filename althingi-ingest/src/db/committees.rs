//! Committee database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// Committee record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Committee {
    pub id: i64,
    pub name: String,
    pub abbreviation_short: String,
    pub abbreviation_long: String,
    pub committee_xml_id: i64,
}

pub async fn find_by_xml_id(pool: &SqlitePool, committee_xml_id: i64) -> Result<Option<Committee>> {
    let committee =
        sqlx::query_as::<_, Committee>("SELECT * FROM committees WHERE committee_xml_id = ?")
            .bind(committee_xml_id)
            .fetch_optional(pool)
            .await?;

    Ok(committee)
}

/// Lookup by short abbreviation; used for the special-committee fallback
/// when a document's proposing committee is missing its id in the XML.
pub async fn find_by_abbreviation_short(
    pool: &SqlitePool,
    abbreviation_short: &str,
) -> Result<Option<Committee>> {
    let committee = sqlx::query_as::<_, Committee>(
        "SELECT * FROM committees WHERE abbreviation_short = ?",
    )
    .bind(abbreviation_short)
    .fetch_optional(pool)
    .await?;

    Ok(committee)
}

/// Case-exact name lookup among the committees attached to a parliament.
/// Used to resolve the free-text "sent to" field of vote castings.
pub async fn find_by_name_in_parliament(
    pool: &SqlitePool,
    parliament_id: i64,
    name: &str,
) -> Result<Option<Committee>> {
    let committee = sqlx::query_as::<_, Committee>(
        r#"
        SELECT c.* FROM committees c
        JOIN committee_parliaments cp ON cp.committee_id = c.id
        WHERE cp.parliament_id = ? AND c.name = ?
        "#,
    )
    .bind(parliament_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(committee)
}

pub async fn insert(pool: &SqlitePool, committee: &Committee) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committees (name, abbreviation_short, abbreviation_long, committee_xml_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&committee.name)
    .bind(&committee.abbreviation_short)
    .bind(&committee.abbreviation_long)
    .bind(committee.committee_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "committees", id, changes).await
}

/// Attach the committee to a parliament. Returns true if the link is new.
pub async fn link_parliament(pool: &SqlitePool, committee_id: i64, parliament_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO committee_parliaments (committee_id, parliament_id) VALUES (?, ?)",
    )
    .bind(committee_id)
    .bind(parliament_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
