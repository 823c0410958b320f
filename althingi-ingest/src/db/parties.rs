//! Party database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// Party name marking the container for members outside any party group.
const SPECIAL_PARTY_NAME: &str = "Utan þingflokka";

/// Party record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Party {
    pub id: i64,
    pub name: String,
    pub abbreviation_short: String,
    pub abbreviation_long: String,
    pub parliament_num_first: i64,
    pub parliament_num_last: Option<i64>,
    pub slug: String,
    pub special: bool,
    pub party_xml_id: i64,
}

impl Party {
    /// Special parties are party-type containers rather than actual parties.
    pub fn is_special(name: &str) -> bool {
        name == SPECIAL_PARTY_NAME
    }
}

pub async fn find_by_xml_id(pool: &SqlitePool, party_xml_id: i64) -> Result<Option<Party>> {
    let party = sqlx::query_as::<_, Party>("SELECT * FROM parties WHERE party_xml_id = ?")
        .bind(party_xml_id)
        .fetch_optional(pool)
        .await?;

    Ok(party)
}

pub async fn insert(pool: &SqlitePool, party: &Party) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO parties (
            name, abbreviation_short, abbreviation_long, parliament_num_first,
            parliament_num_last, slug, special, party_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&party.name)
    .bind(&party.abbreviation_short)
    .bind(&party.abbreviation_long)
    .bind(party.parliament_num_first)
    .bind(party.parliament_num_last)
    .bind(&party.slug)
    .bind(party.special)
    .bind(party.party_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "parties", id, changes).await
}

/// Attach the party to a parliament. Returns true if the link is new.
pub async fn link_parliament(pool: &SqlitePool, party_id: i64, parliament_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO party_parliaments (party_id, parliament_id) VALUES (?, ?)",
    )
    .bind(party_id)
    .bind(parliament_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
