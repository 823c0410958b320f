//! Vote casting and vote database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Vote casting record: one roll-call or procedural vote event
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteCasting {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub document_id: Option<i64>,
    pub session_id: Option<i64>,
    pub timing: DateTime<Utc>,
    pub vote_casting_type: String,
    pub vote_casting_type_text: String,
    pub specifics: String,
    pub method: Option<String>,
    pub count_yes: Option<i64>,
    pub count_no: Option<i64>,
    pub count_abstain: Option<i64>,
    pub conclusion: Option<String>,
    pub to_committee_id: Option<i64>,
    pub to_minister_id: Option<i64>,
    pub vote_casting_xml_id: i64,
}

/// Per-person vote record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub vote_casting_id: i64,
    pub person_id: i64,
    pub vote_response: String,
}

pub async fn find_by_xml_id(
    pool: &SqlitePool,
    vote_casting_xml_id: i64,
) -> Result<Option<VoteCasting>> {
    let casting = sqlx::query_as::<_, VoteCasting>(
        "SELECT * FROM vote_castings WHERE vote_casting_xml_id = ?",
    )
    .bind(vote_casting_xml_id)
    .fetch_optional(pool)
    .await?;

    Ok(casting)
}

/// Vote castings of an issue whose type is in the given set, in time order.
/// Evidence query for the status machine and fate derivation.
pub async fn list_for_issue_with_types(
    pool: &SqlitePool,
    issue_id: i64,
    types: &[&str],
) -> Result<Vec<VoteCasting>> {
    let placeholders = vec!["?"; types.len()].join(", ");
    let sql = format!(
        "SELECT * FROM vote_castings WHERE issue_id = ? AND vote_casting_type IN ({}) ORDER BY timing",
        placeholders
    );

    let mut query = sqlx::query_as::<_, VoteCasting>(&sql).bind(issue_id);
    for vote_casting_type in types {
        query = query.bind(*vote_casting_type);
    }
    let castings = query.fetch_all(pool).await?;

    Ok(castings)
}

/// Committee-referral vote castings of an issue, in time order.
pub async fn list_committee_referrals(
    pool: &SqlitePool,
    issue_id: i64,
) -> Result<Vec<VoteCasting>> {
    let castings = sqlx::query_as::<_, VoteCasting>(
        r#"
        SELECT * FROM vote_castings
        WHERE issue_id = ? AND to_committee_id IS NOT NULL
        ORDER BY timing
        "#,
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    Ok(castings)
}

/// Whether the issue has any vote casting with a recorded conclusion.
pub async fn issue_has_concluded_casting(pool: &SqlitePool, issue_id: i64) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM vote_castings WHERE issue_id = ? AND conclusion IS NOT NULL",
    )
    .bind(issue_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn insert(pool: &SqlitePool, casting: &VoteCasting) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO vote_castings (
            issue_id, document_id, session_id, timing, vote_casting_type,
            vote_casting_type_text, specifics, method, count_yes, count_no,
            count_abstain, conclusion, to_committee_id, to_minister_id,
            vote_casting_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(casting.issue_id)
    .bind(casting.document_id)
    .bind(casting.session_id)
    .bind(casting.timing)
    .bind(&casting.vote_casting_type)
    .bind(&casting.vote_casting_type_text)
    .bind(&casting.specifics)
    .bind(&casting.method)
    .bind(casting.count_yes)
    .bind(casting.count_no)
    .bind(casting.count_abstain)
    .bind(&casting.conclusion)
    .bind(casting.to_committee_id)
    .bind(casting.to_minister_id)
    .bind(casting.vote_casting_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "vote_castings", id, changes).await
}

pub async fn find_vote(
    pool: &SqlitePool,
    vote_casting_id: i64,
    person_id: i64,
) -> Result<Option<Vote>> {
    let vote = sqlx::query_as::<_, Vote>(
        "SELECT * FROM votes WHERE vote_casting_id = ? AND person_id = ?",
    )
    .bind(vote_casting_id)
    .bind(person_id)
    .fetch_optional(pool)
    .await?;

    Ok(vote)
}

pub async fn insert_vote(
    pool: &SqlitePool,
    vote_casting_id: i64,
    person_id: i64,
    vote_response: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO votes (vote_casting_id, person_id, vote_response) VALUES (?, ?, ?)",
    )
    .bind(vote_casting_id)
    .bind(person_id)
    .bind(vote_response)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_vote_response(
    pool: &SqlitePool,
    id: i64,
    vote_response: &str,
) -> Result<()> {
    sqlx::query("UPDATE votes SET vote_response = ? WHERE id = ?")
        .bind(vote_response)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
