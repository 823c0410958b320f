//! Proposer and rapporteur database operations

use althingi_common::Result;
use sqlx::SqlitePool;

/// Proposer record: links a document (or directly an issue) to either a
/// person or a committee. A committee proposer may carry named members as
/// sub-proposers through `parent_id`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Proposer {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub document_id: Option<i64>,
    pub order_num: Option<i64>,
    pub person_id: Option<i64>,
    pub committee_id: Option<i64>,
    pub committee_partname: Option<String>,
    pub parent_id: Option<i64>,
}

pub async fn find_person_proposer(
    pool: &SqlitePool,
    document_id: i64,
    person_id: i64,
) -> Result<Option<Proposer>> {
    let proposer = sqlx::query_as::<_, Proposer>(
        "SELECT * FROM proposers WHERE document_id = ? AND person_id = ? AND parent_id IS NULL",
    )
    .bind(document_id)
    .bind(person_id)
    .fetch_optional(pool)
    .await?;

    Ok(proposer)
}

pub async fn find_committee_proposer(
    pool: &SqlitePool,
    document_id: i64,
    committee_id: i64,
    committee_partname: &str,
) -> Result<Option<Proposer>> {
    let proposer = sqlx::query_as::<_, Proposer>(
        r#"
        SELECT * FROM proposers
        WHERE document_id = ? AND committee_id = ? AND committee_partname = ?
        "#,
    )
    .bind(document_id)
    .bind(committee_id)
    .bind(committee_partname)
    .fetch_optional(pool)
    .await?;

    Ok(proposer)
}

pub async fn find_subproposer(
    pool: &SqlitePool,
    parent_id: i64,
    person_id: i64,
) -> Result<Option<Proposer>> {
    let proposer = sqlx::query_as::<_, Proposer>(
        "SELECT * FROM proposers WHERE parent_id = ? AND person_id = ?",
    )
    .bind(parent_id)
    .bind(person_id)
    .fetch_optional(pool)
    .await?;

    Ok(proposer)
}

pub async fn insert(pool: &SqlitePool, proposer: &Proposer) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO proposers (
            issue_id, document_id, order_num, person_id, committee_id,
            committee_partname, parent_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(proposer.issue_id)
    .bind(proposer.document_id)
    .bind(proposer.order_num)
    .bind(proposer.person_id)
    .bind(proposer.committee_id)
    .bind(&proposer.committee_partname)
    .bind(proposer.parent_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Mirror proposers of the issue's main document onto the issue itself.
/// Writes only rows whose issue_id differs. Returns affected row count.
pub async fn attach_main_document_proposers(pool: &SqlitePool, issue_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE proposers SET issue_id = ?
        WHERE document_id IN (SELECT id FROM documents WHERE issue_id = ? AND is_main = 1)
          AND issue_id IS NOT ?
        "#,
    )
    .bind(issue_id)
    .bind(issue_id)
    .bind(issue_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Rapporteur record: a person designated to report on an issue's progress
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Rapporteur {
    pub id: i64,
    pub issue_id: i64,
    pub person_id: i64,
}

pub async fn find_rapporteur(
    pool: &SqlitePool,
    issue_id: i64,
    person_id: i64,
) -> Result<Option<Rapporteur>> {
    let rapporteur = sqlx::query_as::<_, Rapporteur>(
        "SELECT * FROM rapporteurs WHERE issue_id = ? AND person_id = ?",
    )
    .bind(issue_id)
    .bind(person_id)
    .fetch_optional(pool)
    .await?;

    Ok(rapporteur)
}

pub async fn insert_rapporteur(pool: &SqlitePool, issue_id: i64, person_id: i64) -> Result<i64> {
    let result = sqlx::query("INSERT INTO rapporteurs (issue_id, person_id) VALUES (?, ?)")
        .bind(issue_id)
        .bind(person_id)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Delete rapporteurs of the issue not in the surviving person set.
/// Returns the number of rows deleted.
pub async fn delete_rapporteurs_except(
    pool: &SqlitePool,
    issue_id: i64,
    surviving_person_ids: &[i64],
) -> Result<u64> {
    let placeholders = vec!["?"; surviving_person_ids.len()].join(", ");
    let sql = if surviving_person_ids.is_empty() {
        "DELETE FROM rapporteurs WHERE issue_id = ?".to_string()
    } else {
        format!(
            "DELETE FROM rapporteurs WHERE issue_id = ? AND person_id NOT IN ({})",
            placeholders
        )
    };

    let mut query = sqlx::query(&sql).bind(issue_id);
    for person_id in surviving_person_ids {
        query = query.bind(person_id);
    }
    let result = query.execute(pool).await?;

    Ok(result.rows_affected())
}
