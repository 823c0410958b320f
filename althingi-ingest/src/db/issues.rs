//! Issue database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Issue record
///
/// Group "A" issues carry documents; group "B" issues are documentless
/// (general discussions, announcements). The unique key within a parliament
/// is (issue_num, issue_group).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Issue {
    pub id: i64,
    pub parliament_id: i64,
    pub issue_num: i64,
    pub issue_type: String,
    pub issue_group: String,
    pub name: String,
    pub description: String,
    pub time_published: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    pub fate: Option<String>,
    pub document_count: i64,
    pub review_count: i64,
    pub special_inquisitor_id: Option<i64>,
    pub special_inquisitor_description: Option<String>,
    pub special_responder_id: Option<i64>,
    pub special_responder_description: Option<String>,
}

pub async fn find_by_num(
    pool: &SqlitePool,
    parliament_id: i64,
    issue_num: i64,
    issue_group: &str,
) -> Result<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(
        "SELECT * FROM issues WHERE parliament_id = ? AND issue_num = ? AND issue_group = ?",
    )
    .bind(parliament_id)
    .bind(issue_num)
    .bind(issue_group)
    .fetch_optional(pool)
    .await?;

    Ok(issue)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>("SELECT * FROM issues WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(issue)
}

/// All group-A issues of a parliament, for status derivation sweeps.
pub async fn list_group_a(pool: &SqlitePool, parliament_id: i64) -> Result<Vec<Issue>> {
    let issues = sqlx::query_as::<_, Issue>(
        "SELECT * FROM issues WHERE parliament_id = ? AND issue_group = 'A' ORDER BY issue_num",
    )
    .bind(parliament_id)
    .fetch_all(pool)
    .await?;

    Ok(issues)
}

pub async fn insert(pool: &SqlitePool, issue: &Issue) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO issues (
            parliament_id, issue_num, issue_type, issue_group, name, description,
            time_published, special_inquisitor_id, special_inquisitor_description,
            special_responder_id, special_responder_description
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(issue.parliament_id)
    .bind(issue.issue_num)
    .bind(&issue.issue_type)
    .bind(&issue.issue_group)
    .bind(&issue.name)
    .bind(&issue.description)
    .bind(issue.time_published)
    .bind(issue.special_inquisitor_id)
    .bind(&issue.special_inquisitor_description)
    .bind(issue.special_responder_id)
    .bind(&issue.special_responder_description)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "issues", id, changes).await
}

/// Link an issue to an earlier publication of itself.
/// Returns true if the link is new.
pub async fn link_previous(pool: &SqlitePool, issue_id: i64, previous_issue_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO issue_links (issue_id, previous_issue_id) VALUES (?, ?)",
    )
    .bind(issue_id)
    .bind(previous_issue_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Ids of the issues this issue was previously published as.
pub async fn list_previous_ids(pool: &SqlitePool, issue_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT previous_issue_id FROM issue_links WHERE issue_id = ?",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Link an issue to a category. Returns true if the link is new.
pub async fn link_category(pool: &SqlitePool, issue_id: i64, category_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO issue_categories (issue_id, category_id) VALUES (?, ?)",
    )
    .bind(issue_id)
    .bind(category_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Issue summary record (1:1 with issue, present only when the feed
/// advertises summary information)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueSummary {
    pub id: i64,
    pub issue_id: i64,
    pub purpose: String,
    pub change_description: String,
    pub changes_to_law: String,
    pub cost_and_revenue: String,
    pub other_info: String,
    pub review_description: String,
    pub fate: String,
    pub media_coverage: String,
}

pub async fn find_summary(pool: &SqlitePool, issue_id: i64) -> Result<Option<IssueSummary>> {
    let summary =
        sqlx::query_as::<_, IssueSummary>("SELECT * FROM issue_summaries WHERE issue_id = ?")
            .bind(issue_id)
            .fetch_optional(pool)
            .await?;

    Ok(summary)
}

pub async fn insert_summary(pool: &SqlitePool, summary: &IssueSummary) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO issue_summaries (
            issue_id, purpose, change_description, changes_to_law,
            cost_and_revenue, other_info, review_description, fate, media_coverage
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(summary.issue_id)
    .bind(&summary.purpose)
    .bind(&summary.change_description)
    .bind(&summary.changes_to_law)
    .bind(&summary.cost_and_revenue)
    .bind(&summary.other_info)
    .bind(&summary.review_description)
    .bind(&summary.fate)
    .bind(&summary.media_coverage)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_summary(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "issue_summaries", id, changes).await
}
