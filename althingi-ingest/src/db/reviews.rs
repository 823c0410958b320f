//! Review database operations
//!
//! The write path maintains the issue's denormalized `review_count`.

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Review record: a third-party submission responding to a committee's
/// request regarding an issue
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub issue_id: i64,
    pub log_num: i64,
    pub sender_name: String,
    pub sender_name_description: String,
    pub committee_id: Option<i64>,
    pub president_seat_id: Option<i64>,
    pub review_type: String,
    pub date_arrived: Option<NaiveDate>,
    pub date_sent: Option<NaiveDate>,
    pub pdf_remote_path: Option<String>,
    pub pdf_filename: String,
}

pub async fn find_by_log_num(
    pool: &SqlitePool,
    issue_id: i64,
    log_num: i64,
) -> Result<Option<Review>> {
    let review =
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE issue_id = ? AND log_num = ?")
            .bind(issue_id)
            .bind(log_num)
            .fetch_optional(pool)
            .await?;

    Ok(review)
}

pub async fn list_for_issue(pool: &SqlitePool, issue_id: i64) -> Result<Vec<Review>> {
    let reviews =
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE issue_id = ? ORDER BY log_num")
            .bind(issue_id)
            .fetch_all(pool)
            .await?;

    Ok(reviews)
}

pub async fn insert(pool: &SqlitePool, review: &Review) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reviews (
            issue_id, log_num, sender_name, sender_name_description, committee_id,
            president_seat_id, review_type, date_arrived, date_sent,
            pdf_remote_path, pdf_filename
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(review.issue_id)
    .bind(review.log_num)
    .bind(&review.sender_name)
    .bind(&review.sender_name_description)
    .bind(review.committee_id)
    .bind(review.president_seat_id)
    .bind(&review.review_type)
    .bind(review.date_arrived)
    .bind(review.date_sent)
    .bind(&review.pdf_remote_path)
    .bind(&review.pdf_filename)
    .execute(pool)
    .await?;

    recount_reviews(pool, review.issue_id).await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "reviews", id, changes).await
}

/// Delete reviews of the issue whose log_num is not in the surviving set.
/// Returns the number of rows deleted.
pub async fn delete_except(
    pool: &SqlitePool,
    issue_id: i64,
    surviving_log_nums: &[i64],
) -> Result<u64> {
    let placeholders = vec!["?"; surviving_log_nums.len()].join(", ");
    let sql = if surviving_log_nums.is_empty() {
        "DELETE FROM reviews WHERE issue_id = ?".to_string()
    } else {
        format!(
            "DELETE FROM reviews WHERE issue_id = ? AND log_num NOT IN ({})",
            placeholders
        )
    };

    let mut query = sqlx::query(&sql).bind(issue_id);
    for log_num in surviving_log_nums {
        query = query.bind(log_num);
    }
    let result = query.execute(pool).await?;

    if result.rows_affected() > 0 {
        recount_reviews(pool, issue_id).await?;
    }

    Ok(result.rows_affected())
}

/// Recompute the issue's review_count projection. Writes only on change.
async fn recount_reviews(pool: &SqlitePool, issue_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE issues SET review_count = (
            SELECT COUNT(*) FROM reviews WHERE issue_id = ?
        )
        WHERE id = ?
          AND review_count != (SELECT COUNT(*) FROM reviews WHERE issue_id = ?)
        "#,
    )
    .bind(issue_id)
    .bind(issue_id)
    .bind(issue_id)
    .execute(pool)
    .await?;

    Ok(())
}
