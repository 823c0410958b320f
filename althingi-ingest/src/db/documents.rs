//! Document database operations
//!
//! The write path maintains the issue's denormalized `document_count` and
//! mirrors the main document's publication time onto the issue, so no
//! entity ever recomputes those lazily.

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Document record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub issue_id: i64,
    pub doc_num: i64,
    pub doc_type: String,
    pub time_published: DateTime<Utc>,
    pub is_main: bool,
    pub html_remote_path: Option<String>,
    pub html_filename: String,
    pub pdf_remote_path: Option<String>,
    pub pdf_filename: String,
}

pub async fn find_by_num(
    pool: &SqlitePool,
    issue_id: i64,
    doc_num: i64,
) -> Result<Option<Document>> {
    let document =
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE issue_id = ? AND doc_num = ?")
            .bind(issue_id)
            .bind(doc_num)
            .fetch_optional(pool)
            .await?;

    Ok(document)
}

pub async fn list_for_issue(pool: &SqlitePool, issue_id: i64) -> Result<Vec<Document>> {
    let documents = sqlx::query_as::<_, Document>(
        "SELECT * FROM documents WHERE issue_id = ? ORDER BY doc_num",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    Ok(documents)
}

/// Whether the issue has any document whose type is in the given set.
/// Evidence query for the status machine.
pub async fn issue_has_doc_type(
    pool: &SqlitePool,
    issue_id: i64,
    doc_types: &[&str],
) -> Result<bool> {
    let placeholders = vec!["?"; doc_types.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM documents WHERE issue_id = ? AND doc_type IN ({})",
        placeholders
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(issue_id);
    for doc_type in doc_types {
        query = query.bind(*doc_type);
    }
    let count = query.fetch_one(pool).await?;

    Ok(count > 0)
}

pub async fn insert(pool: &SqlitePool, document: &Document) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO documents (
            issue_id, doc_num, doc_type, time_published, is_main,
            html_remote_path, html_filename, pdf_remote_path, pdf_filename
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(document.issue_id)
    .bind(document.doc_num)
    .bind(&document.doc_type)
    .bind(document.time_published)
    .bind(document.is_main)
    .bind(&document.html_remote_path)
    .bind(&document.html_filename)
    .bind(&document.pdf_remote_path)
    .bind(&document.pdf_filename)
    .execute(pool)
    .await?;

    recount_documents(pool, document.issue_id).await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "documents", id, changes).await
}

/// Delete documents of the issue whose doc_num is not in the surviving set.
/// Returns the number of rows deleted.
pub async fn delete_except(
    pool: &SqlitePool,
    issue_id: i64,
    surviving_doc_nums: &[i64],
) -> Result<u64> {
    let placeholders = vec!["?"; surviving_doc_nums.len()].join(", ");
    let sql = if surviving_doc_nums.is_empty() {
        "DELETE FROM documents WHERE issue_id = ?".to_string()
    } else {
        format!(
            "DELETE FROM documents WHERE issue_id = ? AND doc_num NOT IN ({})",
            placeholders
        )
    };

    let mut query = sqlx::query(&sql).bind(issue_id);
    for doc_num in surviving_doc_nums {
        query = query.bind(doc_num);
    }
    let result = query.execute(pool).await?;

    if result.rows_affected() > 0 {
        recount_documents(pool, issue_id).await?;
    }

    Ok(result.rows_affected())
}

/// Mark the document with the given doc_num as the issue's main document
/// and mirror its publication time onto the issue. Writes only rows whose
/// state actually differs. Returns true if anything changed.
pub async fn set_main(pool: &SqlitePool, issue_id: i64, doc_num: i64) -> Result<bool> {
    let cleared = sqlx::query(
        "UPDATE documents SET is_main = 0 WHERE issue_id = ? AND doc_num != ? AND is_main = 1",
    )
    .bind(issue_id)
    .bind(doc_num)
    .execute(pool)
    .await?;

    let marked = sqlx::query(
        "UPDATE documents SET is_main = 1 WHERE issue_id = ? AND doc_num = ? AND is_main = 0",
    )
    .bind(issue_id)
    .bind(doc_num)
    .execute(pool)
    .await?;

    let mirrored = sqlx::query(
        r#"
        UPDATE issues SET time_published = (
            SELECT time_published FROM documents WHERE issue_id = ? AND doc_num = ?
        )
        WHERE id = ?
          AND time_published IS NOT (
            SELECT time_published FROM documents WHERE issue_id = ? AND doc_num = ?
          )
        "#,
    )
    .bind(issue_id)
    .bind(doc_num)
    .bind(issue_id)
    .bind(issue_id)
    .bind(doc_num)
    .execute(pool)
    .await?;

    Ok(cleared.rows_affected() + marked.rows_affected() + mirrored.rows_affected() > 0)
}

/// Recompute the issue's document_count projection. Writes only on change.
async fn recount_documents(pool: &SqlitePool, issue_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE issues SET document_count = (
            SELECT COUNT(*) FROM documents WHERE issue_id = ?
        )
        WHERE id = ?
          AND document_count != (SELECT COUNT(*) FROM documents WHERE issue_id = ?)
        "#,
    )
    .bind(issue_id)
    .bind(issue_id)
    .bind(issue_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use althingi_common::db::init_memory_pool;

    async fn fixture_issue(pool: &SqlitePool) -> i64 {
        sqlx::query("INSERT INTO parliaments (parliament_num) VALUES (148)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO issues (parliament_id, issue_num, issue_type, name) VALUES (1, 1, 'l', 'fjárlög')",
        )
        .execute(pool)
        .await
        .unwrap();
        1
    }

    fn doc(issue_id: i64, doc_num: i64) -> Document {
        Document {
            id: 0,
            issue_id,
            doc_num,
            doc_type: "frumvarp".to_string(),
            time_published: "2017-12-14T12:00:00"
                .parse::<chrono::NaiveDateTime>()
                .unwrap()
                .and_utc(),
            is_main: false,
            html_remote_path: None,
            html_filename: String::new(),
            pdf_remote_path: None,
            pdf_filename: String::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_maintains_document_count() {
        let pool = init_memory_pool().await.unwrap();
        let issue_id = fixture_issue(&pool).await;

        insert(&pool, &doc(issue_id, 1)).await.unwrap();
        insert(&pool, &doc(issue_id, 2)).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT document_count FROM issues WHERE id = ?")
                .bind(issue_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_delete_except_converges_child_set() {
        let pool = init_memory_pool().await.unwrap();
        let issue_id = fixture_issue(&pool).await;

        insert(&pool, &doc(issue_id, 1)).await.unwrap();
        insert(&pool, &doc(issue_id, 2)).await.unwrap();
        insert(&pool, &doc(issue_id, 3)).await.unwrap();

        let deleted = delete_except(&pool, issue_id, &[1, 3]).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = list_for_issue(&pool, issue_id).await.unwrap();
        let nums: Vec<i64> = remaining.iter().map(|d| d.doc_num).collect();
        assert_eq!(nums, vec![1, 3]);

        let count: i64 =
            sqlx::query_scalar("SELECT document_count FROM issues WHERE id = ?")
                .bind(issue_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_set_main_mirrors_publish_date_and_is_idempotent() {
        let pool = init_memory_pool().await.unwrap();
        let issue_id = fixture_issue(&pool).await;

        insert(&pool, &doc(issue_id, 1)).await.unwrap();
        insert(&pool, &doc(issue_id, 2)).await.unwrap();

        assert!(set_main(&pool, issue_id, 1).await.unwrap());
        // Second application changes nothing.
        assert!(!set_main(&pool, issue_id, 1).await.unwrap());

        let published: Option<chrono::DateTime<Utc>> =
            sqlx::query_scalar("SELECT time_published FROM issues WHERE id = ?")
                .bind(issue_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(published.is_some());
    }
}
