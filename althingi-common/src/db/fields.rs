//! Partial updates from changed-field lists
//!
//! Reconciliation computes a field-by-field diff against the local row and
//! persists an update only when something differs. The update statement
//! carries exactly the changed columns, so write minimality is observable at
//! the query level.

use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

/// One changed column with its new value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub column: &'static str,
    pub value: FieldValue,
}

/// Typed column value for binding.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(Option<i64>),
    Text(Option<String>),
    Bool(bool),
    DateTime(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
}

impl FieldChange {
    pub fn int(column: &'static str, value: impl Into<Option<i64>>) -> Self {
        Self { column, value: FieldValue::Int(value.into()) }
    }

    pub fn text(column: &'static str, value: impl Into<Option<String>>) -> Self {
        Self { column, value: FieldValue::Text(value.into()) }
    }

    pub fn bool(column: &'static str, value: bool) -> Self {
        Self { column, value: FieldValue::Bool(value) }
    }

    pub fn datetime(column: &'static str, value: impl Into<Option<DateTime<Utc>>>) -> Self {
        Self { column, value: FieldValue::DateTime(value.into()) }
    }

    pub fn date(column: &'static str, value: impl Into<Option<NaiveDate>>) -> Self {
        Self { column, value: FieldValue::Date(value.into()) }
    }
}

/// Push a change for `column` if `local` and `remote` differ, and overwrite
/// `local` with the remote value.
///
/// The closure maps the new value into a [`FieldChange`], so callers read as
/// one line per field.
pub fn diff_field<T, F>(changes: &mut Vec<FieldChange>, local: &mut T, remote: T, make: F)
where
    T: PartialEq + Clone,
    F: FnOnce(T) -> FieldChange,
{
    if *local != remote {
        changes.push(make(remote.clone()));
        *local = remote;
    }
}

/// Apply a changed-field list to one row: `UPDATE <table> SET ... WHERE id = ?`.
///
/// A no-op (and no query) when `changes` is empty.
pub async fn update_fields(
    pool: &SqlitePool,
    table: &str,
    id: i64,
    changes: &[FieldChange],
) -> Result<()> {
    if changes.is_empty() {
        return Ok(());
    }

    let assignments: Vec<String> = changes
        .iter()
        .map(|c| format!("{} = ?", c.column))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?",
        table,
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for change in changes {
        query = match &change.value {
            FieldValue::Int(v) => query.bind(*v),
            FieldValue::Text(v) => query.bind(v.clone()),
            FieldValue::Bool(v) => query.bind(*v),
            FieldValue::DateTime(v) => query.bind(*v),
            FieldValue::Date(v) => query.bind(*v),
        };
    }
    query.bind(id).execute(pool).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;
    use sqlx::Row;

    #[tokio::test]
    async fn test_update_only_listed_columns() {
        let pool = init_memory_pool().await.unwrap();

        sqlx::query("INSERT INTO parliaments (parliament_num, era) VALUES (148, '2017-2018')")
            .execute(&pool)
            .await
            .unwrap();

        update_fields(
            &pool,
            "parliaments",
            1,
            &[FieldChange::text("era", "2017".to_string())],
        )
        .await
        .unwrap();

        let row = sqlx::query("SELECT parliament_num, era FROM parliaments WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        let num: i64 = row.get("parliament_num");
        let era: String = row.get("era");
        assert_eq!(num, 148);
        assert_eq!(era, "2017");
    }

    #[tokio::test]
    async fn test_empty_change_list_is_noop() {
        let pool = init_memory_pool().await.unwrap();
        update_fields(&pool, "parliaments", 1, &[]).await.unwrap();
    }

    #[test]
    fn test_diff_field_records_and_applies() {
        let mut changes = Vec::new();
        let mut local = Some("old".to_string());

        diff_field(&mut changes, &mut local, Some("new".to_string()), |v| {
            FieldChange::text("name", v)
        });
        assert_eq!(local.as_deref(), Some("new"));
        assert_eq!(changes.len(), 1);

        // Equal values record nothing.
        diff_field(&mut changes, &mut local, Some("new".to_string()), |v| {
            FieldChange::text("name", v)
        });
        assert_eq!(changes.len(), 1);
    }
}
