//! Category and category group database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use sqlx::SqlitePool;

/// Category group record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryGroup {
    pub id: i64,
    pub name: String,
    pub category_group_xml_id: i64,
}

/// Category record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub category_group_id: i64,
    pub name: String,
    pub description: String,
    pub category_xml_id: i64,
}

pub async fn find_group_by_xml_id(
    pool: &SqlitePool,
    category_group_xml_id: i64,
) -> Result<Option<CategoryGroup>> {
    let group = sqlx::query_as::<_, CategoryGroup>(
        "SELECT * FROM category_groups WHERE category_group_xml_id = ?",
    )
    .bind(category_group_xml_id)
    .fetch_optional(pool)
    .await?;

    Ok(group)
}

pub async fn insert_group(pool: &SqlitePool, name: &str, category_group_xml_id: i64) -> Result<i64> {
    let result =
        sqlx::query("INSERT INTO category_groups (name, category_group_xml_id) VALUES (?, ?)")
            .bind(name)
            .bind(category_group_xml_id)
            .execute(pool)
            .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_group(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "category_groups", id, changes).await
}

pub async fn find_by_xml_id(pool: &SqlitePool, category_xml_id: i64) -> Result<Option<Category>> {
    let category =
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE category_xml_id = ?")
            .bind(category_xml_id)
            .fetch_optional(pool)
            .await?;

    Ok(category)
}

pub async fn insert(pool: &SqlitePool, category: &Category) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (category_group_id, name, description, category_xml_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(category.category_group_id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.category_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "categories", id, changes).await
}
