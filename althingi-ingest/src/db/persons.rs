//! Person database operations

use althingi_common::db::fields::{update_fields, FieldChange};
use althingi_common::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Person record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub birthdate: NaiveDate,
    pub email: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub youtube_url: Option<String>,
    pub blog_url: Option<String>,
    pub website_url: Option<String>,
    pub slug: String,
    pub subslug: Option<String>,
    pub person_xml_id: i64,
}

impl Person {
    /// Derived slug and `f-<birthyear>` disambiguation sub-slug.
    pub fn derive_slugs(name: &str, birthdate: NaiveDate) -> (String, String) {
        use chrono::Datelike;
        (slug::slugify(name), format!("f-{}", birthdate.year()))
    }
}

pub async fn find_by_xml_id(pool: &SqlitePool, person_xml_id: i64) -> Result<Option<Person>> {
    let person = sqlx::query_as::<_, Person>("SELECT * FROM persons WHERE person_xml_id = ?")
        .bind(person_xml_id)
        .fetch_optional(pool)
        .await?;

    Ok(person)
}

pub async fn insert(pool: &SqlitePool, person: &Person) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO persons (
            name, birthdate, email, facebook_url, twitter_url, youtube_url,
            blog_url, website_url, slug, subslug, person_xml_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&person.name)
    .bind(person.birthdate)
    .bind(&person.email)
    .bind(&person.facebook_url)
    .bind(&person.twitter_url)
    .bind(&person.youtube_url)
    .bind(&person.blog_url)
    .bind(&person.website_url)
    .bind(&person.slug)
    .bind(&person.subslug)
    .bind(person.person_xml_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, changes: &[FieldChange]) -> Result<()> {
    update_fields(pool, "persons", id, changes).await
}
