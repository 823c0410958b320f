//! Database access shared by the Althingi crates
//!
//! SQLite via sqlx. The schema is bootstrapped with idempotent
//! `CREATE TABLE IF NOT EXISTS` statements; there is no migration tooling.

pub mod fields;

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool and bootstrap the schema.
///
/// Foreign keys are enabled per connection so the schema's referential
/// actions (cascades, protected deletes) hold on every pool connection.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool with the full schema. Used by tests.
///
/// Capped at one connection: every pool connection to `:memory:` would
/// otherwise get its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables if they don't exist.
///
/// Referential actions mirror the upstream data model: children of an issue
/// cascade with it, reference entities (committees, ministers, parties) are
/// protected from deletion while anything points at them.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    for ddl in TABLE_DDL {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::debug!("Database tables initialized");

    Ok(())
}

const TABLE_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS parliaments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parliament_num INTEGER NOT NULL UNIQUE,
        era TEXT NOT NULL DEFAULT '',
        timing_start TEXT,
        timing_end TEXT,
        last_full_update TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS persons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        birthdate TEXT NOT NULL,
        email TEXT,
        facebook_url TEXT,
        twitter_url TEXT,
        youtube_url TEXT,
        blog_url TEXT,
        website_url TEXT,
        slug TEXT NOT NULL,
        subslug TEXT,
        person_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        abbreviation_short TEXT NOT NULL,
        abbreviation_long TEXT NOT NULL,
        parliament_num_first INTEGER NOT NULL,
        parliament_num_last INTEGER,
        slug TEXT NOT NULL,
        special INTEGER NOT NULL DEFAULT 0,
        party_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS party_parliaments (
        party_id INTEGER NOT NULL REFERENCES parties(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE CASCADE,
        UNIQUE (party_id, parliament_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS constituencies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        abbreviation_short TEXT NOT NULL,
        abbreviation_long TEXT,
        parliament_num_first INTEGER NOT NULL,
        parliament_num_last INTEGER,
        constituency_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS constituency_parliaments (
        constituency_id INTEGER NOT NULL REFERENCES constituencies(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE CASCADE,
        UNIQUE (constituency_id, parliament_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committees (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        abbreviation_short TEXT NOT NULL,
        abbreviation_long TEXT NOT NULL,
        committee_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committee_parliaments (
        committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE CASCADE,
        UNIQUE (committee_id, parliament_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ministers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        abbreviation TEXT NOT NULL DEFAULT '',
        minister_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS minister_parliaments (
        minister_id INTEGER NOT NULL REFERENCES ministers(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE CASCADE,
        UNIQUE (minister_id, parliament_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS presidents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        abbreviation TEXT NOT NULL DEFAULT '',
        president_type TEXT NOT NULL,
        is_main INTEGER NOT NULL DEFAULT 0,
        order_num INTEGER,
        president_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS president_parliaments (
        president_id INTEGER NOT NULL REFERENCES presidents(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE CASCADE,
        UNIQUE (president_id, parliament_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS seats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        seat_type TEXT NOT NULL,
        name_abbreviation TEXT NOT NULL DEFAULT '',
        physical_seat_number INTEGER,
        timing_in TEXT NOT NULL,
        timing_out TEXT,
        constituency_id INTEGER NOT NULL REFERENCES constituencies(id) ON DELETE RESTRICT,
        constituency_mp_num INTEGER NOT NULL,
        party_id INTEGER NOT NULL REFERENCES parties(id) ON DELETE RESTRICT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committee_seats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE RESTRICT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        committee_seat_type TEXT NOT NULL,
        order_num INTEGER NOT NULL DEFAULT 0,
        timing_in TEXT NOT NULL,
        timing_out TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS minister_seats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        minister_id INTEGER NOT NULL REFERENCES ministers(id) ON DELETE RESTRICT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        party_id INTEGER REFERENCES parties(id) ON DELETE RESTRICT,
        timing_in TEXT NOT NULL,
        timing_out TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS president_seats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        president_id INTEGER NOT NULL REFERENCES presidents(id) ON DELETE RESTRICT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        timing_in TEXT NOT NULL,
        timing_out TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        issue_num INTEGER NOT NULL,
        issue_type TEXT NOT NULL DEFAULT '',
        issue_group TEXT NOT NULL DEFAULT 'A',
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        time_published TEXT,
        current_step TEXT,
        fate TEXT,
        document_count INTEGER NOT NULL DEFAULT 0,
        review_count INTEGER NOT NULL DEFAULT 0,
        special_inquisitor_id INTEGER REFERENCES persons(id) ON DELETE SET NULL,
        special_inquisitor_description TEXT,
        special_responder_id INTEGER REFERENCES persons(id) ON DELETE SET NULL,
        special_responder_description TEXT,
        UNIQUE (parliament_id, issue_num, issue_group)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issue_links (
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        previous_issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        UNIQUE (issue_id, previous_issue_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issue_summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL UNIQUE REFERENCES issues(id) ON DELETE CASCADE,
        purpose TEXT NOT NULL DEFAULT '',
        change_description TEXT NOT NULL DEFAULT '',
        changes_to_law TEXT NOT NULL DEFAULT '',
        cost_and_revenue TEXT NOT NULL DEFAULT '',
        other_info TEXT NOT NULL DEFAULT '',
        review_description TEXT NOT NULL DEFAULT '',
        fate TEXT NOT NULL DEFAULT '',
        media_coverage TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS category_groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category_group_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_group_id INTEGER NOT NULL REFERENCES category_groups(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        category_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issue_categories (
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        UNIQUE (issue_id, category_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        doc_num INTEGER NOT NULL,
        doc_type TEXT NOT NULL,
        time_published TEXT NOT NULL,
        is_main INTEGER NOT NULL DEFAULT 0,
        html_remote_path TEXT,
        html_filename TEXT NOT NULL DEFAULT '',
        pdf_remote_path TEXT,
        pdf_filename TEXT NOT NULL DEFAULT '',
        UNIQUE (issue_id, doc_num)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proposers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER REFERENCES issues(id) ON DELETE CASCADE,
        document_id INTEGER REFERENCES documents(id) ON DELETE CASCADE,
        order_num INTEGER,
        person_id INTEGER REFERENCES persons(id) ON DELETE CASCADE,
        committee_id INTEGER REFERENCES committees(id) ON DELETE CASCADE,
        committee_partname TEXT,
        parent_id INTEGER REFERENCES proposers(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rapporteurs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        UNIQUE (issue_id, person_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        log_num INTEGER NOT NULL,
        sender_name TEXT NOT NULL DEFAULT '',
        sender_name_description TEXT NOT NULL DEFAULT '',
        committee_id INTEGER REFERENCES committees(id) ON DELETE SET NULL,
        president_seat_id INTEGER REFERENCES president_seats(id) ON DELETE SET NULL,
        review_type TEXT NOT NULL,
        date_arrived TEXT,
        date_sent TEXT,
        pdf_remote_path TEXT,
        pdf_filename TEXT NOT NULL DEFAULT '',
        UNIQUE (issue_id, log_num)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        session_num INTEGER NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        timing_start_planned TEXT,
        timing_start TEXT,
        timing_end TEXT,
        timing_text TEXT,
        UNIQUE (parliament_id, session_num)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS session_agenda_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        order_num INTEGER NOT NULL,
        discussion_type TEXT NOT NULL DEFAULT '',
        discussion_continued INTEGER NOT NULL DEFAULT 0,
        comment_type TEXT,
        comment_text TEXT,
        comment_description TEXT,
        issue_id INTEGER REFERENCES issues(id) ON DELETE SET NULL,
        UNIQUE (session_id, order_num)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committee_agendas (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        committee_id INTEGER NOT NULL REFERENCES committees(id) ON DELETE RESTRICT,
        timing_start_planned TEXT,
        timing_start TEXT,
        timing_end TEXT,
        timing_text TEXT,
        committee_agenda_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS committee_agenda_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        committee_agenda_id INTEGER NOT NULL REFERENCES committee_agendas(id) ON DELETE CASCADE,
        order_num INTEGER NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        issue_id INTEGER REFERENCES issues(id) ON DELETE SET NULL,
        UNIQUE (committee_agenda_id, order_num)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vote_castings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER REFERENCES issues(id) ON DELETE CASCADE,
        document_id INTEGER REFERENCES documents(id) ON DELETE SET NULL,
        session_id INTEGER REFERENCES sessions(id) ON DELETE SET NULL,
        timing TEXT NOT NULL,
        vote_casting_type TEXT NOT NULL DEFAULT '',
        vote_casting_type_text TEXT NOT NULL DEFAULT '',
        specifics TEXT NOT NULL DEFAULT '',
        method TEXT,
        count_yes INTEGER,
        count_no INTEGER,
        count_abstain INTEGER,
        conclusion TEXT,
        to_committee_id INTEGER REFERENCES committees(id) ON DELETE SET NULL,
        to_minister_id INTEGER REFERENCES ministers(id) ON DELETE SET NULL,
        vote_casting_xml_id INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vote_casting_id INTEGER NOT NULL REFERENCES vote_castings(id) ON DELETE CASCADE,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        vote_response TEXT NOT NULL,
        UNIQUE (vote_casting_id, person_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS speeches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parliament_id INTEGER NOT NULL REFERENCES parliaments(id) ON DELETE RESTRICT,
        person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
        session_id INTEGER REFERENCES sessions(id) ON DELETE SET NULL,
        issue_id INTEGER REFERENCES issues(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        timing_start TEXT NOT NULL,
        timing_end TEXT NOT NULL,
        seconds INTEGER NOT NULL DEFAULT 0,
        speech_type TEXT NOT NULL DEFAULT '',
        iteration TEXT,
        order_in_issue INTEGER,
        html_remote_path TEXT,
        sgml_remote_path TEXT,
        xml_remote_path TEXT,
        text_remote_path TEXT,
        sound_remote_path TEXT,
        UNIQUE (parliament_id, timing_start)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issue_steps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
        step TEXT NOT NULL,
        order_num INTEGER NOT NULL
    )
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let pool = init_memory_pool().await.expect("schema bootstrap failed");
        // Running again must be a no-op, not an error.
        init_tables(&pool).await.expect("second bootstrap failed");
    }

    #[tokio::test]
    async fn test_unique_external_id_enforced() {
        let pool = init_memory_pool().await.unwrap();

        sqlx::query("INSERT INTO parliaments (parliament_num) VALUES (148)")
            .execute(&pool)
            .await
            .unwrap();

        let dup = sqlx::query("INSERT INTO parliaments (parliament_num) VALUES (148)")
            .execute(&pool)
            .await;
        assert!(dup.is_err());
    }
}
