//! Seat database operations: parliamentary, committee, ministerial and
//! presidential seats
//!
//! All four share the same lifecycle: created on first sight, timing_out set
//! when the feed reports an end, and deleted when a fresh reconciliation
//! pass no longer lists them for the person/parliament pair.

use althingi_common::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Parliamentary seat record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Seat {
    pub id: i64,
    pub person_id: i64,
    pub parliament_id: i64,
    pub seat_type: String,
    pub name_abbreviation: String,
    pub physical_seat_number: Option<i64>,
    pub timing_in: DateTime<Utc>,
    pub timing_out: Option<DateTime<Utc>>,
    pub constituency_id: i64,
    pub constituency_mp_num: i64,
    pub party_id: i64,
}

/// Committee seat record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitteeSeat {
    pub id: i64,
    pub person_id: i64,
    pub committee_id: i64,
    pub parliament_id: i64,
    pub committee_seat_type: String,
    pub order_num: i64,
    pub timing_in: DateTime<Utc>,
    pub timing_out: Option<DateTime<Utc>>,
}

/// Minister seat record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MinisterSeat {
    pub id: i64,
    pub person_id: i64,
    pub minister_id: i64,
    pub parliament_id: i64,
    pub party_id: Option<i64>,
    pub timing_in: DateTime<Utc>,
    pub timing_out: Option<DateTime<Utc>>,
}

/// President seat record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PresidentSeat {
    pub id: i64,
    pub person_id: i64,
    pub president_id: i64,
    pub parliament_id: i64,
    pub timing_in: DateTime<Utc>,
    pub timing_out: Option<DateTime<Utc>>,
}

pub async fn list_seats(
    pool: &SqlitePool,
    person_id: i64,
    parliament_id: i64,
) -> Result<Vec<Seat>> {
    let seats = sqlx::query_as::<_, Seat>(
        r#"
        SELECT * FROM seats
        WHERE person_id = ? AND parliament_id = ?
        ORDER BY timing_in
        "#,
    )
    .bind(person_id)
    .bind(parliament_id)
    .fetch_all(pool)
    .await?;

    Ok(seats)
}

pub async fn insert_seat(pool: &SqlitePool, seat: &Seat) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO seats (
            person_id, parliament_id, seat_type, name_abbreviation,
            physical_seat_number, timing_in, timing_out, constituency_id,
            constituency_mp_num, party_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(seat.person_id)
    .bind(seat.parliament_id)
    .bind(&seat.seat_type)
    .bind(&seat.name_abbreviation)
    .bind(seat.physical_seat_number)
    .bind(seat.timing_in)
    .bind(seat.timing_out)
    .bind(seat.constituency_id)
    .bind(seat.constituency_mp_num)
    .bind(seat.party_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn set_seat_timing_out(
    pool: &SqlitePool,
    table: &str,
    id: i64,
    timing_out: Option<DateTime<Utc>>,
) -> Result<()> {
    let sql = format!("UPDATE {} SET timing_out = ? WHERE id = ?", table);
    sqlx::query(&sql)
        .bind(timing_out)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete seats for a person/parliament pair that are not in the surviving
/// set. Returns the number of rows deleted.
pub async fn delete_seats_except(
    pool: &SqlitePool,
    table: &str,
    person_id: i64,
    parliament_id: i64,
    surviving_ids: &[i64],
) -> Result<u64> {
    let placeholders = vec!["?"; surviving_ids.len()].join(", ");
    let sql = if surviving_ids.is_empty() {
        format!(
            "DELETE FROM {} WHERE person_id = ? AND parliament_id = ?",
            table
        )
    } else {
        format!(
            "DELETE FROM {} WHERE person_id = ? AND parliament_id = ? AND id NOT IN ({})",
            table, placeholders
        )
    };

    let mut query = sqlx::query(&sql).bind(person_id).bind(parliament_id);
    for id in surviving_ids {
        query = query.bind(id);
    }
    let result = query.execute(pool).await?;

    Ok(result.rows_affected())
}

pub async fn list_committee_seats(
    pool: &SqlitePool,
    person_id: i64,
    parliament_id: i64,
) -> Result<Vec<CommitteeSeat>> {
    let seats = sqlx::query_as::<_, CommitteeSeat>(
        r#"
        SELECT * FROM committee_seats
        WHERE person_id = ? AND parliament_id = ?
        ORDER BY timing_in
        "#,
    )
    .bind(person_id)
    .bind(parliament_id)
    .fetch_all(pool)
    .await?;

    Ok(seats)
}

pub async fn insert_committee_seat(pool: &SqlitePool, seat: &CommitteeSeat) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO committee_seats (
            person_id, committee_id, parliament_id, committee_seat_type,
            order_num, timing_in, timing_out
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(seat.person_id)
    .bind(seat.committee_id)
    .bind(seat.parliament_id)
    .bind(&seat.committee_seat_type)
    .bind(seat.order_num)
    .bind(seat.timing_in)
    .bind(seat.timing_out)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_minister_seats(
    pool: &SqlitePool,
    person_id: i64,
    parliament_id: i64,
) -> Result<Vec<MinisterSeat>> {
    let seats = sqlx::query_as::<_, MinisterSeat>(
        r#"
        SELECT * FROM minister_seats
        WHERE person_id = ? AND parliament_id = ?
        ORDER BY timing_in
        "#,
    )
    .bind(person_id)
    .bind(parliament_id)
    .fetch_all(pool)
    .await?;

    Ok(seats)
}

pub async fn insert_minister_seat(pool: &SqlitePool, seat: &MinisterSeat) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO minister_seats (
            person_id, minister_id, parliament_id, party_id, timing_in, timing_out
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(seat.person_id)
    .bind(seat.minister_id)
    .bind(seat.parliament_id)
    .bind(seat.party_id)
    .bind(seat.timing_in)
    .bind(seat.timing_out)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_president_seats(
    pool: &SqlitePool,
    person_id: i64,
    parliament_id: i64,
) -> Result<Vec<PresidentSeat>> {
    let seats = sqlx::query_as::<_, PresidentSeat>(
        r#"
        SELECT * FROM president_seats
        WHERE person_id = ? AND parliament_id = ?
        ORDER BY timing_in
        "#,
    )
    .bind(person_id)
    .bind(parliament_id)
    .fetch_all(pool)
    .await?;

    Ok(seats)
}

/// Latest president seat of the parliament's main president. Used when a
/// review records administrative receipt by the presiding officer.
pub async fn find_main_president_seat(
    pool: &SqlitePool,
    parliament_id: i64,
) -> Result<Option<PresidentSeat>> {
    let seat = sqlx::query_as::<_, PresidentSeat>(
        r#"
        SELECT ps.* FROM president_seats ps
        JOIN presidents p ON p.id = ps.president_id
        WHERE ps.parliament_id = ? AND p.is_main = 1
        ORDER BY ps.timing_in DESC
        LIMIT 1
        "#,
    )
    .bind(parliament_id)
    .fetch_optional(pool)
    .await?;

    Ok(seat)
}

pub async fn insert_president_seat(pool: &SqlitePool, seat: &PresidentSeat) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO president_seats (
            person_id, president_id, parliament_id, timing_in, timing_out
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(seat.person_id)
    .bind(seat.president_id)
    .bind(seat.parliament_id)
    .bind(seat.timing_in)
    .bind(seat.timing_out)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
