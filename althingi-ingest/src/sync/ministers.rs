//! Minister and minister seat reconciliation

use crate::db::ministers::{self, Minister};
use crate::db::parties;
use crate::db::persons;
use crate::db::seats::{self, MinisterSeat};
use crate::feed::FeedUrl;
use crate::sync::parliaments::sync_parliament;
use crate::sync::parties::sync_parties;
use crate::sync::persons::sync_person;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Reconcile the ministerial offices of a parliament and the seats of
/// everyone who held one.
pub async fn sync_ministers(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::MinisterList, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for node in xml::desc_all(doc.root_element(), "ráðherraembætti") {
        let minister_xml_id = xml::req_attr_int(node, "id")?;
        let name = xml::req_child_text(node, "heiti")?;
        let abbreviation = xml::child_text(node, "skammstöfun").unwrap_or_default();

        match ministers::find_by_xml_id(&ctx.pool, minister_xml_id).await? {
            Some(mut minister) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut minister.name, name, |v| {
                    FieldChange::text("name", v)
                });
                diff_field(&mut changes, &mut minister.abbreviation, abbreviation, |v| {
                    FieldChange::text("abbreviation", v)
                });

                if !changes.is_empty() {
                    ministers::update(&ctx.pool, minister.id, &changes).await?;
                }

                let linked =
                    ministers::link_parliament(&ctx.pool, minister.id, parliament.id).await?;
                if changes.is_empty() && !linked {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have minister: {}", minister.name);
                } else {
                    ctx.stats.updated += 1;
                    tracing::info!("Updated minister: {}", minister.name);
                }
            }
            None => {
                let minister = Minister {
                    id: 0,
                    name,
                    abbreviation,
                    minister_xml_id,
                };
                let minister_id = ministers::insert(&ctx.pool, &minister).await?;
                ministers::link_parliament(&ctx.pool, minister_id, parliament.id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added minister: {}", minister.name);
            }
        }
    }

    // Office-holders are listed separately; each brings their person record
    // and ministerial seats up to date.
    let content = ctx
        .feed
        .fetch_xml(FeedUrl::PersonsMinisters, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let ids: Vec<i64> = xml::desc_all(doc.root_element(), "ráðherra")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "id"))
        .collect();

    for person_xml_id in ids {
        sync_person(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
        sync_minister_seats(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile a person's ministerial seats within one parliament.
pub async fn sync_minister_seats(
    ctx: &mut SyncContext,
    person_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if ctx.minister_seats_done(parliament.parliament_num, person_xml_id) {
        return Ok(());
    }

    sync_parties(ctx, Some(parliament.parliament_num)).await?;

    let person = persons::find_by_xml_id(&ctx.pool, person_xml_id)
        .await?
        .ok_or_else(|| {
            Error::NotFoundUpstream(format!("Person with XML-ID {} not found", person_xml_id))
        })?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::MinisterSeats, &[person_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let local_seats = seats::list_minister_seats(&ctx.pool, person.id, parliament.id).await?;
    let mut surviving_ids = Vec::new();

    for node in xml::desc_all(doc.root_element(), "ráðherraseta") {
        let seat_parliament_num = xml::req_child_int(node, "þing")?;
        if seat_parliament_num != parliament.parliament_num {
            continue;
        }

        let minister_node = xml::req_desc(node, "embætti")?;
        let minister_xml_id = xml::req_attr_int(minister_node, "id")?;
        let minister = ministers::find_by_xml_id(&ctx.pool, minister_xml_id)
            .await?
            .ok_or_else(|| {
                Error::NotFoundUpstream(format!(
                    "Minister with XML-ID {} not found",
                    minister_xml_id
                ))
            })?;

        // Ministers from outside Parliament carry no party.
        let party_id = match xml::desc(node, "þingflokkur").and_then(|n| xml::opt_attr_int(n, "id"))
        {
            Some(party_xml_id) => parties::find_by_xml_id(&ctx.pool, party_xml_id)
                .await?
                .map(|p| p.id),
            None => None,
        };

        let timing_in = xml::req_child_datetime(node, "inn")?;
        let timing_out = xml::opt_child_datetime(node, "út")?;

        let existing = local_seats.iter().find(|s| {
            s.minister_id == minister.id
                && s.timing_in == timing_in
                && (s.timing_out == timing_out || s.timing_out.is_none())
        });

        match existing {
            Some(seat) => {
                surviving_ids.push(seat.id);
                if seat.timing_out != timing_out {
                    seats::set_seat_timing_out(&ctx.pool, "minister_seats", seat.id, timing_out)
                        .await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated minister seat: {} ({})", person.name, minister.name);
                } else {
                    ctx.stats.unchanged += 1;
                    tracing::debug!(
                        "Already have minister seat: {} ({})",
                        person.name,
                        minister.name
                    );
                }
            }
            None => {
                let seat = MinisterSeat {
                    id: 0,
                    person_id: person.id,
                    minister_id: minister.id,
                    parliament_id: parliament.id,
                    party_id,
                    timing_in,
                    timing_out,
                };
                let seat_id = seats::insert_minister_seat(&ctx.pool, &seat).await?;
                surviving_ids.push(seat_id);
                ctx.stats.added += 1;
                tracing::info!("Added minister seat: {} ({})", person.name, minister.name);
            }
        }
    }

    let deleted = seats::delete_seats_except(
        &ctx.pool,
        "minister_seats",
        person.id,
        parliament.id,
        &surviving_ids,
    )
    .await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!(
            "Deleted {} non-existent minister seats of {}",
            deleted,
            person.name
        );
    }

    Ok(())
}
