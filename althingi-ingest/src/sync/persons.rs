//! Person and seat reconciliation

use crate::db::persons::{self, Person};
use crate::db::seats::{self, CommitteeSeat, Seat};
use crate::feed::FeedUrl;
use crate::sync::committees::sync_committee;
use crate::sync::constituencies::sync_constituencies;
use crate::sync::parliaments::sync_parliament;
use crate::sync::parties::sync_parties;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::time::sensible_date;
use althingi_common::{Error, Result};

/// Reconcile every MP listed for a parliament.
pub async fn sync_persons(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::PersonsMps, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let ids: Vec<i64> = xml::desc_all(doc.root_element(), "þingmaður")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "id"))
        .collect();

    for person_xml_id in ids {
        sync_person(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile one person by feed id, then their seats within the parliament.
pub async fn sync_person(
    ctx: &mut SyncContext,
    person_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<Person> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if let Some(person) = ctx.cached_person(person_xml_id) {
        let person = person.clone();
        // Seats may still be pending if the person was first reached
        // through a path that skips them (roll calls, proposers).
        sync_seats(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
        sync_committee_seats(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
        return Ok(person);
    }

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Person, &[person_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;
    let root = doc.root_element();

    let node = xml::desc(root, "þingmaður").ok_or_else(|| {
        Error::NotFoundUpstream(format!("Person with XML-ID {} not found", person_xml_id))
    })?;

    let name = xml::req_child_text(node, "nafn")?;
    let birthdate = sensible_date(&xml::req_child_text(node, "fæðingardagur")?)?;

    // The email address arrives split into account and domain tags.
    let email = xml::desc(node, "netfang").and_then(|email_node| {
        let account = xml::child_text(email_node, "nafn")?;
        let domain = xml::child_text(email_node, "lén")?;
        Some(format!("{}@{}", account, domain))
    });

    let facebook_url = xml::child_text(node, "facebook");
    let twitter_url = xml::child_text(node, "twitter");
    let youtube_url = xml::child_text(node, "youtube");
    let blog_url = xml::child_text(node, "blogg");
    let website_url = xml::child_text(node, "vefur");

    let (slug, subslug) = Person::derive_slugs(&name, birthdate);

    let person = match persons::find_by_xml_id(&ctx.pool, person_xml_id).await? {
        Some(mut person) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut person.name, name, |v| {
                FieldChange::text("name", v)
            });
            diff_field(&mut changes, &mut person.birthdate, birthdate, |v| {
                FieldChange::date("birthdate", v)
            });
            diff_field(&mut changes, &mut person.email, email, |v| {
                FieldChange::text("email", v)
            });
            diff_field(&mut changes, &mut person.facebook_url, facebook_url, |v| {
                FieldChange::text("facebook_url", v)
            });
            diff_field(&mut changes, &mut person.twitter_url, twitter_url, |v| {
                FieldChange::text("twitter_url", v)
            });
            diff_field(&mut changes, &mut person.youtube_url, youtube_url, |v| {
                FieldChange::text("youtube_url", v)
            });
            diff_field(&mut changes, &mut person.blog_url, blog_url, |v| {
                FieldChange::text("blog_url", v)
            });
            diff_field(&mut changes, &mut person.website_url, website_url, |v| {
                FieldChange::text("website_url", v)
            });
            diff_field(&mut changes, &mut person.slug, slug, |v| {
                FieldChange::text("slug", v)
            });
            diff_field(&mut changes, &mut person.subslug, Some(subslug), |v| {
                FieldChange::text("subslug", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have person: {}", person.name);
            } else {
                persons::update(&ctx.pool, person.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated person: {}", person.name);
            }
            person
        }
        None => {
            let mut person = Person {
                id: 0,
                name,
                birthdate,
                email,
                facebook_url,
                twitter_url,
                youtube_url,
                blog_url,
                website_url,
                slug,
                subslug: Some(subslug),
                person_xml_id,
            };
            person.id = persons::insert(&ctx.pool, &person).await?;
            ctx.stats.added += 1;
            tracing::info!("Added person: {}", person.name);
            person
        }
    };

    ctx.cache_person(person.clone());

    sync_seats(ctx, person_xml_id, Some(parliament.parliament_num)).await?;
    sync_committee_seats(ctx, person_xml_id, Some(parliament.parliament_num)).await?;

    Ok(person)
}

/// Reconcile a person's parliamentary seats within one parliament.
///
/// The remote listing is authoritative: seats absent from it are deleted.
pub async fn sync_seats(
    ctx: &mut SyncContext,
    person_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if ctx.seats_done(parliament.parliament_num, person_xml_id) {
        return Ok(());
    }

    sync_constituencies(ctx, Some(parliament.parliament_num)).await?;
    sync_parties(ctx, Some(parliament.parliament_num)).await?;

    let person = persons::find_by_xml_id(&ctx.pool, person_xml_id)
        .await?
        .ok_or_else(|| {
            Error::NotFoundUpstream(format!("Person with XML-ID {} not found", person_xml_id))
        })?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Seats, &[person_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let local_seats = seats::list_seats(&ctx.pool, person.id, parliament.id).await?;
    let mut surviving_ids = Vec::new();

    for node in xml::desc_all(doc.root_element(), "þingseta") {
        let seat_parliament_num = xml::req_child_int(node, "þing")?;
        if seat_parliament_num != parliament.parliament_num {
            continue;
        }

        let seat_type = xml::req_child_text(node, "tegund")?;
        let name_abbreviation = xml::child_text(node, "skammstöfun").unwrap_or_default();
        let physical_seat_number = xml::opt_child_int(node, "þingsalssæti");
        let timing_in = xml::req_child_datetime(node, "inn")?;
        let timing_out = xml::opt_child_datetime(node, "út")?;

        let constituency_node = xml::req_desc(node, "kjördæmi")?;
        let constituency_xml_id = xml::req_attr_int(constituency_node, "id")?;
        let constituency_mp_num = xml::req_child_int(node, "kjördæmanúmer")?;

        let party_node = xml::req_desc(node, "þingflokkur")?;
        let party_xml_id = xml::req_attr_int(party_node, "id")?;

        let constituency = crate::db::constituencies::find_by_xml_id(&ctx.pool, constituency_xml_id)
            .await?
            .ok_or_else(|| {
                Error::NotFoundUpstream(format!(
                    "Constituency with XML-ID {} not found",
                    constituency_xml_id
                ))
            })?;
        let party = crate::db::parties::find_by_xml_id(&ctx.pool, party_xml_id)
            .await?
            .ok_or_else(|| {
                Error::NotFoundUpstream(format!("Party with XML-ID {} not found", party_xml_id))
            })?;

        // A seat matches on its start; an open-ended local row absorbs a
        // newly reported end.
        let existing = local_seats.iter().find(|s| {
            s.timing_in == timing_in && (s.timing_out == timing_out || s.timing_out.is_none())
        });

        match existing {
            Some(seat) => {
                surviving_ids.push(seat.id);
                if seat.timing_out != timing_out {
                    seats::set_seat_timing_out(&ctx.pool, "seats", seat.id, timing_out).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated seat: {} ({})", person.name, seat_type);
                } else {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have seat: {} ({})", person.name, seat_type);
                }
            }
            None => {
                let seat = Seat {
                    id: 0,
                    person_id: person.id,
                    parliament_id: parliament.id,
                    seat_type: seat_type.clone(),
                    name_abbreviation,
                    physical_seat_number,
                    timing_in,
                    timing_out,
                    constituency_id: constituency.id,
                    constituency_mp_num,
                    party_id: party.id,
                };
                let seat_id = seats::insert_seat(&ctx.pool, &seat).await?;
                surviving_ids.push(seat_id);
                ctx.stats.added += 1;
                tracing::info!("Added seat: {} ({})", person.name, seat_type);
            }
        }
    }

    let deleted =
        seats::delete_seats_except(&ctx.pool, "seats", person.id, parliament.id, &surviving_ids)
            .await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!("Deleted {} non-existent seats of {}", deleted, person.name);
    }

    Ok(())
}

/// Reconcile a person's committee seats within one parliament.
pub async fn sync_committee_seats(
    ctx: &mut SyncContext,
    person_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if ctx.committee_seats_done(parliament.parliament_num, person_xml_id) {
        return Ok(());
    }

    let person = persons::find_by_xml_id(&ctx.pool, person_xml_id)
        .await?
        .ok_or_else(|| {
            Error::NotFoundUpstream(format!("Person with XML-ID {} not found", person_xml_id))
        })?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::CommitteeSeats, &[person_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let local_seats = seats::list_committee_seats(&ctx.pool, person.id, parliament.id).await?;
    let mut surviving_ids = Vec::new();

    for node in xml::desc_all(doc.root_element(), "nefndaseta") {
        let seat_parliament_num = xml::req_child_int(node, "þing")?;
        if seat_parliament_num != parliament.parliament_num {
            continue;
        }

        let committee_node = xml::req_desc(node, "nefnd")?;
        let committee_xml_id = xml::req_attr_int(committee_node, "id")?;
        let committee =
            sync_committee(ctx, committee_xml_id, Some(parliament.parliament_num)).await?;

        let committee_seat_type = xml::req_child_text(node, "staða")?;
        let order_num = xml::opt_child_int(node, "röð").unwrap_or(0);
        let timing_in = xml::req_child_datetime(node, "inn")?;
        let timing_out = xml::opt_child_datetime(node, "út")?;

        let existing = local_seats.iter().find(|s| {
            s.committee_id == committee.id
                && s.timing_in == timing_in
                && (s.timing_out == timing_out || s.timing_out.is_none())
        });

        match existing {
            Some(seat) => {
                surviving_ids.push(seat.id);
                if seat.timing_out != timing_out {
                    seats::set_seat_timing_out(&ctx.pool, "committee_seats", seat.id, timing_out)
                        .await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated committee seat: {} ({})", person.name, committee.name);
                } else {
                    ctx.stats.unchanged += 1;
                    tracing::debug!(
                        "Already have committee seat: {} ({})",
                        person.name,
                        committee.name
                    );
                }
            }
            None => {
                let seat = CommitteeSeat {
                    id: 0,
                    person_id: person.id,
                    committee_id: committee.id,
                    parliament_id: parliament.id,
                    committee_seat_type,
                    order_num,
                    timing_in,
                    timing_out,
                };
                let seat_id = seats::insert_committee_seat(&ctx.pool, &seat).await?;
                surviving_ids.push(seat_id);
                ctx.stats.added += 1;
                tracing::info!("Added committee seat: {} ({})", person.name, committee.name);
            }
        }
    }

    let deleted = seats::delete_seats_except(
        &ctx.pool,
        "committee_seats",
        person.id,
        parliament.id,
        &surviving_ids,
    )
    .await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!(
            "Deleted {} non-existent committee seats of {}",
            deleted,
            person.name
        );
    }

    Ok(())
}
