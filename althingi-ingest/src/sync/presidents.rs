//! President (presiding officer) and president seat reconciliation

use crate::db::presidents::{self, President};
use crate::db::seats::{self, PresidentSeat};
use crate::feed::FeedUrl;
use crate::sync::parliaments::sync_parliament;
use crate::sync::persons::sync_person;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use std::collections::HashMap;

/// Reconcile the presidium of a parliament: the offices and who held them
/// when.
pub async fn sync_presidents(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::PresidentList, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    // Surviving seat ids per person, for the complement delete afterwards.
    let mut surviving: HashMap<i64, Vec<i64>> = HashMap::new();

    for node in xml::desc_all(doc.root_element(), "forseti") {
        let president_xml_id = xml::req_attr_int(node, "id")?;
        let name = xml::req_child_text(node, "heiti")?;
        let abbreviation = xml::child_text(node, "skammstöfun").unwrap_or_default();
        let president_type = xml::req_child_text(node, "tegund")?;
        let is_main = xml::child_text(node, "aðalmaður").as_deref() == Some("já");
        let order_num = xml::opt_child_int(node, "röð");

        let president = match presidents::find_by_xml_id(&ctx.pool, president_xml_id).await? {
            Some(mut president) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut president.name, name, |v| {
                    FieldChange::text("name", v)
                });
                diff_field(&mut changes, &mut president.abbreviation, abbreviation, |v| {
                    FieldChange::text("abbreviation", v)
                });
                diff_field(
                    &mut changes,
                    &mut president.president_type,
                    president_type,
                    |v| FieldChange::text("president_type", v),
                );
                diff_field(&mut changes, &mut president.is_main, is_main, |v| {
                    FieldChange::bool("is_main", v)
                });
                diff_field(&mut changes, &mut president.order_num, order_num, |v| {
                    FieldChange::int("order_num", v)
                });

                if !changes.is_empty() {
                    presidents::update(&ctx.pool, president.id, &changes).await?;
                }

                let linked =
                    presidents::link_parliament(&ctx.pool, president.id, parliament.id).await?;
                if changes.is_empty() && !linked {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have president: {}", president.name);
                } else {
                    ctx.stats.updated += 1;
                    tracing::info!("Updated president: {}", president.name);
                }
                president
            }
            None => {
                let mut president = President {
                    id: 0,
                    name,
                    abbreviation,
                    president_type,
                    is_main,
                    order_num,
                    president_xml_id,
                };
                president.id = presidents::insert(&ctx.pool, &president).await?;
                presidents::link_parliament(&ctx.pool, president.id, parliament.id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added president: {}", president.name);
                president
            }
        };

        for seat_node in xml::desc_all(node, "seta") {
            let person_node = xml::req_desc(seat_node, "þingmaður")?;
            let person_xml_id = xml::req_attr_int(person_node, "id")?;
            let person = sync_person(ctx, person_xml_id, Some(parliament.parliament_num)).await?;

            let timing_in = xml::req_child_datetime(seat_node, "inn")?;
            let timing_out = xml::opt_child_datetime(seat_node, "út")?;

            let local_seats =
                seats::list_president_seats(&ctx.pool, person.id, parliament.id).await?;
            let existing = local_seats.iter().find(|s| {
                s.president_id == president.id
                    && s.timing_in == timing_in
                    && (s.timing_out == timing_out || s.timing_out.is_none())
            });

            let seat_id = match existing {
                Some(seat) => {
                    if seat.timing_out != timing_out {
                        seats::set_seat_timing_out(
                            &ctx.pool,
                            "president_seats",
                            seat.id,
                            timing_out,
                        )
                        .await?;
                        ctx.stats.updated += 1;
                        tracing::info!(
                            "Updated president seat: {} ({})",
                            person.name,
                            president.name
                        );
                    } else {
                        ctx.stats.unchanged += 1;
                        tracing::debug!(
                            "Already have president seat: {} ({})",
                            person.name,
                            president.name
                        );
                    }
                    seat.id
                }
                None => {
                    let seat = PresidentSeat {
                        id: 0,
                        person_id: person.id,
                        president_id: president.id,
                        parliament_id: parliament.id,
                        timing_in,
                        timing_out,
                    };
                    let seat_id = seats::insert_president_seat(&ctx.pool, &seat).await?;
                    ctx.stats.added += 1;
                    tracing::info!("Added president seat: {} ({})", person.name, president.name);
                    seat_id
                }
            };

            surviving.entry(person.id).or_default().push(seat_id);
        }
    }

    for (person_id, seat_ids) in surviving {
        let deleted = seats::delete_seats_except(
            &ctx.pool,
            "president_seats",
            person_id,
            parliament.id,
            &seat_ids,
        )
        .await?;
        if deleted > 0 {
            ctx.stats.deleted += deleted;
            tracing::info!("Deleted {} non-existent president seats", deleted);
        }
    }

    Ok(())
}
