//! Party reconciliation

use crate::db::parties::{self, Party};
use crate::feed::FeedUrl;
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Reconcile the parties of a parliament from the party listing.
pub async fn sync_parties(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if ctx.parties_done(parliament.parliament_num) {
        return Ok(());
    }

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Parties, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for party_node in xml::desc_all(doc.root_element(), "þingflokkur") {
        let party_xml_id = xml::req_attr_int(party_node, "id")?;

        // Nameless entries are placeholders in old terms.
        let name = match xml::child_text(party_node, "heiti") {
            Some(name) => name,
            None => continue,
        };

        let abbreviations = xml::req_desc(party_node, "skammstafanir")?;
        let abbreviation_short = xml::req_child_text(abbreviations, "stuttskammstöfun")?;
        let abbreviation_long = xml::req_child_text(abbreviations, "löngskammstöfun")?;

        let period = xml::req_desc(party_node, "tímabil")?;
        let parliament_num_first = xml::req_child_int(period, "fyrstaþing")?;
        let parliament_num_last = xml::opt_child_int(period, "síðastaþing");

        match parties::find_by_xml_id(&ctx.pool, party_xml_id).await? {
            Some(mut party) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut party.name, name.clone(), |v| {
                    FieldChange::text("name", v)
                });
                diff_field(
                    &mut changes,
                    &mut party.abbreviation_short,
                    abbreviation_short,
                    |v| FieldChange::text("abbreviation_short", v),
                );
                diff_field(
                    &mut changes,
                    &mut party.abbreviation_long,
                    abbreviation_long,
                    |v| FieldChange::text("abbreviation_long", v),
                );
                diff_field(
                    &mut changes,
                    &mut party.parliament_num_first,
                    parliament_num_first,
                    |v| FieldChange::int("parliament_num_first", v),
                );
                diff_field(
                    &mut changes,
                    &mut party.parliament_num_last,
                    parliament_num_last,
                    |v| FieldChange::int("parliament_num_last", v),
                );

                if !changes.is_empty() {
                    parties::update(&ctx.pool, party.id, &changes).await?;
                }

                let linked = parties::link_parliament(&ctx.pool, party.id, parliament.id).await?;
                if changes.is_empty() && !linked {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have party: {}", party.name);
                } else {
                    ctx.stats.updated += 1;
                    tracing::info!("Updated party: {}", party.name);
                }
            }
            None => {
                let party = Party {
                    id: 0,
                    slug: slug::slugify(&name),
                    special: Party::is_special(&name),
                    name,
                    abbreviation_short,
                    abbreviation_long,
                    parliament_num_first,
                    parliament_num_last,
                    party_xml_id,
                };
                let party_id = parties::insert(&ctx.pool, &party).await?;
                parties::link_parliament(&ctx.pool, party_id, parliament.id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added party: {}", party.name);
            }
        }
    }

    Ok(())
}
