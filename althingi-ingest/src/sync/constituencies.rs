//! Constituency reconciliation

use crate::db::constituencies::{self, Constituency};
use crate::feed::FeedUrl;
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Constituency id reserved for ministers outside Parliament; not a real
/// constituency and ignored.
const PLACEHOLDER_CONSTITUENCY_XML_ID: i64 = 1;

/// Reconcile the constituencies of a parliament.
pub async fn sync_constituencies(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if ctx.constituencies_done(parliament.parliament_num) {
        return Ok(());
    }

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Constituencies, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for node in xml::desc_all(doc.root_element(), "kjördæmið") {
        let constituency_xml_id = xml::req_attr_int(node, "id")?;
        if constituency_xml_id == PLACEHOLDER_CONSTITUENCY_XML_ID {
            continue;
        }

        let name = xml::req_child_text(node, "heiti")?;
        let description = xml::child_text(node, "lýsing").unwrap_or_default();

        let abbreviations = xml::req_desc(node, "skammstafanir")?;
        let abbreviation_short = xml::req_child_text(abbreviations, "stuttskammstöfun")?;
        let abbreviation_long = xml::child_text(abbreviations, "löngskammstöfun");

        let period = xml::req_desc(node, "tímabil")?;
        let parliament_num_first = xml::req_child_int(period, "fyrstaþing")?;
        let parliament_num_last = xml::opt_child_int(period, "síðastaþing");

        match constituencies::find_by_xml_id(&ctx.pool, constituency_xml_id).await? {
            Some(mut constituency) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut constituency.name, name.clone(), |v| {
                    FieldChange::text("name", v)
                });
                diff_field(&mut changes, &mut constituency.description, description, |v| {
                    FieldChange::text("description", v)
                });
                diff_field(
                    &mut changes,
                    &mut constituency.abbreviation_short,
                    abbreviation_short,
                    |v| FieldChange::text("abbreviation_short", v),
                );
                diff_field(
                    &mut changes,
                    &mut constituency.abbreviation_long,
                    abbreviation_long,
                    |v| FieldChange::text("abbreviation_long", v),
                );
                diff_field(
                    &mut changes,
                    &mut constituency.parliament_num_first,
                    parliament_num_first,
                    |v| FieldChange::int("parliament_num_first", v),
                );
                diff_field(
                    &mut changes,
                    &mut constituency.parliament_num_last,
                    parliament_num_last,
                    |v| FieldChange::int("parliament_num_last", v),
                );

                if !changes.is_empty() {
                    constituencies::update(&ctx.pool, constituency.id, &changes).await?;
                }

                let linked =
                    constituencies::link_parliament(&ctx.pool, constituency.id, parliament.id)
                        .await?;
                if changes.is_empty() && !linked {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have constituency: {}", constituency.name);
                } else {
                    ctx.stats.updated += 1;
                    tracing::info!("Updated constituency: {}", constituency.name);
                }
            }
            None => {
                let constituency = Constituency {
                    id: 0,
                    name,
                    description,
                    abbreviation_short,
                    abbreviation_long,
                    parliament_num_first,
                    parliament_num_last,
                    constituency_xml_id,
                };
                let constituency_id = constituencies::insert(&ctx.pool, &constituency).await?;
                constituencies::link_parliament(&ctx.pool, constituency_id, parliament.id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added constituency: {}", constituency.name);
            }
        }
    }

    Ok(())
}
