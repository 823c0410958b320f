//! Committee reconciliation

use crate::db::committees::{self, Committee};
use crate::feed::FeedUrl;
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Reconcile every committee listed for a parliament.
pub async fn sync_committees(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .fetch_memo(FeedUrl::CommitteeList, &[parliament.parliament_num])
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let ids: Vec<i64> = xml::desc_all(doc.root_element(), "nefnd")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "id"))
        .collect();

    for committee_xml_id in ids {
        sync_committee(ctx, committee_xml_id, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile one committee by its feed id.
///
/// The per-parliament listing occasionally omits committees that the feed
/// references elsewhere (a known upstream gap), so a miss falls back to the
/// parliament-agnostic full listing before giving up.
pub async fn sync_committee(
    ctx: &mut SyncContext,
    committee_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<Committee> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    if let Some(committee) = ctx.cached_committee(parliament.parliament_num, committee_xml_id) {
        return Ok(committee.clone());
    }

    let listed = find_in_listing(
        ctx,
        FeedUrl::CommitteeList,
        &[parliament.parliament_num],
        committee_xml_id,
    )
    .await?;

    let listed = match listed {
        Some(fields) => Some(fields),
        None => {
            let fallback =
                find_in_listing(ctx, FeedUrl::CommitteeFullList, &[], committee_xml_id).await?;
            if fallback.is_some() {
                tracing::warn!(
                    "Committee {} is missing from committee listing in parliament {}",
                    committee_xml_id,
                    parliament.parliament_num
                );
            }
            fallback
        }
    };

    let (name, abbreviation_short, abbreviation_long) = listed.ok_or_else(|| {
        Error::NotFoundUpstream(format!(
            "Committee with XML-ID {} does not exist",
            committee_xml_id
        ))
    })?;

    let committee = match committees::find_by_xml_id(&ctx.pool, committee_xml_id).await? {
        Some(mut committee) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut committee.name, name, |v| {
                FieldChange::text("name", v)
            });
            diff_field(
                &mut changes,
                &mut committee.abbreviation_short,
                abbreviation_short,
                |v| FieldChange::text("abbreviation_short", v),
            );
            diff_field(
                &mut changes,
                &mut committee.abbreviation_long,
                abbreviation_long,
                |v| FieldChange::text("abbreviation_long", v),
            );

            if !changes.is_empty() {
                committees::update(&ctx.pool, committee.id, &changes).await?;
            }

            let linked = committees::link_parliament(&ctx.pool, committee.id, parliament.id).await?;
            if changes.is_empty() && !linked {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have committee: {}", committee.name);
            } else {
                ctx.stats.updated += 1;
                tracing::info!("Updated committee: {}", committee.name);
            }
            committee
        }
        None => {
            let mut committee = Committee {
                id: 0,
                name,
                abbreviation_short,
                abbreviation_long,
                committee_xml_id,
            };
            committee.id = committees::insert(&ctx.pool, &committee).await?;
            committees::link_parliament(&ctx.pool, committee.id, parliament.id).await?;
            ctx.stats.added += 1;
            tracing::info!("Added committee: {}", committee.name);
            committee
        }
    };

    ctx.cache_committee(parliament.parliament_num, committee.clone());

    Ok(committee)
}

/// Locate a committee entry in a committee listing document.
/// Returns (name, abbreviation_short, abbreviation_long).
async fn find_in_listing(
    ctx: &mut SyncContext,
    url: FeedUrl,
    args: &[i64],
    committee_xml_id: i64,
) -> Result<Option<(String, String, String)>> {
    let content = ctx.fetch_memo(url, args).await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for node in xml::desc_all(doc.root_element(), "nefnd") {
        if xml::opt_attr_int(node, "id") != Some(committee_xml_id) {
            continue;
        }

        let name = xml::req_child_text(node, "heiti")?;
        let abbreviations = xml::req_desc(node, "skammstafanir")?;
        let abbreviation_short = xml::req_child_text(abbreviations, "stuttskammstöfun")?;
        let abbreviation_long = xml::req_child_text(abbreviations, "löngskammstöfun")?;

        return Ok(Some((name, abbreviation_short, abbreviation_long)));
    }

    Ok(None)
}
