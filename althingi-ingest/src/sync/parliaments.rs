//! Parliament reconciliation
//!
//! Root of nearly every other procedure: everything resolves its parliament
//! scope through here first.

use crate::db::parliaments::{self, Parliament};
use crate::feed::FeedUrl;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::config::FIRST_PARLIAMENT_NUM;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Reconcile one parliament by term number. `None` means the configured
/// current term.
pub async fn sync_parliament(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
) -> Result<Parliament> {
    let parliament_num = parliament_num.unwrap_or(ctx.settings.current_parliament_num);
    validate_parliament_num(ctx, parliament_num)?;

    if let Some(parliament) = ctx.cached_parliament(parliament_num) {
        return Ok(parliament.clone());
    }

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Parliament, &[parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let node = xml::desc_all(doc.root_element(), "þing")
        .into_iter()
        .find(|n| xml::opt_attr_int(*n, "númer") == Some(parliament_num))
        .ok_or_else(|| {
            Error::NotFoundUpstream(format!("Parliament {} not found", parliament_num))
        })?;

    let era = xml::child_text(node, "tímabil").unwrap_or_default();
    let timing_start = xml::opt_child_datetime(node, "þingsetning")?;
    let timing_end = xml::opt_child_datetime(node, "þinglok")?;

    let parliament = match parliaments::find_by_num(&ctx.pool, parliament_num).await? {
        Some(mut parliament) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut parliament.era, era, |v| {
                FieldChange::text("era", v)
            });
            diff_field(&mut changes, &mut parliament.timing_start, timing_start, |v| {
                FieldChange::datetime("timing_start", v)
            });
            diff_field(&mut changes, &mut parliament.timing_end, timing_end, |v| {
                FieldChange::datetime("timing_end", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have parliament: {}", parliament_num);
            } else {
                parliaments::update(&ctx.pool, parliament.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated parliament: {}", parliament_num);
            }
            parliament
        }
        None => {
            let parliament =
                parliaments::insert(&ctx.pool, parliament_num, &era, timing_start, timing_end)
                    .await?;
            ctx.stats.added += 1;
            tracing::info!("Added parliament: {}", parliament_num);
            parliament
        }
    };

    ctx.cache_parliament(parliament.clone());

    Ok(parliament)
}

/// Reject parliament numbers outside the feed's known range before any
/// fetch or write happens.
pub fn validate_parliament_num(ctx: &SyncContext, parliament_num: i64) -> Result<()> {
    if parliament_num < FIRST_PARLIAMENT_NUM {
        return Err(Error::InvalidInput(format!(
            "Parliament {} is before the first parliament ({}) covered by the feed",
            parliament_num, FIRST_PARLIAMENT_NUM
        )));
    }
    if parliament_num > ctx.settings.current_parliament_num {
        return Err(Error::InvalidInput(format!(
            "Parliament {} is beyond the latest known parliament ({})",
            parliament_num, ctx.settings.current_parliament_num
        )));
    }
    Ok(())
}
