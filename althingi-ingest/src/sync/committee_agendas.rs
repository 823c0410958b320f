//! Committee agenda reconciliation

use crate::db::committee_agendas::{self, CommitteeAgenda, CommitteeAgendaItem};
use crate::feed::FeedUrl;
use crate::sync::committees::sync_committee;
use crate::sync::issues::{sync_docless_issue, sync_issue};
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use chrono::{DateTime, Utc};

/// Reconcile the committee agendas of a parliament, newest first,
/// optionally stopping at a date limit.
pub async fn sync_committee_agendas(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
    date_limit: Option<DateTime<Utc>>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(
            FeedUrl::CommitteeAgendaList,
            &[parliament.parliament_num],
            None,
        )
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let mut agenda_ids = Vec::new();
    for node in xml::desc_all(doc.root_element(), "nefndarfundur").into_iter().rev() {
        let agenda_xml_id = xml::req_attr_int(node, "númer")?;

        if let Some(limit) = date_limit {
            if let Some(meeting_date) = xml::opt_child_datetime(node, "dagur")? {
                if meeting_date < limit {
                    break;
                }
            }
        }

        agenda_ids.push(agenda_xml_id);
    }

    for agenda_xml_id in agenda_ids {
        sync_committee_agenda(ctx, agenda_xml_id, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile committee agendas from today forward.
pub async fn sync_next_committee_agendas(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
) -> Result<()> {
    let today = chrono::Utc::now()
        .date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();

    sync_committee_agendas(ctx, parliament_num, Some(today)).await
}

/// Reconcile one committee agenda by its feed id, including its ordered
/// items.
pub async fn sync_committee_agenda(
    ctx: &mut SyncContext,
    committee_agenda_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<CommitteeAgenda> {
    if committee_agenda_xml_id < 1 {
        return Err(Error::InvalidInput(format!(
            "Committee agenda number {} is not valid",
            committee_agenda_xml_id
        )));
    }

    let requested_parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::CommitteeAgenda, &[committee_agenda_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let node = xml::desc(doc.root_element(), "nefndarfundur").ok_or_else(|| {
        Error::NotFoundUpstream(format!(
            "Committee agenda {} in parliament {} does not exist",
            committee_agenda_xml_id, requested_parliament.parliament_num
        ))
    })?;

    // The document states its own parliament; trust it over the requested
    // scope.
    let parliament_num = xml::req_attr_int(node, "þingnúmer")?;
    let parliament = sync_parliament(ctx, Some(parliament_num)).await?;

    let committee_node = xml::req_desc(node, "nefnd")?;
    let committee_xml_id = xml::req_attr_int(committee_node, "id")?;
    let committee = sync_committee(ctx, committee_xml_id, Some(parliament_num)).await?;

    let begins = xml::desc(node, "hefst");
    let timing_start_planned = match begins {
        Some(begins) => match xml::opt_child_datetime(begins, "dagurtími")? {
            Some(dt) => Some(dt),
            None => xml::opt_child_datetime(begins, "dagur")?,
        },
        None => None,
    };
    let timing_text = begins.and_then(|b| xml::child_text(b, "texti"));

    let timing_start = xml::opt_child_datetime(node, "fundursettur")?;
    let timing_end = xml::opt_child_datetime(node, "fuslit")?;

    let agenda = match committee_agendas::find_by_xml_id(&ctx.pool, committee_agenda_xml_id).await? {
        Some(mut agenda) => {
            let mut changes = Vec::new();
            diff_field(
                &mut changes,
                &mut agenda.timing_start_planned,
                timing_start_planned,
                |v| FieldChange::datetime("timing_start_planned", v),
            );
            diff_field(&mut changes, &mut agenda.timing_start, timing_start, |v| {
                FieldChange::datetime("timing_start", v)
            });
            diff_field(&mut changes, &mut agenda.timing_end, timing_end, |v| {
                FieldChange::datetime("timing_end", v)
            });
            diff_field(&mut changes, &mut agenda.timing_text, timing_text, |v| {
                FieldChange::text("timing_text", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have committee agenda: {}", committee.name);
            } else {
                committee_agendas::update(&ctx.pool, agenda.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated committee agenda: {}", committee.name);
            }
            agenda
        }
        None => {
            let mut agenda = CommitteeAgenda {
                id: 0,
                parliament_id: parliament.id,
                committee_id: committee.id,
                timing_start_planned,
                timing_start,
                timing_end,
                timing_text,
                committee_agenda_xml_id,
            };
            agenda.id = committee_agendas::insert(&ctx.pool, &agenda).await?;
            ctx.stats.added += 1;
            tracing::info!("Added committee agenda: {}", committee.name);
            agenda
        }
    };

    let mut max_order = 0;

    for item_node in xml::desc_all(node, "dagskrárliður") {
        let order_num = xml::req_attr_int(item_node, "númer")?;
        if order_num > max_order {
            max_order = order_num;
        }

        let name = xml::child_text(item_node, "heiti").unwrap_or_default();

        // At most one issue per agenda item.
        let issue_id = match xml::desc(item_node, "mál") {
            Some(issue_node) => {
                let issue_num = xml::req_attr_int(issue_node, "málsnúmer")?;
                let issue_parliament_num = xml::req_attr_int(issue_node, "löggjafarþing")?;
                let issue_group = issue_node.attribute("málsflokkur").unwrap_or("A");
                let issue_name = xml::child_text(issue_node, "málsheiti").unwrap_or_default();

                let issue = match issue_group {
                    "B" => {
                        sync_docless_issue(
                            ctx,
                            issue_num,
                            &issue_name,
                            Some(issue_parliament_num),
                        )
                        .await?
                    }
                    _ => sync_issue(ctx, issue_num, Some(issue_parliament_num)).await?,
                };
                Some(issue.id)
            }
            None => None,
        };

        match committee_agendas::find_item(&ctx.pool, agenda.id, order_num).await? {
            Some(mut item) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut item.name, name, |v| {
                    FieldChange::text("name", v)
                });
                diff_field(&mut changes, &mut item.issue_id, issue_id, |v| {
                    FieldChange::int("issue_id", v)
                });

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have committee agenda item: {}", order_num);
                } else {
                    committee_agendas::update_item(&ctx.pool, item.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated committee agenda item: {}", order_num);
                }
            }
            None => {
                let item = CommitteeAgendaItem {
                    id: 0,
                    committee_agenda_id: agenda.id,
                    order_num,
                    name,
                    issue_id,
                };
                committee_agendas::insert_item(&ctx.pool, &item).await?;
                ctx.stats.added += 1;
                tracing::info!("Added committee agenda item: {}", order_num);
            }
        }
    }

    let deleted = committee_agendas::delete_items_above(&ctx.pool, agenda.id, max_order).await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!("Deleted {} committee agenda items", deleted);
    }

    Ok(agenda)
}
