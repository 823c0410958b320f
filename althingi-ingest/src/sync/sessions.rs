//! Session and session agenda reconciliation

use crate::db::sessions::{self, Session, SessionAgendaItem};
use crate::feed::FeedUrl;
use crate::sync::issues::{sync_docless_issue, sync_issue};
use crate::sync::parliaments::sync_parliament;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use chrono::{DateTime, Utc};
use roxmltree::Node;

/// Reconcile the sessions of a parliament, newest first, optionally
/// stopping at a date limit.
pub async fn sync_sessions(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
    date_limit: Option<DateTime<Utc>>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::SessionList, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let mut session_nums = Vec::new();
    for node in xml::desc_all(doc.root_element(), "þingfundur").into_iter().rev() {
        let session_num = xml::req_attr_int(node, "númer")?;

        // A session planned immediately following another has no date of
        // its own; missing dates mean the session is in the future and
        // never ends the walk.
        let session_date = match xml::child_text(node, "dagur") {
            Some(value) => Some(althingi_common::time::sensible_datetime(&value)?),
            None => xml::opt_child_datetime(node, "fundursettur")?,
        };

        if let (Some(limit), Some(date)) = (date_limit, session_date) {
            if date < limit {
                break;
            }
        }

        session_nums.push(session_num);
    }

    for session_num in session_nums {
        sync_session(ctx, session_num, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile one session by number. A session the feed no longer knows is
/// deleted locally if present.
pub async fn sync_session(
    ctx: &mut SyncContext,
    session_num: i64,
    parliament_num: Option<i64>,
) -> Result<Option<Session>> {
    if session_num < 1 {
        return Err(Error::InvalidInput(format!(
            "Session number {} is not valid",
            session_num
        )));
    }

    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(
            FeedUrl::SessionAgenda,
            &[parliament.parliament_num, session_num],
            None,
        )
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let Some(session_node) = xml::desc(doc.root_element(), "þingfundur") else {
        // The feed dropped the session; follow suit, or fail if we never
        // knew it.
        return match sessions::find_by_num(&ctx.pool, parliament.id, session_num).await? {
            Some(session) => {
                sessions::delete(&ctx.pool, session.id).await?;
                ctx.stats.deleted += 1;
                tracing::info!("Deleted non-existent session: {}", session.name);
                Ok(None)
            }
            None => Err(Error::NotFoundUpstream(format!(
                "Session {} in parliament {} does not exist",
                session_num, parliament.parliament_num
            ))),
        };
    };

    let session = process_session_agenda(ctx, session_node).await?;
    Ok(Some(session))
}

/// Reconcile the agendas of upcoming sessions (the feed's unnumbered
/// next-sessions document).
pub async fn sync_next_sessions(ctx: &mut SyncContext) -> Result<()> {
    let content = ctx
        .feed
        .fetch_xml(FeedUrl::SessionNextAgenda, &[], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for session_node in xml::desc_all(doc.root_element(), "þingfundur") {
        process_session_agenda(ctx, session_node).await?;
    }

    Ok(())
}

/// Reconcile one session and its agenda from a session document node. The
/// node carries its own parliament number, so upcoming-session documents
/// resolve correctly regardless of requested scope.
async fn process_session_agenda(
    ctx: &mut SyncContext,
    session_node: Node<'_, '_>,
) -> Result<Session> {
    let parliament_num = xml::req_attr_int(session_node, "þingnúmer")?;
    let session_num = xml::req_attr_int(session_node, "númer")?;

    let parliament = sync_parliament(ctx, Some(parliament_num)).await?;

    let name = xml::child_text(session_node, "fundarheiti").unwrap_or_default();

    // Sometimes only the date of the planned start is known, not the time.
    let begins = xml::desc(session_node, "hefst");
    let timing_start_planned = match begins {
        Some(begins) => match xml::opt_child_datetime(begins, "dagurtími")? {
            Some(dt) => Some(dt),
            None => xml::opt_child_datetime(begins, "dagur")?,
        },
        None => None,
    };
    let timing_text = begins.and_then(|b| xml::child_text(b, "texti"));

    let timing_start = xml::opt_child_datetime(session_node, "fundursettur")?;
    let timing_end = xml::opt_child_datetime(session_node, "fuslit")?;

    let session = match sessions::find_by_num(&ctx.pool, parliament.id, session_num).await? {
        Some(mut session) => {
            let mut changes = Vec::new();
            diff_field(
                &mut changes,
                &mut session.timing_start_planned,
                timing_start_planned,
                |v| FieldChange::datetime("timing_start_planned", v),
            );
            diff_field(&mut changes, &mut session.timing_start, timing_start, |v| {
                FieldChange::datetime("timing_start", v)
            });
            diff_field(&mut changes, &mut session.timing_end, timing_end, |v| {
                FieldChange::datetime("timing_end", v)
            });
            diff_field(&mut changes, &mut session.timing_text, timing_text, |v| {
                FieldChange::text("timing_text", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have session: {}", session.name);
            } else {
                sessions::update(&ctx.pool, session.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated session: {}", session.name);
            }
            session
        }
        None => {
            let mut session = Session {
                id: 0,
                parliament_id: parliament.id,
                session_num,
                name,
                timing_start_planned,
                timing_start,
                timing_end,
                timing_text,
            };
            session.id = sessions::insert(&ctx.pool, &session).await?;
            ctx.stats.added += 1;
            tracing::info!("Added session: {}", session.name);
            session
        }
    };

    let Some(agenda_node) = xml::desc(session_node, "dagskrá") else {
        return Ok(session);
    };

    let mut max_order = 0;

    for item_node in xml::desc_all(agenda_node, "dagskrárliður") {
        let order_num = xml::req_attr_int(item_node, "númer")?;
        if order_num > max_order {
            max_order = order_num;
        }

        let issue_node = xml::req_desc(item_node, "mál")?;
        let issue_num = xml::req_attr_int(issue_node, "málsnúmer")?;
        let issue_group = issue_node.attribute("málsflokkur").unwrap_or("A");
        let issue_name = xml::child_text(issue_node, "málsheiti").unwrap_or_default();

        let issue = match issue_group {
            "B" => sync_docless_issue(ctx, issue_num, &issue_name, Some(parliament_num)).await?,
            _ => sync_issue(ctx, issue_num, Some(parliament_num)).await?,
        };

        let discussion_node = xml::desc(item_node, "umræða");
        let discussion_type = discussion_node
            .and_then(|n| n.attribute("tegund"))
            .unwrap_or_default()
            .to_string();
        let discussion_continued = discussion_node
            .and_then(|n| n.attribute("framhald"))
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        let comment_node = xml::desc(item_node, "athugasemd");
        let comment_type = comment_node
            .and_then(|n| n.attribute("tegund"))
            .map(str::to_string);
        let comment_text = comment_node.and_then(|n| xml::child_text(n, "dagskrártexti"));
        let comment_description = comment_node.and_then(|n| xml::child_text(n, "skýring"));

        match sessions::find_agenda_item(&ctx.pool, session.id, order_num).await? {
            Some(mut item) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut item.issue_id, Some(issue.id), |v| {
                    FieldChange::int("issue_id", v)
                });
                diff_field(&mut changes, &mut item.discussion_type, discussion_type, |v| {
                    FieldChange::text("discussion_type", v)
                });
                diff_field(
                    &mut changes,
                    &mut item.discussion_continued,
                    discussion_continued,
                    |v| FieldChange::bool("discussion_continued", v),
                );
                diff_field(&mut changes, &mut item.comment_type, comment_type, |v| {
                    FieldChange::text("comment_type", v)
                });
                diff_field(&mut changes, &mut item.comment_text, comment_text, |v| {
                    FieldChange::text("comment_text", v)
                });
                diff_field(
                    &mut changes,
                    &mut item.comment_description,
                    comment_description,
                    |v| FieldChange::text("comment_description", v),
                );

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have session agenda item: {}", order_num);
                } else {
                    sessions::update_agenda_item(&ctx.pool, item.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated session agenda item: {}", order_num);
                }
            }
            None => {
                let item = SessionAgendaItem {
                    id: 0,
                    session_id: session.id,
                    order_num,
                    discussion_type,
                    discussion_continued,
                    comment_type,
                    comment_text,
                    comment_description,
                    issue_id: Some(issue.id),
                };
                sessions::insert_agenda_item(&ctx.pool, &item).await?;
                ctx.stats.added += 1;
                tracing::info!("Added session agenda item: {}", order_num);
            }
        }
    }

    // Items above the reported maximum were dropped upstream.
    let deleted = sessions::delete_agenda_items_above(&ctx.pool, session.id, max_order).await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!("Deleted {} session agenda items", deleted);
    }

    Ok(session)
}
