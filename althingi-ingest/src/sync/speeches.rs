//! Speech reconciliation
//!
//! Speech identity is the (parliament, start-timestamp) pair; the feed has
//! no stable speech identifier for older terms. `order_in_issue` is
//! assigned from a per-run counter in upstream listing order: a full pass
//! renumbers from the start, a days-limited pass continues above the
//! stored maximum so existing values are never reused within the run.

use crate::db::issues;
use crate::db::sessions;
use crate::db::speeches::{self, Speech};
use crate::feed::FeedUrl;
use crate::sync::issues::{sync_docless_issue, sync_issue};
use crate::sync::parliaments::sync_parliament;
use crate::sync::persons::sync_person;
use crate::sync::sessions::sync_session;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use std::collections::HashMap;

/// Reconcile the speeches of a parliament, optionally limited to the last
/// `days` days of activity.
pub async fn sync_speeches(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
    days: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::Speeches, &[parliament.parliament_num], days)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    // Speakers seen per docless issue, for special-discussion roles.
    let mut docless_speakers: HashMap<i64, Vec<i64>> = HashMap::new();

    for node in xml::desc_all(doc.root_element(), "ræða") {
        let person_node = xml::req_desc(node, "þingmaður")?;
        let person_xml_id = xml::req_attr_int(person_node, "id")?;
        let person = sync_person(ctx, person_xml_id, Some(parliament.parliament_num)).await?;

        let issue = match xml::desc(node, "mál") {
            Some(issue_node) => {
                let issue_num = xml::req_attr_int(issue_node, "málsnúmer")?;
                let issue_group = issue_node.attribute("málsflokkur").unwrap_or("A");
                let issue_name = xml::child_text(issue_node, "málsheiti").unwrap_or_default();

                let issue = match issue_group {
                    "B" => {
                        sync_docless_issue(
                            ctx,
                            issue_num,
                            &issue_name,
                            Some(parliament.parliament_num),
                        )
                        .await?
                    }
                    _ => sync_issue(ctx, issue_num, Some(parliament.parliament_num)).await?,
                };
                Some(issue)
            }
            None => None,
        };

        let session_id = match xml::opt_child_int(node, "fundur") {
            Some(session_num) => {
                match sessions::find_by_num(&ctx.pool, parliament.id, session_num).await? {
                    Some(session) => Some(session.id),
                    None => sync_session(ctx, session_num, Some(parliament.parliament_num))
                        .await?
                        .map(|s| s.id),
                }
            }
            None => None,
        };

        let timing_start = xml::req_child_datetime(node, "ræðahófst")?;
        let timing_end = xml::req_child_datetime(node, "ræðulauk")?;
        let date = match xml::opt_child_datetime(node, "dagur")? {
            Some(date) => date,
            None => timing_start,
        };
        let seconds = (timing_end - timing_start).num_seconds().max(0);

        let speech_type = xml::child_text(node, "tegundræðu").unwrap_or_default();
        let iteration = xml::child_text(node, "umræða");

        let paths = xml::desc(node, "slóðir");
        let html_remote_path = paths.and_then(|p| xml::child_text(p, "html"));
        let sgml_remote_path = paths.and_then(|p| xml::child_text(p, "sgml"));
        let xml_remote_path = paths.and_then(|p| xml::child_text(p, "xml"));
        let text_remote_path = paths.and_then(|p| xml::child_text(p, "texti"));
        let sound_remote_path = paths.and_then(|p| xml::child_text(p, "hljóð"));

        // Listing order within the issue, stable across runs as long as
        // the upstream order is stable.
        let order_in_issue = match &issue {
            Some(issue) => {
                let seed = if ctx.has_speech_order(issue.id) {
                    0 // already seeded; the argument is ignored
                } else if days.is_some() {
                    speeches::max_order_in_issue(&ctx.pool, issue.id).await?
                } else {
                    0
                };
                Some(ctx.next_speech_order(issue.id, seed))
            }
            None => None,
        };

        if let Some(issue) = &issue {
            if issue.issue_group == "B" {
                let speakers = docless_speakers.entry(issue.id).or_default();
                if !speakers.contains(&person.id) {
                    speakers.push(person.id);
                }
            }
        }

        match speeches::find_by_timing(&ctx.pool, parliament.id, timing_start).await? {
            Some(mut speech) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut speech.person_id, person.id, |v| {
                    FieldChange::int("person_id", v)
                });
                diff_field(&mut changes, &mut speech.session_id, session_id, |v| {
                    FieldChange::int("session_id", v)
                });
                diff_field(
                    &mut changes,
                    &mut speech.issue_id,
                    issue.as_ref().map(|i| i.id),
                    |v| FieldChange::int("issue_id", v),
                );
                diff_field(&mut changes, &mut speech.date, date, |v| {
                    FieldChange::datetime("date", Some(v))
                });
                diff_field(&mut changes, &mut speech.timing_end, timing_end, |v| {
                    FieldChange::datetime("timing_end", Some(v))
                });
                diff_field(&mut changes, &mut speech.seconds, seconds, |v| {
                    FieldChange::int("seconds", v)
                });
                diff_field(&mut changes, &mut speech.speech_type, speech_type, |v| {
                    FieldChange::text("speech_type", v)
                });
                diff_field(&mut changes, &mut speech.iteration, iteration, |v| {
                    FieldChange::text("iteration", v)
                });
                diff_field(&mut changes, &mut speech.order_in_issue, order_in_issue, |v| {
                    FieldChange::int("order_in_issue", v)
                });
                diff_field(
                    &mut changes,
                    &mut speech.html_remote_path,
                    html_remote_path,
                    |v| FieldChange::text("html_remote_path", v),
                );
                diff_field(
                    &mut changes,
                    &mut speech.sgml_remote_path,
                    sgml_remote_path,
                    |v| FieldChange::text("sgml_remote_path", v),
                );
                diff_field(&mut changes, &mut speech.xml_remote_path, xml_remote_path, |v| {
                    FieldChange::text("xml_remote_path", v)
                });
                diff_field(
                    &mut changes,
                    &mut speech.text_remote_path,
                    text_remote_path,
                    |v| FieldChange::text("text_remote_path", v),
                );
                diff_field(
                    &mut changes,
                    &mut speech.sound_remote_path,
                    sound_remote_path,
                    |v| FieldChange::text("sound_remote_path", v),
                );

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have speech: {} @ {}", person.name, timing_start);
                } else {
                    speeches::update(&ctx.pool, speech.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated speech: {} @ {}", person.name, timing_start);
                }
            }
            None => {
                let speech = Speech {
                    id: 0,
                    parliament_id: parliament.id,
                    person_id: person.id,
                    session_id,
                    issue_id: issue.as_ref().map(|i| i.id),
                    date,
                    timing_start,
                    timing_end,
                    seconds,
                    speech_type,
                    iteration,
                    order_in_issue,
                    html_remote_path,
                    sgml_remote_path,
                    xml_remote_path,
                    text_remote_path,
                    sound_remote_path,
                };
                speeches::insert(&ctx.pool, &speech).await?;
                ctx.stats.added += 1;
                tracing::info!("Added speech: {} @ {}", person.name, timing_start);
            }
        }
    }

    // Special discussions (docless issues) are led by an inquisitor, with
    // the addressed minister responding second.
    for (issue_id, speakers) in docless_speakers {
        let special_inquisitor_id = speakers.first().copied();
        let special_responder_id = speakers.get(1).copied();

        if let Some(mut issue) = issues::find_by_id(&ctx.pool, issue_id).await? {
            let mut changes = Vec::new();
            diff_field(
                &mut changes,
                &mut issue.special_inquisitor_id,
                special_inquisitor_id,
                |v| FieldChange::int("special_inquisitor_id", v),
            );
            diff_field(
                &mut changes,
                &mut issue.special_responder_id,
                special_responder_id,
                |v| FieldChange::int("special_responder_id", v),
            );

            if !changes.is_empty() {
                issues::update(&ctx.pool, issue.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated special discussion roles for issue: {}", issue.name);
            }
        }
    }

    Ok(())
}
