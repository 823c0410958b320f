//! Vote casting reconciliation

use crate::db::committees;
use crate::db::documents;
use crate::db::ministers;
use crate::db::sessions;
use crate::db::vote_castings::{self, VoteCasting};
use crate::feed::FeedUrl;
use crate::sync::issues::{sync_docless_issue, sync_issue};
use crate::sync::parliaments::sync_parliament;
use crate::sync::persons::sync_person;
use crate::sync::sessions::sync_session;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use roxmltree::Node;

/// Reconcile the vote castings of a parliament, optionally limited to the
/// last `days` days of activity.
pub async fn sync_vote_castings(
    ctx: &mut SyncContext,
    parliament_num: Option<i64>,
    days: Option<i64>,
) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::VoteCastings, &[parliament.parliament_num], days)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for node in xml::desc_all(doc.root_element(), "atkvæðagreiðsla") {
        process_vote_casting(ctx, node).await?;
    }

    Ok(())
}

/// Reconcile one vote casting by its feed id.
pub async fn sync_vote_casting(
    ctx: &mut SyncContext,
    vote_casting_xml_id: i64,
    parliament_num: Option<i64>,
) -> Result<()> {
    if vote_casting_xml_id < 1 {
        return Err(Error::InvalidInput(format!(
            "Vote casting number {} is not valid",
            vote_casting_xml_id
        )));
    }

    sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::VoteCasting, &[vote_casting_xml_id], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let node = xml::desc(doc.root_element(), "atkvæðagreiðsla").ok_or_else(|| {
        Error::NotFoundUpstream(format!(
            "Vote casting {} does not exist",
            vote_casting_xml_id
        ))
    })?;

    process_vote_casting(ctx, node).await
}

async fn process_vote_casting(ctx: &mut SyncContext, node: Node<'_, '_>) -> Result<()> {
    let vote_casting_xml_id = xml::req_attr_int(node, "atkvæðagreiðslunúmer")?;
    let parliament_num = xml::req_attr_int(node, "þingnúmer")?;
    let parliament = sync_parliament(ctx, Some(parliament_num)).await?;

    let issue = match xml::opt_attr_int(node, "málsnúmer") {
        Some(issue_num) => {
            let issue_group = node.attribute("málsflokkur").unwrap_or("A");
            let issue = match issue_group {
                "B" => {
                    let issue_name = xml::child_text(node, "málsheiti").unwrap_or_default();
                    sync_docless_issue(ctx, issue_num, &issue_name, Some(parliament_num)).await?
                }
                _ => sync_issue(ctx, issue_num, Some(parliament_num)).await?,
            };
            Some(issue)
        }
        None => None,
    };

    let timing = xml::req_child_datetime(node, "tími")?;
    let vote_casting_type = xml::child_text(node, "tegund").unwrap_or_default();
    let vote_casting_type_text = xml::child_text(node, "tegundtexti").unwrap_or_default();
    let specifics = xml::child_text(node, "nánar").unwrap_or_default();
    let method = xml::child_text(node, "aðferð");

    let summary = xml::desc(node, "samantekt");
    let conclusion = summary.and_then(|s| xml::child_text(s, "afgreiðsla"));
    let count_yes = summary
        .and_then(|s| xml::desc(s, "já"))
        .and_then(|n| xml::opt_child_int(n, "fjöldi"));
    let count_no = summary
        .and_then(|s| xml::desc(s, "nei"))
        .and_then(|n| xml::opt_child_int(n, "fjöldi"));
    let count_abstain = summary
        .and_then(|s| xml::desc(s, "greiðirekkiatkvæði"))
        .and_then(|n| xml::opt_child_int(n, "fjöldi"));

    let document_id = match (&issue, xml::desc(node, "þingskjal")) {
        (Some(issue), Some(doc_node)) => match xml::opt_attr_int(doc_node, "skjalsnúmer") {
            Some(doc_num) => documents::find_by_num(&ctx.pool, issue.id, doc_num)
                .await?
                .map(|d| d.id),
            None => None,
        },
        _ => None,
    };

    let session_id = match xml::opt_child_int(node, "fundur") {
        Some(session_num) => {
            match sessions::find_by_num(&ctx.pool, parliament.id, session_num).await? {
                Some(session) => Some(session.id),
                None => sync_session(ctx, session_num, Some(parliament_num))
                    .await?
                    .map(|s| s.id),
            }
        }
        None => None,
    };

    // The feed gives the referral destination only as free text.
    let (to_committee_id, to_minister_id) = match xml::child_text(node, "til") {
        Some(destination) => resolve_destination(ctx, parliament.id, &destination).await?,
        None => (None, None),
    };

    let casting = match vote_castings::find_by_xml_id(&ctx.pool, vote_casting_xml_id).await? {
        Some(mut casting) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut casting.issue_id, issue.as_ref().map(|i| i.id), |v| {
                FieldChange::int("issue_id", v)
            });
            diff_field(&mut changes, &mut casting.document_id, document_id, |v| {
                FieldChange::int("document_id", v)
            });
            diff_field(&mut changes, &mut casting.session_id, session_id, |v| {
                FieldChange::int("session_id", v)
            });
            diff_field(&mut changes, &mut casting.timing, timing, |v| {
                FieldChange::datetime("timing", Some(v))
            });
            diff_field(
                &mut changes,
                &mut casting.vote_casting_type,
                vote_casting_type,
                |v| FieldChange::text("vote_casting_type", v),
            );
            diff_field(
                &mut changes,
                &mut casting.vote_casting_type_text,
                vote_casting_type_text,
                |v| FieldChange::text("vote_casting_type_text", v),
            );
            diff_field(&mut changes, &mut casting.specifics, specifics, |v| {
                FieldChange::text("specifics", v)
            });
            diff_field(&mut changes, &mut casting.method, method, |v| {
                FieldChange::text("method", v)
            });
            diff_field(&mut changes, &mut casting.count_yes, count_yes, |v| {
                FieldChange::int("count_yes", v)
            });
            diff_field(&mut changes, &mut casting.count_no, count_no, |v| {
                FieldChange::int("count_no", v)
            });
            diff_field(&mut changes, &mut casting.count_abstain, count_abstain, |v| {
                FieldChange::int("count_abstain", v)
            });
            diff_field(&mut changes, &mut casting.conclusion, conclusion, |v| {
                FieldChange::text("conclusion", v)
            });
            diff_field(&mut changes, &mut casting.to_committee_id, to_committee_id, |v| {
                FieldChange::int("to_committee_id", v)
            });
            diff_field(&mut changes, &mut casting.to_minister_id, to_minister_id, |v| {
                FieldChange::int("to_minister_id", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have vote casting: {}", vote_casting_xml_id);
            } else {
                vote_castings::update(&ctx.pool, casting.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated vote casting: {}", vote_casting_xml_id);
            }
            casting
        }
        None => {
            let mut casting = VoteCasting {
                id: 0,
                issue_id: issue.as_ref().map(|i| i.id),
                document_id,
                session_id,
                timing,
                vote_casting_type,
                vote_casting_type_text,
                specifics,
                method,
                count_yes,
                count_no,
                count_abstain,
                conclusion,
                to_committee_id,
                to_minister_id,
                vote_casting_xml_id,
            };
            casting.id = vote_castings::insert(&ctx.pool, &casting).await?;
            ctx.stats.added += 1;
            tracing::info!("Added vote casting: {}", vote_casting_xml_id);
            casting
        }
    };

    // Roll call: one vote per person.
    if let Some(roll) = xml::desc(node, "atkvæðaskrá") {
        for person_node in xml::desc_all(roll, "þingmaður") {
            let person_xml_id = xml::req_attr_int(person_node, "id")?;
            let vote_response = xml::req_child_text(person_node, "atkvæði")?;

            let person = sync_person(ctx, person_xml_id, Some(parliament_num)).await?;

            match vote_castings::find_vote(&ctx.pool, casting.id, person.id).await? {
                Some(vote) => {
                    if vote.vote_response != vote_response {
                        vote_castings::update_vote_response(&ctx.pool, vote.id, &vote_response)
                            .await?;
                        ctx.stats.updated += 1;
                        tracing::info!("Updated vote: {}", person.name);
                    } else {
                        ctx.stats.unchanged += 1;
                        tracing::debug!("Already have vote: {}", person.name);
                    }
                }
                None => {
                    vote_castings::insert_vote(&ctx.pool, casting.id, person.id, &vote_response)
                        .await?;
                    ctx.stats.added += 1;
                    tracing::info!("Added vote: {}", person.name);
                }
            }
        }
    }

    Ok(())
}

/// Resolve a free-text referral destination against the parliament's known
/// committees, then ministers, by case-exact name equality.
///
/// The upstream field is known to be unreliable; no match is preferred over
/// a wrong match, so anything unresolved leaves both destinations unset.
async fn resolve_destination(
    ctx: &mut SyncContext,
    parliament_id: i64,
    destination: &str,
) -> Result<(Option<i64>, Option<i64>)> {
    let destination = xml::collapse_ws(destination);

    if let Some(committee) =
        committees::find_by_name_in_parliament(&ctx.pool, parliament_id, &destination).await?
    {
        return Ok((Some(committee.id), None));
    }

    if let Some(minister) =
        ministers::find_by_name_in_parliament(&ctx.pool, parliament_id, &destination).await?
    {
        return Ok((None, Some(minister.id)));
    }

    tracing::debug!("Unresolved vote casting destination: {}", destination);
    Ok((None, None))
}
