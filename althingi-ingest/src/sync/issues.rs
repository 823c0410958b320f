//! Issue reconciliation
//!
//! The deepest procedure in the engine: an issue pulls in its summary,
//! documents (with proposers), rapporteurs, reviews, category links and the
//! chain of its earlier publications. Child sets (documents, reviews,
//! rapporteurs) are converged to exactly match the feed on every pass.

use crate::archive::{maybe_download_document, maybe_download_review};
use crate::db::committees;
use crate::db::documents::{self, Document};
use crate::db::issues::{self, Issue, IssueSummary};
use crate::db::proposers::{self, Proposer};
use crate::db::reviews::{self, Review};
use crate::db::seats;
use crate::feed::FeedUrl;
use crate::sync::categories::sync_categories;
use crate::sync::committees::sync_committee;
use crate::sync::parliaments::sync_parliament;
use crate::sync::persons::sync_person;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use roxmltree::Node;

/// Short abbreviation of the special committee assumed when a proposing
/// committee is missing its id in the XML (a known upstream defect).
const SPECIAL_COMMITTEE_ABBREVIATION: &str = "sn";

/// Reconcile every issue listed for a parliament.
pub async fn sync_issues(ctx: &mut SyncContext, parliament_num: Option<i64>) -> Result<()> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    let content = ctx
        .feed
        .fetch_xml(FeedUrl::IssueList, &[parliament.parliament_num], None)
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    let issue_nums: Vec<i64> = xml::desc_all(doc.root_element(), "mál")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "málsnúmer"))
        .collect();

    for issue_num in issue_nums {
        sync_issue(ctx, issue_num, Some(parliament.parliament_num)).await?;
    }

    Ok(())
}

/// Reconcile one group-A issue (the kind with documents and reviews).
///
/// Boxed because an issue recursively reconciles the issues it was
/// previously published as, possibly in earlier parliaments.
pub fn sync_issue<'a>(
    ctx: &'a mut SyncContext,
    issue_num: i64,
    parliament_num: Option<i64>,
) -> BoxFuture<'a, Result<Issue>> {
    async move {
        if issue_num < 1 {
            return Err(Error::InvalidInput(format!(
                "Issue number {} is not valid",
                issue_num
            )));
        }

        let parliament = sync_parliament(ctx, parliament_num).await?;

        if let Some(issue) = ctx.cached_issue(parliament.parliament_num, issue_num, 'A') {
            return Ok(issue.clone());
        }

        let content = ctx
            .feed
            .fetch_xml(FeedUrl::Issue, &[parliament.parliament_num, issue_num], None)
            .await?;
        let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;
        let root = doc.root_element();

        let issue_node = xml::desc(root, "mál").ok_or_else(|| {
            Error::NotFoundUpstream(format!(
                "Issue {} in parliament {} does not exist",
                issue_num, parliament.parliament_num
            ))
        })?;

        let issue_type = xml::req_desc(issue_node, "málstegund")?
            .attribute("málstegund")
            .unwrap_or_default()
            .to_string();
        let name = xml::req_child_text(issue_node, "málsheiti")?;
        let description = xml::child_text(issue_node, "efnisgreining").unwrap_or_default();

        // Earlier publications are recorded now and reconciled last, after
        // this issue's own children are in place.
        let mut previously_published = Vec::new();
        if let Some(linked) = xml::desc(issue_node, "lagtFramÁðurSem") {
            for previous_node in xml::desc_all(linked, "mál") {
                let previous_parliament_num = xml::req_attr_int(previous_node, "þingnúmer")?;
                let previous_issue_num = xml::req_attr_int(previous_node, "málsnúmer")?;
                previously_published.push((previous_parliament_num, previous_issue_num));
            }
        }

        let mut issue = match issues::find_by_num(&ctx.pool, parliament.id, issue_num, "A").await? {
            Some(mut issue) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut issue.issue_type, issue_type, |v| {
                    FieldChange::text("issue_type", v)
                });
                diff_field(&mut changes, &mut issue.name, name, |v| {
                    FieldChange::text("name", v)
                });
                diff_field(&mut changes, &mut issue.description, description, |v| {
                    FieldChange::text("description", v)
                });

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have issue: {}", issue.name);
                } else {
                    issues::update(&ctx.pool, issue.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated issue: {}", issue.name);
                }
                issue
            }
            None => {
                let mut issue = Issue {
                    id: 0,
                    parliament_id: parliament.id,
                    issue_num,
                    issue_type,
                    issue_group: "A".to_string(),
                    name,
                    description,
                    time_published: None,
                    current_step: None,
                    fate: None,
                    document_count: 0,
                    review_count: 0,
                    special_inquisitor_id: None,
                    special_inquisitor_description: None,
                    special_responder_id: None,
                    special_responder_description: None,
                };
                issue.id = issues::insert(&ctx.pool, &issue).await?;
                ctx.stats.added += 1;
                tracing::info!("Added issue: {}", issue.name);
                issue
            }
        };

        sync_issue_categories(ctx, issue_node, issue.id).await?;

        if xml::desc(issue_node, "samantekt").is_some() {
            sync_issue_summary(ctx, parliament.parliament_num, &issue).await?;
        }

        sync_documents(ctx, root, &issue, parliament.parliament_num).await?;
        sync_rapporteurs(ctx, root, &issue, parliament.parliament_num).await?;
        sync_reviews(ctx, root, &issue, parliament.parliament_num, parliament.id).await?;

        // Reload: the document pass maintains counters and the publish date.
        if let Some(reloaded) = issues::find_by_id(&ctx.pool, issue.id).await? {
            issue = reloaded;
        }

        ctx.cache_issue(parliament.parliament_num, 'A', issue.clone());

        for (previous_parliament_num, previous_issue_num) in previously_published {
            let previous =
                sync_issue(ctx, previous_issue_num, Some(previous_parliament_num)).await?;
            if issues::link_previous(&ctx.pool, issue.id, previous.id).await? {
                ctx.stats.updated += 1;
            }
            // Transitive closure over the earlier issue's own chain.
            for more_previous_id in issues::list_previous_ids(&ctx.pool, previous.id).await? {
                if issues::link_previous(&ctx.pool, issue.id, more_previous_id).await? {
                    ctx.stats.updated += 1;
                }
            }
        }

        Ok(issue)
    }
    .boxed()
}

/// Reconcile a group-B (documentless) issue from the name the feed gives
/// alongside the reference.
pub async fn sync_docless_issue(
    ctx: &mut SyncContext,
    issue_num: i64,
    name: &str,
    parliament_num: Option<i64>,
) -> Result<Issue> {
    let parliament = sync_parliament(ctx, parliament_num).await?;

    // Docless issue names carry whitespace baggage in old terms.
    let name = xml::collapse_ws(name);

    if let Some(issue) = ctx.cached_issue(parliament.parliament_num, issue_num, 'B') {
        return Ok(issue.clone());
    }

    let issue = match issues::find_by_num(&ctx.pool, parliament.id, issue_num, "B").await? {
        Some(mut issue) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut issue.name, name, |v| {
                FieldChange::text("name", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have docless issue: {}", issue.name);
            } else {
                issues::update(&ctx.pool, issue.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated docless issue: {}", issue.name);
            }
            issue
        }
        None => {
            let mut issue = Issue {
                id: 0,
                parliament_id: parliament.id,
                issue_num,
                issue_type: String::new(),
                issue_group: "B".to_string(),
                name,
                description: String::new(),
                time_published: None,
                current_step: None,
                fate: None,
                document_count: 0,
                review_count: 0,
                special_inquisitor_id: None,
                special_inquisitor_description: None,
                special_responder_id: None,
                special_responder_description: None,
            };
            issue.id = issues::insert(&ctx.pool, &issue).await?;
            ctx.stats.added += 1;
            tracing::info!("Added docless issue: {}", issue.name);
            issue
        }
    };

    ctx.cache_issue(parliament.parliament_num, 'B', issue.clone());

    Ok(issue)
}

async fn sync_issue_categories(
    ctx: &mut SyncContext,
    issue_node: Node<'_, '_>,
    issue_id: i64,
) -> Result<()> {
    let category_ids: Vec<i64> = xml::desc_all(issue_node, "efnisflokkur")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "id"))
        .collect();

    if category_ids.is_empty() {
        return Ok(());
    }

    sync_categories(ctx).await?;

    for category_xml_id in category_ids {
        let Some(category) = crate::db::categories::find_by_xml_id(&ctx.pool, category_xml_id).await?
        else {
            tracing::warn!("Issue references unknown category {}", category_xml_id);
            continue;
        };
        if issues::link_category(&ctx.pool, issue_id, category.id).await? {
            ctx.stats.updated += 1;
        }
    }

    Ok(())
}

async fn sync_issue_summary(
    ctx: &mut SyncContext,
    parliament_num: i64,
    issue: &Issue,
) -> Result<()> {
    let content = ctx
        .feed
        .fetch_xml(
            FeedUrl::IssueSummary,
            &[parliament_num, issue.issue_num],
            None,
        )
        .await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;
    let root = doc.root_element();

    let purpose = xml::child_text(root, "markmið").unwrap_or_default();
    let change_description = xml::child_text(root, "helstuBreytingar").unwrap_or_default();
    let changes_to_law = xml::child_text(root, "breytingaráLögum").unwrap_or_default();
    let cost_and_revenue = xml::child_text(root, "kostnaðurOgTekjur").unwrap_or_default();
    let other_info = xml::child_text(root, "aðrarUpplýsingar").unwrap_or_default();
    let review_description = xml::child_text(root, "umsagnir").unwrap_or_default();
    let fate = xml::child_text(root, "afgreiðsla").unwrap_or_default();
    let media_coverage = xml::child_text(root, "fjölmiðlaumfjöllun").unwrap_or_default();

    match issues::find_summary(&ctx.pool, issue.id).await? {
        Some(mut summary) => {
            let mut changes = Vec::new();
            diff_field(&mut changes, &mut summary.purpose, purpose, |v| {
                FieldChange::text("purpose", v)
            });
            diff_field(
                &mut changes,
                &mut summary.change_description,
                change_description,
                |v| FieldChange::text("change_description", v),
            );
            diff_field(&mut changes, &mut summary.changes_to_law, changes_to_law, |v| {
                FieldChange::text("changes_to_law", v)
            });
            diff_field(
                &mut changes,
                &mut summary.cost_and_revenue,
                cost_and_revenue,
                |v| FieldChange::text("cost_and_revenue", v),
            );
            diff_field(&mut changes, &mut summary.other_info, other_info, |v| {
                FieldChange::text("other_info", v)
            });
            diff_field(
                &mut changes,
                &mut summary.review_description,
                review_description,
                |v| FieldChange::text("review_description", v),
            );
            diff_field(&mut changes, &mut summary.fate, fate, |v| {
                FieldChange::text("fate", v)
            });
            diff_field(&mut changes, &mut summary.media_coverage, media_coverage, |v| {
                FieldChange::text("media_coverage", v)
            });

            if changes.is_empty() {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have issue summary for issue: {}", issue.name);
            } else {
                issues::update_summary(&ctx.pool, summary.id, &changes).await?;
                ctx.stats.updated += 1;
                tracing::info!("Updated issue summary for issue: {}", issue.name);
            }
        }
        None => {
            let summary = IssueSummary {
                id: 0,
                issue_id: issue.id,
                purpose,
                change_description,
                changes_to_law,
                cost_and_revenue,
                other_info,
                review_description,
                fate,
                media_coverage,
            };
            issues::insert_summary(&ctx.pool, &summary).await?;
            ctx.stats.added += 1;
            tracing::info!("Added issue summary for issue: {}", issue.name);
        }
    }

    Ok(())
}

async fn sync_documents(
    ctx: &mut SyncContext,
    issue_root: Node<'_, '_>,
    issue: &Issue,
    parliament_num: i64,
) -> Result<()> {
    let mut doc_nums = Vec::new();
    let mut lowest_doc_num = 0;

    let stubs = match xml::desc(issue_root, "þingskjöl") {
        Some(container) => xml::desc_all(container, "þingskjal"),
        None => Vec::new(),
    };

    for stub in stubs {
        // The stub listing occasionally bleeds entries from other issues.
        if xml::opt_attr_int(stub, "málsnúmer") != Some(issue.issue_num)
            || xml::opt_attr_int(stub, "þingnúmer") != Some(parliament_num)
        {
            continue;
        }

        let doc_num = xml::req_attr_int(stub, "skjalsnúmer")?;

        let content = ctx
            .feed
            .fetch_xml(FeedUrl::Document, &[parliament_num, doc_num], None)
            .await?;
        let doc_xml = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;
        let doc_node = xml::req_desc(doc_xml.root_element(), "þingskjal")?;

        let doc_type = xml::req_child_text(doc_node, "skjalategund")?;
        let time_published = xml::req_child_datetime(doc_node, "útbýting")?;

        let paths = xml::desc(doc_node, "slóð");
        let path_html = paths.and_then(|p| xml::child_text(p, "html"));
        let path_pdf = paths.and_then(|p| xml::child_text(p, "pdf"));

        if path_html.is_none() && path_pdf.is_none() {
            tracing::debug!("Document not published: {}", doc_num);
            continue;
        }

        doc_nums.push(doc_num);
        if lowest_doc_num == 0 || doc_num < lowest_doc_num {
            lowest_doc_num = doc_num;
        }

        let document = match documents::find_by_num(&ctx.pool, issue.id, doc_num).await? {
            Some(mut document) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut document.doc_type, doc_type, |v| {
                    FieldChange::text("doc_type", v)
                });
                diff_field(
                    &mut changes,
                    &mut document.time_published,
                    time_published,
                    |v| FieldChange::datetime("time_published", Some(v)),
                );
                diff_field(
                    &mut changes,
                    &mut document.html_remote_path,
                    path_html.clone(),
                    |v| FieldChange::text("html_remote_path", v),
                );
                diff_field(
                    &mut changes,
                    &mut document.pdf_remote_path,
                    path_pdf.clone(),
                    |v| FieldChange::text("pdf_remote_path", v),
                );

                // A recorded filename is never re-downloaded.
                if document.html_filename.is_empty() {
                    let filename = maybe_download_document(
                        &ctx.feed,
                        &ctx.settings,
                        document.html_remote_path.as_deref(),
                        parliament_num,
                        issue.issue_num,
                    )
                    .await?;
                    diff_field(&mut changes, &mut document.html_filename, filename, |v| {
                        FieldChange::text("html_filename", v)
                    });
                }
                if document.pdf_filename.is_empty() {
                    let filename = maybe_download_document(
                        &ctx.feed,
                        &ctx.settings,
                        document.pdf_remote_path.as_deref(),
                        parliament_num,
                        issue.issue_num,
                    )
                    .await?;
                    diff_field(&mut changes, &mut document.pdf_filename, filename, |v| {
                        FieldChange::text("pdf_filename", v)
                    });
                }

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have document: {}", doc_num);
                } else {
                    documents::update(&ctx.pool, document.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated document: {}", doc_num);
                }
                document
            }
            None => {
                let html_filename = maybe_download_document(
                    &ctx.feed,
                    &ctx.settings,
                    path_html.as_deref(),
                    parliament_num,
                    issue.issue_num,
                )
                .await?;
                let pdf_filename = maybe_download_document(
                    &ctx.feed,
                    &ctx.settings,
                    path_pdf.as_deref(),
                    parliament_num,
                    issue.issue_num,
                )
                .await?;

                let mut document = Document {
                    id: 0,
                    issue_id: issue.id,
                    doc_num,
                    doc_type,
                    time_published,
                    is_main: false,
                    html_remote_path: path_html,
                    html_filename,
                    pdf_remote_path: path_pdf,
                    pdf_filename,
                };
                document.id = documents::insert(&ctx.pool, &document).await?;
                ctx.stats.added += 1;
                tracing::info!("Added document: {}", doc_num);
                document
            }
        };

        sync_doc_proposers(ctx, doc_node, document.id, parliament_num).await?;
    }

    let deleted = documents::delete_except(&ctx.pool, issue.id, &doc_nums).await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!("Deleted {} non-existent documents of issue {}", deleted, issue.issue_num);
    }

    // The lowest-numbered published document is the issue's main document.
    if lowest_doc_num > 0 {
        if documents::set_main(&ctx.pool, issue.id, lowest_doc_num).await? {
            ctx.stats.updated += 1;
            tracing::info!("Main document determined to be: {}", lowest_doc_num);
        }
        let attached = proposers::attach_main_document_proposers(&ctx.pool, issue.id).await?;
        if attached > 0 {
            ctx.stats.updated += attached;
        }
    } else {
        tracing::debug!("Main document undetermined, no documents yet");
    }

    Ok(())
}

async fn sync_doc_proposers(
    ctx: &mut SyncContext,
    doc_node: Node<'_, '_>,
    document_id: i64,
    parliament_num: i64,
) -> Result<()> {
    for proposer_node in xml::desc_all(doc_node, "flutningsmenn") {
        if let Some(committee_node) = xml::desc(proposer_node, "nefnd") {
            let committee = match xml::opt_attr_int(committee_node, "id") {
                Some(committee_xml_id) => {
                    sync_committee(ctx, committee_xml_id, Some(parliament_num)).await?
                }
                None => {
                    tracing::warn!(
                        "Document proposer committee is missing its id in parliament {}; assuming special committee",
                        parliament_num
                    );
                    committees::find_by_abbreviation_short(
                        &ctx.pool,
                        SPECIAL_COMMITTEE_ABBREVIATION,
                    )
                    .await?
                    .ok_or_else(|| {
                        Error::NotFoundUpstream(
                            "Special committee is not known locally".to_string(),
                        )
                    })?
                }
            };

            let committee_partname = xml::child_text(committee_node, "hluti").unwrap_or_default();

            let parent = match proposers::find_committee_proposer(
                &ctx.pool,
                document_id,
                committee.id,
                &committee_partname,
            )
            .await?
            {
                Some(proposer) => {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have proposer: {}", committee.name);
                    proposer
                }
                None => {
                    let mut proposer = Proposer {
                        id: 0,
                        issue_id: None,
                        document_id: Some(document_id),
                        order_num: None,
                        person_id: None,
                        committee_id: Some(committee.id),
                        committee_partname: Some(committee_partname.clone()),
                        parent_id: None,
                    };
                    proposer.id = proposers::insert(&ctx.pool, &proposer).await?;
                    ctx.stats.added += 1;
                    tracing::info!("Added proposer: {}", committee.name);
                    proposer
                }
            };

            // A committee proposes through named members as sub-proposers.
            for person_node in xml::desc_all(committee_node, "flutningsmaður") {
                let person_xml_id = xml::req_attr_int(person_node, "id")?;
                let order_num = xml::opt_attr_int(person_node, "röð");
                let person = sync_person(ctx, person_xml_id, Some(parliament_num)).await?;

                match proposers::find_subproposer(&ctx.pool, parent.id, person.id).await? {
                    Some(_) => {
                        ctx.stats.unchanged += 1;
                        tracing::debug!("Already have sub-proposer: {}", person.name);
                    }
                    None => {
                        let subproposer = Proposer {
                            id: 0,
                            issue_id: None,
                            document_id: None,
                            order_num,
                            person_id: Some(person.id),
                            committee_id: None,
                            committee_partname: None,
                            parent_id: Some(parent.id),
                        };
                        proposers::insert(&ctx.pool, &subproposer).await?;
                        ctx.stats.added += 1;
                        tracing::info!("Added sub-proposer: {}", person.name);
                    }
                }
            }
        } else {
            for person_node in xml::desc_all(proposer_node, "flutningsmaður") {
                let person_xml_id = xml::req_attr_int(person_node, "id")?;
                let order_num = xml::opt_attr_int(person_node, "röð");
                let person = sync_person(ctx, person_xml_id, Some(parliament_num)).await?;

                match proposers::find_person_proposer(&ctx.pool, document_id, person.id).await? {
                    Some(_) => {
                        ctx.stats.unchanged += 1;
                        tracing::debug!("Already have proposer: {}", person.name);
                    }
                    None => {
                        let proposer = Proposer {
                            id: 0,
                            issue_id: None,
                            document_id: Some(document_id),
                            order_num,
                            person_id: Some(person.id),
                            committee_id: None,
                            committee_partname: None,
                            parent_id: None,
                        };
                        proposers::insert(&ctx.pool, &proposer).await?;
                        ctx.stats.added += 1;
                        tracing::info!("Added proposer: {}", person.name);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn sync_rapporteurs(
    ctx: &mut SyncContext,
    issue_root: Node<'_, '_>,
    issue: &Issue,
    parliament_num: i64,
) -> Result<()> {
    let rapporteur_ids: Vec<i64> = xml::desc_all(issue_root, "framsögumaður")
        .into_iter()
        .filter_map(|n| xml::opt_attr_int(n, "id"))
        .collect();

    let mut surviving_person_ids = Vec::new();

    for person_xml_id in rapporteur_ids {
        let person = sync_person(ctx, person_xml_id, Some(parliament_num)).await?;
        surviving_person_ids.push(person.id);

        match proposers::find_rapporteur(&ctx.pool, issue.id, person.id).await? {
            Some(_) => {
                ctx.stats.unchanged += 1;
                tracing::debug!("Already have rapporteur: {}", person.name);
            }
            None => {
                proposers::insert_rapporteur(&ctx.pool, issue.id, person.id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added rapporteur: {}", person.name);
            }
        }
    }

    let deleted =
        proposers::delete_rapporteurs_except(&ctx.pool, issue.id, &surviving_person_ids).await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!(
            "Deleted {} non-existent rapporteurs of issue {}",
            deleted,
            issue.issue_num
        );
    }

    Ok(())
}

async fn sync_reviews(
    ctx: &mut SyncContext,
    issue_root: Node<'_, '_>,
    issue: &Issue,
    parliament_num: i64,
    parliament_id: i64,
) -> Result<()> {
    let mut log_nums = Vec::new();

    let review_nodes = match xml::desc(issue_root, "erindaskrá") {
        Some(container) => xml::desc_all(container, "erindi"),
        None => Vec::new(),
    };

    for node in review_nodes {
        let log_num = xml::req_attr_int(node, "dagbókarnúmer")?;
        log_nums.push(log_num);

        // A handful of old reviews lack a sender entirely.
        let sender_name = xml::child_text(node, "sendandi")
            .map(|s| xml::collapse_ws(&s))
            .unwrap_or_default();

        let review_type = xml::req_desc(node, "tegunderindis")?
            .attribute("tegund")
            .unwrap_or_default()
            .to_string();
        let date_arrived = xml::opt_child_date(node, "komudagur")?;
        let date_sent = xml::opt_child_date(node, "sendingadagur")?;

        let committee_id = match xml::desc(node, "nefnd").and_then(|n| xml::opt_attr_int(n, "id")) {
            Some(committee_xml_id) => {
                Some(sync_committee(ctx, committee_xml_id, Some(parliament_num)).await?.id)
            }
            None => None,
        };

        // Administrative receipt by the presiding officer instead of a
        // committee.
        let president_seat_id = if committee_id.is_none() && xml::desc(node, "forseti").is_some() {
            seats::find_main_president_seat(&ctx.pool, parliament_id)
                .await?
                .map(|s| s.id)
        } else {
            None
        };

        let path_pdf = xml::desc(node, "slóð").and_then(|p| xml::child_text(p, "pdf"));

        match reviews::find_by_log_num(&ctx.pool, issue.id, log_num).await? {
            Some(mut review) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut review.sender_name, sender_name, |v| {
                    FieldChange::text("sender_name", v)
                });
                diff_field(&mut changes, &mut review.committee_id, committee_id, |v| {
                    FieldChange::int("committee_id", v)
                });
                diff_field(
                    &mut changes,
                    &mut review.president_seat_id,
                    president_seat_id,
                    |v| FieldChange::int("president_seat_id", v),
                );
                diff_field(&mut changes, &mut review.review_type, review_type, |v| {
                    FieldChange::text("review_type", v)
                });
                diff_field(&mut changes, &mut review.date_arrived, date_arrived, |v| {
                    FieldChange::date("date_arrived", v)
                });
                diff_field(&mut changes, &mut review.date_sent, date_sent, |v| {
                    FieldChange::date("date_sent", v)
                });
                diff_field(
                    &mut changes,
                    &mut review.pdf_remote_path,
                    path_pdf.clone(),
                    |v| FieldChange::text("pdf_remote_path", v),
                );

                if review.pdf_filename.is_empty() {
                    let filename = maybe_download_review(
                        &ctx.feed,
                        &ctx.settings,
                        review.pdf_remote_path.as_deref(),
                        parliament_num,
                        issue.issue_num,
                    )
                    .await?;
                    diff_field(&mut changes, &mut review.pdf_filename, filename, |v| {
                        FieldChange::text("pdf_filename", v)
                    });
                }

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have review: {}", review.sender_name);
                } else {
                    reviews::update(&ctx.pool, review.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated review: {}", review.sender_name);
                }
            }
            None => {
                let pdf_filename = maybe_download_review(
                    &ctx.feed,
                    &ctx.settings,
                    path_pdf.as_deref(),
                    parliament_num,
                    issue.issue_num,
                )
                .await?;

                let review = Review {
                    id: 0,
                    issue_id: issue.id,
                    log_num,
                    sender_name,
                    sender_name_description: String::new(),
                    committee_id,
                    president_seat_id,
                    review_type,
                    date_arrived,
                    date_sent,
                    pdf_remote_path: path_pdf,
                    pdf_filename,
                };
                reviews::insert(&ctx.pool, &review).await?;
                ctx.stats.added += 1;
                tracing::info!("Added review: {}", review.sender_name);
            }
        }
    }

    let deleted = reviews::delete_except(&ctx.pool, issue.id, &log_nums).await?;
    if deleted > 0 {
        ctx.stats.deleted += deleted;
        tracing::info!(
            "Deleted {} non-existent reviews of issue {}",
            deleted,
            issue.issue_num
        );
    }

    Ok(())
}
