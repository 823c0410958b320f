//! Issue category reconciliation
//!
//! Categories are parliament-agnostic: one global listing of category
//! groups, each holding categories. Issues link to categories during issue
//! reconciliation.

use crate::db::categories::{self, Category};
use crate::feed::FeedUrl;
use crate::sync::SyncContext;
use crate::xml;
use althingi_common::db::fields::{diff_field, FieldChange};
use althingi_common::{Error, Result};

/// Reconcile all category groups and categories.
pub async fn sync_categories(ctx: &mut SyncContext) -> Result<()> {
    if ctx.categories_done() {
        return Ok(());
    }

    let content = ctx.fetch_memo(FeedUrl::CategoriesList, &[]).await?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| Error::Xml(e.to_string()))?;

    for group_node in xml::desc_all(doc.root_element(), "yfirflokkur") {
        let group_xml_id = xml::req_attr_int(group_node, "id")?;
        let group_name = xml::req_child_text(group_node, "heiti")?;

        let group_id = match categories::find_group_by_xml_id(&ctx.pool, group_xml_id).await? {
            Some(mut group) => {
                let mut changes = Vec::new();
                diff_field(&mut changes, &mut group.name, group_name, |v| {
                    FieldChange::text("name", v)
                });

                if changes.is_empty() {
                    ctx.stats.unchanged += 1;
                    tracing::debug!("Already have category group: {}", group.name);
                } else {
                    categories::update_group(&ctx.pool, group.id, &changes).await?;
                    ctx.stats.updated += 1;
                    tracing::info!("Updated category group: {}", group.name);
                }
                group.id
            }
            None => {
                let group_id = categories::insert_group(&ctx.pool, &group_name, group_xml_id).await?;
                ctx.stats.added += 1;
                tracing::info!("Added category group: {}", group_name);
                group_id
            }
        };

        // Children only: a group's categories never appear under another
        // group, so plain child iteration suffices.
        for node in xml::desc_all(group_node, "efnisflokkur") {
            let category_xml_id = xml::req_attr_int(node, "id")?;
            let name = xml::req_child_text(node, "heiti")?;
            let description = xml::child_text(node, "lýsing").unwrap_or_default();

            match categories::find_by_xml_id(&ctx.pool, category_xml_id).await? {
                Some(mut category) => {
                    let mut changes = Vec::new();
                    diff_field(&mut changes, &mut category.name, name, |v| {
                        FieldChange::text("name", v)
                    });
                    diff_field(&mut changes, &mut category.description, description, |v| {
                        FieldChange::text("description", v)
                    });
                    diff_field(&mut changes, &mut category.category_group_id, group_id, |v| {
                        FieldChange::int("category_group_id", v)
                    });

                    if changes.is_empty() {
                        ctx.stats.unchanged += 1;
                        tracing::debug!("Already have category: {}", category.name);
                    } else {
                        categories::update(&ctx.pool, category.id, &changes).await?;
                        ctx.stats.updated += 1;
                        tracing::info!("Updated category: {}", category.name);
                    }
                }
                None => {
                    let category = Category {
                        id: 0,
                        category_group_id: group_id,
                        name,
                        description,
                        category_xml_id,
                    };
                    categories::insert(&ctx.pool, &category).await?;
                    ctx.stats.added += 1;
                    tracing::info!("Added category: {}", category.name);
                }
            }
        }
    }

    Ok(())
}
