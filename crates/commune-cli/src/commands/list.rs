use commune_core::api::HttpTransport;
use commune_core::fallback::{demo_news, demo_slides};
use commune_core::models::{Resource, ResourceKind};
use commune_core::normalize::Pagination;
use commune_core::{DataOrigin, ListQuery, Snapshot, SyncedResource};
use serde::Serialize;
use serde_json::Value;

use crate::commands::common::{item_id, item_label, item_status, print_json, ClientContext};
use crate::commands::dispatch_resource;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub resource: ResourceKind,
    pub origin: DataOrigin,
    pub pagination: Pagination,
    pub items: Vec<Value>,
}

impl ListOutput {
    pub fn from_snapshot<R: Resource>(snapshot: &Snapshot<R>) -> Result<Self, CliError> {
        let items = snapshot
            .items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            resource: R::KIND,
            origin: snapshot.origin,
            pagination: snapshot.pagination,
            items,
        })
    }
}

pub async fn run_list(
    context: &ClientContext,
    kind: ResourceKind,
    query: ListQuery,
    json: bool,
) -> Result<(), CliError> {
    let output = dispatch_resource!(kind, list_snapshot(context, query))?;
    if json {
        print_json(&output)
    } else {
        print!("{}", render_table(&output));
        Ok(())
    }
}

async fn list_snapshot<R: Resource>(
    context: &ClientContext,
    query: ListQuery,
) -> Result<ListOutput, CliError> {
    let resource = context.resource::<R>();
    // Public collections have demonstration data for when the backend is down.
    let resource = match R::KIND {
        ResourceKind::News => with_demo(resource, demo_news())?,
        ResourceKind::Slides => with_demo(resource, demo_slides())?,
        _ => resource,
    };
    let snapshot = resource.list(query).await?;
    ListOutput::from_snapshot(&snapshot)
}

/// Attach demo items after converting them to `R` through JSON.
fn with_demo<R: Resource, D: Serialize>(
    resource: SyncedResource<R, HttpTransport>,
    demo: Vec<D>,
) -> Result<SyncedResource<R, HttpTransport>, CliError> {
    let items = serde_json::from_value::<Vec<R>>(serde_json::to_value(demo)?)?;
    Ok(resource.with_fallback(items))
}

pub fn render_table(output: &ListOutput) -> String {
    use std::fmt::Write as _;

    let mut rendered = String::new();
    if output.items.is_empty() {
        rendered.push_str("No items found.\n");
        return rendered;
    }

    let id_width = output
        .items
        .iter()
        .map(|item| item_id(item).chars().count())
        .max()
        .unwrap_or(2)
        .max(2);
    for item in &output.items {
        let _ = writeln!(
            rendered,
            "{:<id_width$}  {:<10}  {}",
            item_id(item),
            item_status(item),
            item_label(item),
        );
    }

    let pagination = &output.pagination;
    let _ = writeln!(
        rendered,
        "page {}/{} ({} total)",
        pagination.page,
        pagination.pages.max(1),
        pagination.total
    );
    if output.origin == DataOrigin::Fallback {
        rendered.push_str("Showing demonstration data; the portal API is unavailable.\n");
    }
    rendered
}
