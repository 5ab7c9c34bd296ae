use commune_core::models::{ItemId, Resource, ResourceKind};

use crate::commands::common::{confirm, item_label, ClientContext};
use crate::commands::dispatch_resource;
use crate::error::CliError;

pub async fn run_delete(
    context: &ClientContext,
    kind: ResourceKind,
    id: &ItemId,
    assume_yes: bool,
) -> Result<(), CliError> {
    dispatch_resource!(kind, delete_item(context, id, assume_yes))
}

async fn delete_item<R: Resource>(
    context: &ClientContext,
    id: &ItemId,
    assume_yes: bool,
) -> Result<(), CliError> {
    let resource = context.resource::<R>();
    let item = serde_json::to_value(resource.fetch(id).await?)?;
    let removal = resource.request_removal(id)?;

    let label = item_label(&item);
    let prompt = if label.is_empty() {
        format!("Delete {} {id}?", R::KIND)
    } else {
        format!("Delete {} {id} ({label})?", R::KIND)
    };
    if !confirm(&prompt, assume_yes)? {
        removal.cancel();
        eprintln!("Cancelled.");
        return Ok(());
    }

    removal.confirm().await?;
    println!("{id}");
    Ok(())
}
