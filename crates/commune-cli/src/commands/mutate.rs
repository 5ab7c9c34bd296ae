use commune_core::models::{FieldPatch, ItemId, Resource, ResourceKind};
use commune_core::upload::{Attachment, LocalFile};
use commune_core::SyncError;
use serde_json::{Map, Value};

use crate::cli::PayloadArgs;
use crate::commands::common::{
    default_attachment_field, print_json, read_json_argument, ClientContext,
};
use crate::commands::dispatch_resource;
use crate::error::CliError;

pub async fn run_create(
    context: &ClientContext,
    kind: ResourceKind,
    payload: &PayloadArgs,
) -> Result<(), CliError> {
    let data = read_json_argument(payload.data.as_deref())?;
    let attachment = load_attachment(kind, payload)?;
    let created = dispatch_resource!(kind, create_item(context, data, attachment.as_ref()))?;
    print_json(&created)
}

pub async fn run_update(
    context: &ClientContext,
    kind: ResourceKind,
    id: &ItemId,
    payload: &PayloadArgs,
) -> Result<(), CliError> {
    let data = if payload.data.is_none() && payload.attach.is_some() {
        Value::Object(Map::new())
    } else {
        read_json_argument(payload.data.as_deref())?
    };
    let patch = FieldPatch::from_value(data).map_err(SyncError::from)?;
    let attachment = load_attachment(kind, payload)?;
    let updated = dispatch_resource!(kind, update_item(context, id, &patch, attachment.as_ref()))?;
    print_json(&updated)
}

async fn create_item<R: Resource>(
    context: &ClientContext,
    data: Value,
    attachment: Option<&Attachment>,
) -> Result<Value, CliError> {
    let draft: R::Draft = serde_json::from_value(data).map_err(|error| {
        CliError::InvalidInput(format!("Invalid {} payload: {error}", R::KIND))
    })?;

    let resource = context.resource::<R>();
    let created = match attachment {
        Some(attachment) => resource.create_with_attachment(&draft, attachment).await?,
        None => resource.create(&draft).await?,
    };
    Ok(serde_json::to_value(created)?)
}

async fn update_item<R: Resource>(
    context: &ClientContext,
    id: &ItemId,
    patch: &FieldPatch,
    attachment: Option<&Attachment>,
) -> Result<Value, CliError> {
    let resource = context.resource::<R>();
    let updated = match attachment {
        Some(attachment) => resource.update_with_attachment(id, patch, attachment).await?,
        None => resource.update(id, patch).await?,
    };
    Ok(serde_json::to_value(updated)?)
}

pub fn load_attachment(
    kind: ResourceKind,
    payload: &PayloadArgs,
) -> Result<Option<Attachment>, CliError> {
    let Some(path) = payload.attach.as_deref() else {
        return Ok(None);
    };

    let file = LocalFile::from_path(path)?;
    let field = payload
        .field
        .clone()
        .unwrap_or_else(|| default_attachment_field(kind, payload.document).to_string());
    tracing::debug!(file = file.file_name(), %field, "Attachment staged");

    Ok(Some(if payload.document {
        Attachment::document(file, field)
    } else {
        Attachment::image(file, field)
    }))
}
