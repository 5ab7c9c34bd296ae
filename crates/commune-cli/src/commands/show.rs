use commune_core::models::{ItemId, Resource, ResourceKind};
use serde_json::Value;

use crate::commands::common::{print_json, ClientContext};
use crate::commands::dispatch_resource;
use crate::error::CliError;

pub async fn run_show(
    context: &ClientContext,
    kind: ResourceKind,
    id: &ItemId,
    json: bool,
) -> Result<(), CliError> {
    let item = dispatch_resource!(kind, fetch_item(context, id))?;
    if json {
        print_json(&item)
    } else {
        print!("{}", render_fields(&item));
        Ok(())
    }
}

async fn fetch_item<R: Resource>(context: &ClientContext, id: &ItemId) -> Result<Value, CliError> {
    let item = context.resource::<R>().fetch(id).await?;
    Ok(serde_json::to_value(item)?)
}

/// `key: value` lines for the top-level fields of an item; nulls are skipped.
pub fn render_fields(item: &Value) -> String {
    let Value::Object(fields) = item else {
        return format!("{item}\n");
    };

    let present: Vec<_> = fields.iter().filter(|(_, value)| !value.is_null()).collect();
    let width = present.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    present
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            format!("{key:<width$}  {rendered}\n")
        })
        .collect()
}
