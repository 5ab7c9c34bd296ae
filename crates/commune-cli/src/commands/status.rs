use commune_core::models::{
    Comment, ItemId, Moderated, News, Post, ResourceKind, StatusTransitions, User,
};
use serde_json::Value;

use crate::commands::common::{print_json, ClientContext};
use crate::error::CliError;

pub async fn run_status(
    context: &ClientContext,
    kind: ResourceKind,
    id: &ItemId,
    status: &str,
) -> Result<(), CliError> {
    let updated = match kind {
        ResourceKind::News => set_status::<News>(context, id, status).await?,
        ResourceKind::Users => set_status::<User>(context, id, status).await?,
        ResourceKind::Posts => set_status::<Post>(context, id, status).await?,
        ResourceKind::Comments => set_status::<Comment>(context, id, status).await?,
        ResourceKind::Slides | ResourceKind::Catalogue | ResourceKind::Personalities => {
            return Err(CliError::NotModerated(kind));
        }
    };
    print_json(&updated)
}

async fn set_status<R: Moderated>(
    context: &ClientContext,
    id: &ItemId,
    status: &str,
) -> Result<Value, CliError> {
    let next = parse_status::<R::Status>(status)?;
    let updated = context.resource::<R>().set_status(id, next).await?;
    Ok(serde_json::to_value(updated)?)
}

pub fn parse_status<S: StatusTransitions>(raw: &str) -> Result<S, CliError> {
    let normalized = raw.trim().to_ascii_lowercase();
    serde_json::from_value(Value::String(normalized))
        .map_err(|_| CliError::InvalidInput(format!("Unknown status '{}'", raw.trim())))
}
