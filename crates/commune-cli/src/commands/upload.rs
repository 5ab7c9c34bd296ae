use std::path::Path;

use commune_core::upload::{LocalFile, UploadKind};

use crate::commands::common::ClientContext;
use crate::error::CliError;

pub async fn run_upload(
    context: &ClientContext,
    path: &Path,
    document: bool,
) -> Result<(), CliError> {
    let file = LocalFile::from_path(path)?;
    let kind = if document {
        UploadKind::Document
    } else {
        UploadKind::Image
    };

    let url = context.uploads().upload(&file, kind).await?;
    println!("{url}");
    Ok(())
}
