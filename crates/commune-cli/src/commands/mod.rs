pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod list;
pub mod mutate;
pub mod show;
pub mod status;
pub mod store;
pub mod upload;

/// Run a generic async command with the model type matching a [`ResourceKind`].
///
/// [`ResourceKind`]: commune_core::models::ResourceKind
macro_rules! dispatch_resource {
    ($kind:expr, $run:ident($($arg:expr),* $(,)?)) => {{
        use commune_core::models::{
            CatalogueItem, Comment, News, Personality, Post, ResourceKind, Slide, User,
        };
        match $kind {
            ResourceKind::News => $run::<News>($($arg),*).await,
            ResourceKind::Slides => $run::<Slide>($($arg),*).await,
            ResourceKind::Catalogue => $run::<CatalogueItem>($($arg),*).await,
            ResourceKind::Personalities => $run::<Personality>($($arg),*).await,
            ResourceKind::Users => $run::<User>($($arg),*).await,
            ResourceKind::Posts => $run::<Post>($($arg),*).await,
            ResourceKind::Comments => $run::<Comment>($($arg),*).await,
        }
    }};
}

pub(crate) use dispatch_resource;
