use std::path::PathBuf;

use clap::Parser;
use commune_core::auth::AuthUser;
use commune_core::fallback::demo_news;
use commune_core::models::{ModerationStatus, PublishStatus, ResourceKind, UserRole};
use commune_core::normalize::Pagination;
use commune_core::store::{LocalStore, MayorData, StoreBackend, MAYOR_DATA};
use commune_core::{DataOrigin, ListQuery, Snapshot};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{Cli, Commands, CompletionShell, PayloadArgs};
use crate::commands::auth_cmd::{describe_user, format_expiry};
use crate::commands::common::{
    default_attachment_field, is_affirmative, item_id, item_label, item_status, parse_json_payload,
    truncate_chars,
};
use crate::commands::completions::{render_completions, run_completions};
use crate::commands::config::{normalize_api_url, normalize_login_route};
use crate::commands::list::{render_table, ListOutput};
use crate::commands::mutate::load_attachment;
use crate::commands::show::render_fields;
use crate::commands::status::parse_status;
use crate::commands::store::{known_key, render_entry};
use crate::error::CliError;
use crate::{build_query, parse_id};

#[test]
fn list_command_parses_resource_aliases_and_filters() {
    let cli = Cli::try_parse_from([
        "commune", "list", "post", "--status", "pending", "--page", "2", "--json",
    ])
    .unwrap();

    let Commands::List {
        resource,
        status,
        page,
        json,
        ..
    } = cli.command
    else {
        panic!("expected list command");
    };
    assert_eq!(resource, ResourceKind::Posts);
    assert_eq!(status.as_deref(), Some("pending"));
    assert_eq!(page, Some(2));
    assert!(json);
}

#[test]
fn unknown_resource_is_rejected_by_the_parser() {
    assert!(Cli::try_parse_from(["commune", "list", "events"]).is_err());
}

#[test]
fn attachment_field_requires_an_attachment() {
    assert!(Cli::try_parse_from([
        "commune", "create", "news", "--data", "{}", "--field", "image_url"
    ])
    .is_err());
}

#[test]
fn global_profile_flag_is_accepted_after_subcommand() {
    let cli = Cli::try_parse_from(["commune", "show", "news", "7", "--profile", "staging"]).unwrap();
    assert_eq!(cli.profile.as_deref(), Some("staging"));
}

#[test]
fn build_query_drops_blank_filters() {
    let query = build_query(
        Some("  fête ".to_string()),
        Some(" ".to_string()),
        None,
        Some(1),
        Some(20),
    );
    assert_eq!(
        query,
        ListQuery::new().search("fête").page(1).limit(20)
    );
}

#[test]
fn parse_id_rejects_blank_identifiers() {
    assert_eq!(parse_id(" 42 ").unwrap().as_str(), "42");
    assert!(matches!(parse_id("  "), Err(CliError::InvalidInput(_))));
}

#[test]
fn json_payload_must_be_present_and_valid() {
    assert_eq!(
        parse_json_payload(r#" {"title": "Marché"} "#).unwrap(),
        json!({"title": "Marché"})
    );
    assert!(matches!(
        parse_json_payload("   "),
        Err(CliError::InvalidInput(_))
    ));
    assert!(matches!(
        parse_json_payload("{title:"),
        Err(CliError::InvalidInput(_))
    ));
}

#[test]
fn confirmation_accepts_english_and_french() {
    assert!(is_affirmative("y\n"));
    assert!(is_affirmative(" Oui "));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("no"));
}

#[test]
fn attachment_field_defaults_per_resource() {
    assert_eq!(
        default_attachment_field(ResourceKind::News, false),
        "image_url"
    );
    assert_eq!(
        default_attachment_field(ResourceKind::Personalities, false),
        "photo_url"
    );
    assert_eq!(
        default_attachment_field(ResourceKind::Catalogue, true),
        "document_url"
    );
}

#[test]
fn load_attachment_reads_file_and_applies_default_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliberation.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let payload = PayloadArgs {
        attach: Some(path),
        document: true,
        ..PayloadArgs::default()
    };
    let attachment = load_attachment(ResourceKind::Catalogue, &payload)
        .unwrap()
        .unwrap();
    assert_eq!(attachment.field, "document_url");
    assert_eq!(attachment.file.mime_type(), "application/pdf");

    assert!(load_attachment(ResourceKind::News, &PayloadArgs::default())
        .unwrap()
        .is_none());
}

#[test]
fn missing_attachment_file_is_an_error() {
    let payload = PayloadArgs {
        attach: Some(PathBuf::from("/definitely/missing/photo.png")),
        ..PayloadArgs::default()
    };
    assert!(load_attachment(ResourceKind::News, &payload).is_err());
}

#[test]
fn item_label_prefers_title_then_name() {
    assert_eq!(
        item_label(&json!({"title": "Conseil municipal", "name": "ignored"})),
        "Conseil municipal"
    );
    assert_eq!(item_label(&json!({"title": " ", "name": "Jeanne"})), "Jeanne");
    assert_eq!(item_label(&json!({"content": "ligne 1\nligne 2"})), "ligne 1 ligne 2");
    assert_eq!(item_label(&json!({})), "");
}

#[test]
fn item_id_and_status_tolerate_missing_fields() {
    assert_eq!(item_id(&json!({"id": 12})), "12");
    assert_eq!(item_id(&json!({"id": "abc"})), "abc");
    assert_eq!(item_id(&json!({})), "-");
    assert_eq!(item_status(&json!({"status": "blocked"})), "blocked");
    assert_eq!(item_status(&json!({})), "-");
}

#[test]
fn truncate_chars_counts_characters_not_bytes() {
    assert_eq!(truncate_chars("été", 3), "été");
    assert_eq!(truncate_chars("abcdefgh", 6), "abc...");
}

#[test]
fn fallback_listing_is_labelled_in_table_output() {
    let snapshot = Snapshot {
        items: demo_news(),
        pagination: Pagination::single_page(3),
        origin: DataOrigin::Fallback,
        query: ListQuery::new(),
    };
    let output = ListOutput::from_snapshot(&snapshot).unwrap();
    let rendered = render_table(&output);

    assert_eq!(output.items.len(), 3);
    assert!(rendered.contains("page 1/1 (3 total)"));
    assert!(rendered.contains("demonstration data"));
}

#[test]
fn empty_listing_renders_placeholder() {
    let snapshot = Snapshot::<commune_core::models::News> {
        items: Vec::new(),
        pagination: Pagination::default(),
        origin: DataOrigin::Live,
        query: ListQuery::new(),
    };
    let output = ListOutput::from_snapshot(&snapshot).unwrap();
    assert_eq!(render_table(&output), "No items found.\n");
}

#[test]
fn render_fields_skips_nulls_and_aligns_keys() {
    let rendered = render_fields(&json!({"id": 3, "title": "Marché", "excerpt": null}));
    assert_eq!(rendered, "id     3\ntitle  Marché\n");
}

#[test]
fn status_arguments_parse_case_insensitively() {
    assert_eq!(
        parse_status::<ModerationStatus>(" Published ").unwrap(),
        ModerationStatus::Published
    );
    assert_eq!(
        parse_status::<PublishStatus>("archived").unwrap(),
        PublishStatus::Archived
    );
    assert!(matches!(
        parse_status::<ModerationStatus>("deleted"),
        Err(CliError::InvalidInput(_))
    ));
}

#[test]
fn store_keys_are_restricted_to_known_entries() {
    assert_eq!(known_key(" maire_data ").unwrap(), "maire_data");
    assert!(matches!(
        known_key("session"),
        Err(CliError::UnknownStoreKey(_))
    ));
}

#[test]
fn render_entry_reports_absent_and_malformed_entries() {
    let store = LocalStore::in_memory();
    assert_eq!(
        render_entry(&store, "maire_data").unwrap(),
        "No entry stored for 'maire_data'.\n"
    );

    store
        .set(
            MAYOR_DATA,
            &MayorData {
                name: "Jeanne Martin".to_string(),
                ..MayorData::default()
            },
        )
        .unwrap();
    assert!(render_entry(&store, "maire_data")
        .unwrap()
        .contains("\"name\": \"Jeanne Martin\""));

    store.backend().write_raw("mainHomeContent", "{oops").unwrap();
    assert!(render_entry(&store, "mainHomeContent")
        .unwrap()
        .contains("is malformed"));
}

#[test]
fn api_url_must_be_http() {
    assert_eq!(
        normalize_api_url(Some(" https://mairie.example/ ".to_string())).unwrap(),
        Some("https://mairie.example".to_string())
    );
    assert_eq!(normalize_api_url(Some("  ".to_string())).unwrap(), None);
    assert!(normalize_api_url(Some("mairie.example".to_string())).is_err());
}

#[test]
fn login_route_must_be_absolute() {
    assert_eq!(
        normalize_login_route(Some("/connexion".to_string())).unwrap(),
        Some("/connexion".to_string())
    );
    assert!(normalize_login_route(Some("login".to_string())).is_err());
}

#[test]
fn describe_user_prefers_email() {
    let user = AuthUser {
        id: "9".to_string(),
        name: Some("Claire".to_string()),
        email: Some("claire@mairie.example".to_string()),
        role: UserRole::Moderator,
    };
    assert_eq!(describe_user(&user), "claire@mairie.example, moderator");
}

#[test]
fn format_expiry_handles_missing_values() {
    assert_eq!(format_expiry(None), "never");
    assert_eq!(format_expiry(Some(0)), "1970-01-01 00:00 UTC");
}

#[test]
fn completions_are_written_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commune.bash");

    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    assert!(script.contains("commune"));
}

#[test]
fn zsh_completions_target_the_commune_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Zsh)).unwrap();
    assert!(script.starts_with("#compdef commune"));
}
