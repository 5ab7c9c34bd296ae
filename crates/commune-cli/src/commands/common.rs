use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use commune_core::api::{ApiClient, HttpTransport};
use commune_core::auth::AuthGate;
use commune_core::config::ClientConfig;
use commune_core::events::{AppEvent, EventBus, NoticeLevel};
use commune_core::models::{Resource, ResourceKind};
use commune_core::upload::UploadCoordinator;
use commune_core::SyncedResource;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::auth::KeyringSessionStore;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub profile: Option<String>,
    pub config_path: Option<PathBuf>,
}

/// Effective client configuration: file, then profile, then environment.
pub fn resolve_client_config(
    options: &GlobalOptions,
    profile_override: Option<&str>,
) -> Result<(String, ClientConfig), CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name =
        profiles.resolve_profile_name(profile_override.or(options.profile.as_deref()));
    let base = options
        .config_path
        .as_deref()
        .map(ClientConfig::load_from_path)
        .unwrap_or_default();
    let config = match profiles.profile(&profile_name) {
        Some(profile) => profile.apply_to(base),
        None => base,
    }
    .with_env_overrides();
    Ok((profile_name, config))
}

/// Everything a networked command needs for one invocation.
pub struct ClientContext {
    pub profile_name: String,
    pub config: ClientConfig,
    api: Arc<ApiClient<HttpTransport>>,
    events: broadcast::Receiver<AppEvent>,
}

impl ClientContext {
    pub fn open(options: &GlobalOptions) -> Result<Self, CliError> {
        let (profile_name, config) = resolve_client_config(options, None)?;

        let bus = EventBus::default();
        let events = bus.subscribe();
        let gate = Arc::new(AuthGate::new(
            Arc::new(KeyringSessionStore::new(&profile_name)),
            bus,
            &config,
        ));
        if gate.restore()?.is_none() {
            tracing::debug!(profile = %profile_name, "No stored session; requests are anonymous");
        }

        let transport = HttpTransport::from_config(&config).map_err(CliError::Config)?;
        let api = Arc::new(
            ApiClient::new(transport, gate)
                .with_generic_error_message(config.generic_error_message.clone()),
        );

        Ok(Self {
            profile_name,
            config,
            api,
            events,
        })
    }

    pub fn resource<R: Resource>(&self) -> SyncedResource<R, HttpTransport> {
        SyncedResource::new(Arc::clone(&self.api)).with_retry_policy(self.config.read_retry_policy())
    }

    pub fn uploads(&self) -> UploadCoordinator<HttpTransport> {
        UploadCoordinator::new(Arc::clone(&self.api))
    }

    /// Print pending notices to stderr. Error notices are skipped because the
    /// failing command returns the error itself.
    pub fn finish(mut self) {
        let session_ended = self.api.gate().session_ended();
        loop {
            match self.events.try_recv() {
                Ok(AppEvent::Notice(notice)) => match notice.level {
                    NoticeLevel::Success | NoticeLevel::Info => eprintln!("{}", notice.message),
                    NoticeLevel::Warning if !session_ended => {
                        eprintln!("Warning: {}", notice.message);
                    }
                    NoticeLevel::Warning | NoticeLevel::Error => {}
                },
                Ok(event) => tracing::debug!(?event, "Event"),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dropped lagging events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if session_ended {
            eprintln!(
                "Session ended for profile '{}'. Sign in again ({}) and run `commune auth set-token`.",
                self.profile_name, self.config.login_route
            );
        }
    }
}

/// Read a JSON argument; `-` reads the whole of stdin.
pub fn read_json_argument(raw: Option<&str>) -> Result<Value, CliError> {
    let text = match raw {
        Some("-") => read_stdin()?,
        Some(text) => text.to_string(),
        None if !io::stdin().is_terminal() => read_stdin()?,
        None => {
            return Err(CliError::InvalidInput(
                "Provide a payload with --data '<json>' or --data - to read stdin".to_string(),
            ))
        }
    };
    parse_json_payload(&text)
}

pub fn parse_json_payload(text: &str) -> Result<Value, CliError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidInput("JSON payload is empty".to_string()));
    }
    serde_json::from_str(trimmed)
        .map_err(|error| CliError::InvalidInput(format!("JSON payload is invalid: {error}")))
}

fn read_stdin() -> Result<String, CliError> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Ask a yes/no question on the terminal; anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, CliError> {
    if assume_yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::ConfirmationRequired);
    }

    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "o" | "oui")
}

/// Payload field that receives an uploaded URL when `--field` is omitted.
pub const fn default_attachment_field(kind: ResourceKind, document: bool) -> &'static str {
    match (kind, document) {
        (_, true) => "document_url",
        (ResourceKind::Personalities, false) => "photo_url",
        (_, false) => "image_url",
    }
}

/// One-line label for table output.
pub fn item_label(item: &Value) -> String {
    const LABEL_FIELDS: [&str; 5] = ["title", "name", "content", "email", "role"];

    let label = LABEL_FIELDS
        .iter()
        .filter_map(|field| item.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or("");
    truncate_chars(&label.replace(['\n', '\r'], " "), 60)
}

pub fn item_status(item: &Value) -> &str {
    item.get("status").and_then(Value::as_str).unwrap_or("-")
}

pub fn item_id(item: &Value) -> String {
    match item.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "-".to_string(),
    }
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

pub fn print_json<S: serde::Serialize>(value: &S) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
