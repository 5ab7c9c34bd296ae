use std::path::PathBuf;

use commune_core::util::{is_http_url, normalize_text_option};
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::{print_json, resolve_client_config, GlobalOptions};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_url,
            login_route,
            store_dir,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(options.profile.as_deref()),
            api_url,
            login_route,
            store_dir,
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(options, profile.as_deref()),
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    profile_name: Option<&str>,
    api_url: Option<String>,
    login_route: Option<String>,
    store_dir: Option<PathBuf>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let api_url = normalize_api_url(api_url)?;
    let login_route = normalize_login_route(login_route)?;

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = api_url {
        profile.api_base_url = Some(url);
    }
    if let Some(route) = login_route {
        profile.login_route = Some(route);
    }
    if let Some(dir) = store_dir {
        profile.store_dir = Some(dir);
    }
    if profile.api_base_url.is_none() {
        tracing::warn!(profile = %profile_name, "Profile has no API base URL yet");
    }

    if !no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved profile '{profile_name}' to {}", path.display());
    Ok(())
}

pub fn normalize_api_url(value: Option<String>) -> Result<Option<String>, CliError> {
    let Some(url) = normalize_text_option(value) else {
        return Ok(None);
    };
    if !is_http_url(&url) {
        return Err(CliError::Config(format!(
            "API URL must start with http:// or https://: {url}"
        )));
    }
    Ok(Some(url.trim_end_matches('/').to_string()))
}

pub fn normalize_login_route(value: Option<String>) -> Result<Option<String>, CliError> {
    let Some(route) = normalize_text_option(value) else {
        return Ok(None);
    };
    if !route.starts_with('/') {
        return Err(CliError::Config(format!(
            "Login route must be an absolute path: {route}"
        )));
    }
    Ok(Some(route))
}

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    profile: String,
    api_base_url: Option<String>,
    login_route: String,
    store_dir: PathBuf,
    read_retry_delays_ms: Vec<u64>,
    redirect_delay_ms: u64,
    request_timeout_secs: u64,
}

fn run_config_show(options: &GlobalOptions, profile: Option<&str>) -> Result<(), CliError> {
    let (profile, config) = resolve_client_config(options, profile)?;
    print_json(&EffectiveConfig {
        profile,
        api_base_url: config.api_base_url().ok(),
        store_dir: config.resolved_store_dir(),
        login_route: config.login_route,
        read_retry_delays_ms: config.read_retry_delays_ms,
        redirect_delay_ms: config.redirect_delay_ms,
        request_timeout_secs: config.request_timeout_secs,
    })
}
