use chrono::{DateTime, Utc};
use commune_core::auth::{AuthSession, AuthUser};
use commune_core::util::normalize_text_option;

use crate::auth::{clear_stored_session, load_stored_session, store_session};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    match command {
        AuthCommands::SetToken {
            profile,
            token,
            expires_at,
            user_id,
            email,
            name,
            role,
        } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let access_token = normalize_text_option(Some(token))
                .ok_or_else(|| CliError::InvalidInput("Token must not be empty".to_string()))?;
            let session = AuthSession {
                access_token,
                expires_at,
                user: AuthUser {
                    id: user_id,
                    name: normalize_text_option(name),
                    email: normalize_text_option(email),
                    role: role.into(),
                },
            };
            if session.is_expired() {
                return Err(CliError::Auth("Token is already expired".to_string()));
            }
            store_session(&profile_name, &session)?;
            println!(
                "Stored session for profile '{profile_name}' ({})",
                describe_user(&session.user)
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            match load_stored_session(&profile_name)? {
                Some(session) if session.is_expired() => {
                    println!("Profile '{profile_name}' has an expired session.");
                }
                Some(session) => println!(
                    "Profile '{profile_name}' is signed in as {} (expires {})",
                    describe_user(&session.user),
                    format_expiry(session.expires_at)
                ),
                None => println!("Profile '{profile_name}' is signed out."),
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            clear_stored_session(&profile_name)?;
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

pub fn describe_user(user: &AuthUser) -> String {
    let label = user
        .email
        .as_deref()
        .or(user.name.as_deref())
        .unwrap_or(user.id.as_str());
    let role = format!("{:?}", user.role).to_lowercase();
    format!("{label}, {role}")
}

pub fn format_expiry(expires_at: Option<i64>) -> String {
    expires_at
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        .map_or_else(
            || "never".to_string(),
            |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
}
