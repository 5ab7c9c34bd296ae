use commune_core::store::{LocalStore, StoreBackend, KNOWN_KEYS};
use serde_json::Value;

use crate::cli::StoreCommands;
use crate::commands::common::{confirm, resolve_client_config, GlobalOptions};
use crate::error::CliError;

pub fn run_store(command: StoreCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let (_, config) = resolve_client_config(options, None)?;
    let store = LocalStore::open(config.resolved_store_dir());

    match command {
        StoreCommands::Show { key } => {
            print!("{}", render_entry(&store, &key)?);
            Ok(())
        }
        StoreCommands::Clear { key, yes } => {
            let key = known_key(&key)?;
            if !confirm(&format!("Remove local entry '{key}'?"), yes)? {
                eprintln!("Cancelled.");
                return Ok(());
            }
            store.remove_named(key)?;
            println!("{key}");
            Ok(())
        }
    }
}

pub fn known_key(key: &str) -> Result<&'static str, CliError> {
    let key = key.trim();
    KNOWN_KEYS
        .iter()
        .copied()
        .find(|known| *known == key)
        .ok_or_else(|| CliError::UnknownStoreKey(key.to_string()))
}

/// Pretty JSON for a stored entry, or a note when it is absent or malformed.
pub fn render_entry<B: StoreBackend>(store: &LocalStore<B>, key: &str) -> Result<String, CliError> {
    let key = known_key(key)?;
    let Some(raw) = store.raw(key)? else {
        return Ok(format!("No entry stored for '{key}'.\n"));
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Ok(format!("{}\n", serde_json::to_string_pretty(&value)?)),
        Err(error) => Ok(format!(
            "Entry '{key}' is malformed ({error}); readers use defaults.\n"
        )),
    }
}
