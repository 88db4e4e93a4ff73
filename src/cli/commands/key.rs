use clap::Subcommand;

use crate::cli::commands::switch::prompt_secret;
use crate::cli::ui::{create_table, highlight, info, success};
use crate::context::SwitchContext;
use crate::error::AppError;
use crate::profile::ProfileStore;
use crate::services::mask_secret;

#[derive(Subcommand)]
pub enum KeyCommand {
    /// List saved keys
    List,
    /// Save a key under a name (overwriting asks for confirmation)
    Add {
        /// Name of the key
        name: String,
        /// Secret value (prompted when omitted)
        #[arg(long)]
        secret: Option<String>,
        /// Overwrite without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete a saved key
    Delete {
        /// Name of the key
        name: String,
        /// Delete without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Select the key used by `switch zai`
    Select {
        /// Name of the key
        name: String,
    },
    /// Show a saved key (masked)
    Show {
        /// Name of the key
        name: String,
    },
}

pub fn execute(cmd: KeyCommand, ctx: &SwitchContext) -> Result<(), AppError> {
    let mut store = ctx.profiles();

    match cmd {
        KeyCommand::List => list_keys(&store),
        KeyCommand::Add { name, secret, yes } => add_key(&mut store, &name, secret, yes),
        KeyCommand::Delete { name, yes } => delete_key(&mut store, &name, yes),
        KeyCommand::Select { name } => {
            store.set_current(Some(&name))?;
            println!("{}", success(&format!("✓ Selected key '{name}'")));
            Ok(())
        }
        KeyCommand::Show { name } => {
            let secret = store.get(&name)?;
            println!("{}: {}", highlight(&name), mask_secret(secret));
            Ok(())
        }
    }
}

pub fn list_keys(store: &ProfileStore) -> Result<(), AppError> {
    let names = store.list();
    if names.is_empty() {
        println!("{}", info("No saved keys."));
        println!("Use 'ez-switch key add <name>' to save one.");
        return Ok(());
    }

    let current = store.current();
    let mut table = create_table();
    table.set_header(vec!["", "Name", "Key"]);
    for name in names {
        let marker = if current == Some(name.as_str()) { "✓" } else { "" };
        let masked = store.get(&name).map(mask_secret).unwrap_or_default();
        table.add_row(vec![marker.to_string(), name, masked]);
    }
    println!("{table}");
    Ok(())
}

pub fn add_key(
    store: &mut ProfileStore,
    name: &str,
    secret: Option<String>,
    yes: bool,
) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("key name is required".into()));
    }
    if store.contains(name) && !yes && !confirm(&format!("Key '{name}' already exists. Overwrite?"))? {
        println!("{}", info("Cancelled."));
        return Ok(());
    }

    let secret = match secret {
        Some(s) => s,
        None => prompt_secret(&format!("Secret for '{name}':"))?,
    };
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(AppError::Validation("key secret is required".into()));
    }
    store.put(name, secret)?;
    store.set_current(Some(name))?;
    println!("{}", success(&format!("✓ Saved key '{name}'")));
    Ok(())
}

pub fn delete_key(store: &mut ProfileStore, name: &str, yes: bool) -> Result<(), AppError> {
    store.get(name)?;
    if !yes && !confirm(&format!("Are you sure you want to delete key '{name}'?"))? {
        println!("{}", info("Cancelled."));
        return Ok(());
    }
    store.delete(name)?;
    println!("{}", success(&format!("✓ Deleted key '{name}'")));
    Ok(())
}

fn confirm(message: &str) -> Result<bool, AppError> {
    inquire::Confirm::new(message)
        .with_default(false)
        .prompt()
        .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppPaths;
    use tempfile::TempDir;

    #[test]
    fn add_key_trims_user_input_before_saving() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = ProfileStore::load(&AppPaths::from_home(dir.path()));

        add_key(&mut store, "  work ", Some(" sk-abc \n".into()), true).expect("add");
        assert_eq!(store.get("work").expect("trimmed name"), "sk-abc");
        assert_eq!(store.current(), Some("work"));
    }

    #[test]
    fn add_key_rejects_blank_input() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = ProfileStore::load(&AppPaths::from_home(dir.path()));

        assert!(matches!(
            add_key(&mut store, "   ", Some("sk".into()), true),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            add_key(&mut store, "work", Some("  ".into()), true),
            Err(AppError::Validation(_))
        ));
        assert!(store.list().is_empty());
    }
}
