use inquire::{Confirm, Select, Text};

use crate::cli::commands::key::{add_key, delete_key, list_keys};
use crate::cli::commands::switch::prompt_secret;
use crate::cli::ui::highlight;
use crate::context::SwitchContext;
use crate::error::AppError;
use crate::profile::ProfileStore;
use crate::services::mask_secret;

use super::pause;

const ENTER_NEW_KEY: &str = "➕ Enter a new key";

pub fn manage_keys_menu(ctx: &SwitchContext) -> Result<(), AppError> {
    loop {
        println!("\n{}", highlight("z.ai keys"));
        println!("{}", "─".repeat(60));

        let mut store = ctx.profiles();
        list_keys(&store)?;

        println!();
        let choices = vec!["Add or replace a key", "Select a key", "Delete a key", "Back"];
        let choice = Select::new("Choose an action:", choices)
            .prompt()
            .map_err(|_| AppError::Message("Selection cancelled".to_string()))?;

        match choice {
            "Add or replace a key" => {
                let name = Text::new("Key name:")
                    .prompt()
                    .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))?;
                add_key(&mut store, &name, None, false)?;
            }
            "Select a key" => {
                if let Some(name) = select_saved(&store, "Use which key?")? {
                    store.set_current(Some(&name))?;
                }
            }
            "Delete a key" => {
                if let Some(name) = select_saved(&store, "Delete which key?")? {
                    delete_key(&mut store, &name, false)?;
                }
            }
            _ => break,
        }
        pause();
    }
    Ok(())
}

fn select_saved(store: &ProfileStore, message: &str) -> Result<Option<String>, AppError> {
    let names = store.list();
    if names.is_empty() {
        println!("No saved keys.");
        return Ok(None);
    }
    Select::new(message, names)
        .prompt()
        .map(Some)
        .map_err(|_| AppError::Message("Selection cancelled".to_string()))
}

/// 选择已保存的 z.ai key 或输入新 key，返回 (key, 保存名称)
pub fn pick_zai_key(store: &ProfileStore) -> Result<(String, Option<String>), AppError> {
    let names = store.list();
    if names.is_empty() {
        return Ok((prompt_secret("z.ai API key:")?, None));
    }

    let mut options: Vec<String> = names.clone();
    options.push(ENTER_NEW_KEY.to_string());
    let start = store
        .current()
        .and_then(|c| names.iter().position(|n| n == c))
        .unwrap_or(0);

    let picked = Select::new("z.ai key:", options)
        .with_starting_cursor(start)
        .prompt()
        .map_err(|_| AppError::Message("Selection cancelled".to_string()))?;

    if picked == ENTER_NEW_KEY {
        return Ok((prompt_secret("z.ai API key:")?, None));
    }
    let secret = store.get(&picked)?.to_string();
    Ok((secret, Some(picked)))
}

pub fn reuse_saved(label: &str, secret: &str) -> Result<bool, AppError> {
    Confirm::new(&format!("Use saved {label} ({})?", mask_secret(secret)))
        .with_default(true)
        .prompt()
        .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))
}
