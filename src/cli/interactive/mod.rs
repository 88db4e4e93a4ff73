mod keys;

use inquire::{Select, Text};
use std::fmt;

use crate::cli::commands::status::{print_status, show_env};
use crate::cli::commands::switch::{apply_target, prompt_secret, remember};
use crate::cli::ui::{apply_inquire_theme, error, highlight, info, success};
use crate::context::SwitchContext;
use crate::error::AppError;
use crate::target::{ConfigMode, ConfigurationTarget};

pub fn run(ctx: &SwitchContext) -> Result<(), AppError> {
    apply_inquire_theme();
    print_welcome(ctx);

    loop {
        let result = match show_main_menu()? {
            MainMenuChoice::ViewStatus => view_status(ctx),
            MainMenuChoice::ViewEnv => show_env(ctx, false, false).map(|_| pause()),
            MainMenuChoice::Apply => apply_menu(ctx),
            MainMenuChoice::ManageKeys => keys::manage_keys_menu(ctx),
            MainMenuChoice::Exit => {
                println!("\n{}", success("Goodbye!"));
                break;
            }
        };

        if let Err(e) = result {
            println!("\n{}", error(&format!("Error: {e}")));
            pause();
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum MainMenuChoice {
    ViewStatus,
    ViewEnv,
    Apply,
    ManageKeys,
    Exit,
}

impl fmt::Display for MainMenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ViewStatus => write!(f, "🔍 View current status"),
            Self::ViewEnv => write!(f, "📋 Show environment variables"),
            Self::Apply => write!(f, "🔄 Apply a configuration"),
            Self::ManageKeys => write!(f, "🔑 Manage z.ai keys"),
            Self::Exit => write!(f, "🚪 Exit"),
        }
    }
}

fn print_welcome(ctx: &SwitchContext) {
    println!("\n{}", "═".repeat(60));
    println!("{}", highlight("Claude Code EZ Switch"));
    println!("{}", "═".repeat(60));
    println!(
        "{} Environment backend: {}",
        info("⚙"),
        highlight(ctx.env().name())
    );
    println!("{}", "─".repeat(60));
    println!();
}

fn show_main_menu() -> Result<MainMenuChoice, AppError> {
    let choices = vec![
        MainMenuChoice::ViewStatus,
        MainMenuChoice::ViewEnv,
        MainMenuChoice::Apply,
        MainMenuChoice::ManageKeys,
        MainMenuChoice::Exit,
    ];

    Select::new("What would you like to do?", choices)
        .prompt()
        .map_err(|_| AppError::Message("Selection cancelled".to_string()))
}

fn view_status(ctx: &SwitchContext) -> Result<(), AppError> {
    println!();
    print_status(&ctx.resolver().current_status());
    pause();
    Ok(())
}

fn mode_label(mode: ConfigMode) -> &'static str {
    match mode {
        ConfigMode::Zai => "z.ai API",
        ConfigMode::Custom => "Custom base URL",
        ConfigMode::ApiKey => "Anthropic API key",
        ConfigMode::Subscription => "Claude subscription (remove overrides)",
    }
}

fn apply_menu(ctx: &SwitchContext) -> Result<(), AppError> {
    let mut profiles = ctx.profiles();
    let modes = [
        ConfigMode::Zai,
        ConfigMode::Custom,
        ConfigMode::ApiKey,
        ConfigMode::Subscription,
    ];
    let labels: Vec<&str> = modes.iter().map(|m| mode_label(*m)).collect();
    let start = profiles
        .selected_mode()
        .and_then(|m| modes.iter().position(|x| *x == m))
        .unwrap_or(0);

    let picked = Select::new("Configuration:", labels)
        .with_starting_cursor(start)
        .prompt()
        .map_err(|_| AppError::Message("Selection cancelled".to_string()))?;
    let mode = modes
        .iter()
        .copied()
        .find(|m| mode_label(*m) == picked)
        .unwrap_or(ConfigMode::Subscription);

    let mut profile_name = None;
    let target = match mode {
        ConfigMode::Zai => {
            let (key, name) = keys::pick_zai_key(&profiles)?;
            profile_name = name;
            ConfigurationTarget::zai(key)
        }
        ConfigMode::Custom => {
            let (saved_url, saved_key) = profiles.custom();
            let mut url_prompt = Text::new("Custom base URL:");
            if let Some(url) = saved_url {
                url_prompt = url_prompt.with_default(url);
            }
            let base_url = url_prompt
                .prompt()
                .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))?;
            let auth_token = match saved_key {
                Some(key) if keys::reuse_saved("custom key", key)? => key.to_string(),
                _ => prompt_secret("Custom API key:")?,
            };
            ConfigurationTarget::UseCustom {
                base_url,
                auth_token,
            }
        }
        ConfigMode::ApiKey => {
            let api_key = match profiles.api_key() {
                Some(key) if keys::reuse_saved("API key", key)? => key.to_string(),
                _ => prompt_secret("Anthropic API key:")?,
            };
            ConfigurationTarget::UseApiKey { api_key }
        }
        ConfigMode::Subscription => ConfigurationTarget::UseSubscription,
    };

    apply_target(ctx, &target)?;
    if let Some(name) = profile_name {
        profiles.set_current(Some(&name))?;
    }
    remember(&mut profiles, &target)?;

    println!();
    print_status(&ctx.resolver().current_status());
    pause();
    Ok(())
}

pub(crate) fn pause() {
    let _ = Text::new("Press Enter to continue...")
        .with_default("")
        .prompt();
}
