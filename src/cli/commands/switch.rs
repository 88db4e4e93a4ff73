use clap::Subcommand;
use inquire::{Password, PasswordDisplayMode, Text};

use crate::cli::commands::status::print_status;
use crate::cli::ui::{error, highlight, info, success, with_spinner};
use crate::context::SwitchContext;
use crate::error::AppError;
use crate::services::ApplyOutcome;
use crate::target::{ConfigMode, ConfigurationTarget};

#[derive(Subcommand)]
pub enum SwitchCommand {
    /// Use the z.ai API (GLM models)
    Zai {
        /// Saved key name to use (defaults to the selected key)
        #[arg(long, conflicts_with = "key")]
        name: Option<String>,
        /// API key to use directly
        #[arg(long)]
        key: Option<String>,
    },
    /// Use a custom Anthropic-compatible endpoint
    Custom {
        /// Base URL (defaults to the last custom URL)
        #[arg(long)]
        url: Option<String>,
        /// Auth token (defaults to the last custom key)
        #[arg(long)]
        key: Option<String>,
    },
    /// Use an Anthropic API key without a custom endpoint
    ApiKey {
        /// API key (defaults to the last used key)
        #[arg(long)]
        key: Option<String>,
    },
    /// Remove all overrides and fall back to the Claude subscription login
    Subscription,
}

pub fn execute(cmd: SwitchCommand, ctx: &SwitchContext) -> Result<(), AppError> {
    let mut profiles = ctx.profiles();

    let (target, profile_name) = match cmd {
        SwitchCommand::Zai { name, key } => {
            let (key, name) = match (key, name) {
                (Some(key), _) => (key, None),
                (None, Some(name)) => (profiles.get(&name)?.to_string(), Some(name)),
                (None, None) => match profiles.current().map(str::to_string) {
                    Some(current) => (profiles.get(&current)?.to_string(), Some(current)),
                    None => (prompt_secret("z.ai API key:")?, None),
                },
            };
            (ConfigurationTarget::zai(key), name)
        }
        SwitchCommand::Custom { url, key } => {
            let (saved_url, saved_key) = profiles.custom();
            let base_url = match url.or_else(|| saved_url.map(str::to_string)) {
                Some(url) => url,
                None => prompt_text("Custom base URL:")?,
            };
            let auth_token = match key.or_else(|| saved_key.map(str::to_string)) {
                Some(key) => key,
                None => prompt_secret("Custom API key:")?,
            };
            (
                ConfigurationTarget::UseCustom {
                    base_url,
                    auth_token,
                },
                None,
            )
        }
        SwitchCommand::ApiKey { key } => {
            let api_key = match key.or_else(|| profiles.api_key().map(str::to_string)) {
                Some(key) => key,
                None => prompt_secret("Anthropic API key:")?,
            };
            (ConfigurationTarget::UseApiKey { api_key }, None)
        }
        SwitchCommand::Subscription => (ConfigurationTarget::UseSubscription, None),
    };

    apply_target(ctx, &target)?;

    if let Some(name) = profile_name {
        profiles.set_current(Some(&name))?;
    }
    remember(&mut profiles, &target)?;

    println!();
    print_status(&ctx.resolver().current_status());
    Ok(())
}

/// 在后台线程执行 apply，成功后打印结果与重启提示
pub fn apply_target(ctx: &SwitchContext, target: &ConfigurationTarget) -> Result<ApplyOutcome, AppError> {
    let applier = ctx.applier();
    let owned = target.clone();
    let result = with_spinner("Applying configuration...", move || applier.apply(&owned));

    match &result {
        Ok(outcome) => print_outcome(outcome),
        Err(AppError::Backend { applied, .. }) if !applied.is_empty() => {
            println!(
                "{}",
                error("Configuration was partially applied; these variables were already written:")
            );
            for name in applied {
                println!("  - {name}");
            }
        }
        Err(_) => {}
    }
    result
}

fn print_outcome(outcome: &ApplyOutcome) {
    let label = match outcome.mode {
        ConfigMode::Zai => "Z.ai",
        ConfigMode::Custom => "Custom",
        ConfigMode::ApiKey => "API key",
        ConfigMode::Subscription => "Subscription",
    };
    println!(
        "{}",
        success(&format!("✓ {label} configuration applied successfully!"))
    );
    println!(
        "{}",
        info(&format!(
            "  {} variables set, {} cleared, {} keys written to settings.json",
            outcome.env_set.len(),
            outcome.env_removed.len(),
            outcome.settings_keys.len()
        ))
    );
    println!("\n{} {}", highlight("IMPORTANT:"), outcome.advisory);
}

/// 记录本次使用的表单内容，供下次默认使用
pub fn remember(
    profiles: &mut crate::profile::ProfileStore,
    target: &ConfigurationTarget,
) -> Result<(), AppError> {
    match target {
        ConfigurationTarget::UseCustom {
            base_url,
            auth_token,
        } => profiles.remember_applied(
            ConfigMode::Custom,
            Some((base_url.as_str(), auth_token.as_str())),
            None,
        ),
        ConfigurationTarget::UseApiKey { api_key } => {
            profiles.remember_applied(ConfigMode::ApiKey, None, Some(api_key))
        }
        other => profiles.remember_applied(other.mode(), None, None),
    }
}

pub(crate) fn prompt_secret(message: &str) -> Result<String, AppError> {
    Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))
}

pub(crate) fn prompt_text(message: &str) -> Result<String, AppError> {
    Text::new(message)
        .prompt()
        .map_err(|e| AppError::Message(format!("Prompt failed: {e}")))
}
