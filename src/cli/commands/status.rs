use comfy_table::Cell;
use serde_json::json;

use crate::cli::ui::{create_table, highlight, info, kind_label, to_json, warning};
use crate::context::SwitchContext;
use crate::error::AppError;
use crate::services::{display_value, mask_secret, ConfigKind, EffectiveConfig};

const NOT_SET: &str = "Not set";

pub fn show_status(ctx: &SwitchContext, json_output: bool) -> Result<(), AppError> {
    let resolver = ctx.resolver();
    let status = resolver.current_status();

    if json_output {
        let output = json!({
            "kind": status.kind(),
            "source": status.source,
            "baseUrl": status.base_url,
            "authToken": status.masked_token(),
            "backend": resolver.backend_name(),
        });
        println!(
            "{}",
            to_json(&output).map_err(|e| AppError::JsonSerialize { source: e })?
        );
        return Ok(());
    }

    print_status(&status);
    println!(
        "{}",
        info(&format!("  Environment backend: {}", resolver.backend_name()))
    );
    Ok(())
}

/// 按原界面的格式输出当前状态
pub fn print_status(status: &EffectiveConfig) {
    let kind = status.kind();
    match kind {
        ConfigKind::SubscriptionMode => {
            println!(
                "{} {}",
                warning("⚠ No API override is set, Claude Code uses"),
                kind_label(kind)
            );
        }
        _ => println!("✓ Currently using {}", kind_label(kind)),
    }

    if let Some(url) = &status.base_url {
        println!("  Base URL: {url}");
    }
    if let Some(token) = &status.auth_token {
        println!("  Token:    {}", mask_secret(token));
    }
    println!("  Source:   {}", status.source);
}

pub fn show_env(ctx: &SwitchContext, include_process: bool, json_output: bool) -> Result<(), AppError> {
    let resolver = ctx.resolver();
    let mut report = resolver.report(include_process);

    for row in &mut report {
        row.settings = row.settings.as_deref().map(|v| display_value(&row.name, v));
        row.user_env = display_value(&row.name, &row.user_env);
        row.process = row.process.as_deref().map(|v| display_value(&row.name, v));
    }

    if json_output {
        println!(
            "{}",
            to_json(&report).map_err(|e| AppError::JsonSerialize { source: e })?
        );
        return Ok(());
    }

    let mut table = create_table();
    let mut header = vec!["Variable", "settings.json", "User environment"];
    if include_process {
        header.push("Process");
    }
    table.set_header(header);

    for row in report {
        let settings_cell = match row.settings.as_deref() {
            None => NOT_SET.to_string(),
            Some("") => "(cleared)".to_string(),
            Some(v) => v.to_string(),
        };
        let env_cell = if row.user_env.is_empty() {
            NOT_SET.to_string()
        } else {
            row.user_env
        };
        let mut cells = vec![Cell::new(row.name), Cell::new(settings_cell), Cell::new(env_cell)];
        if let Some(process) = row.process {
            cells.push(Cell::new(if process.is_empty() {
                NOT_SET.to_string()
            } else {
                process
            }));
        }
        table.add_row(cells);
    }

    println!("{}", highlight("Claude Code environment"));
    println!("{table}");
    println!(
        "{}",
        info(&format!("ℹ settings.json takes precedence over the {} backend", resolver.backend_name()))
    );
    Ok(())
}

pub fn show_paths(ctx: &SwitchContext) -> Result<(), AppError> {
    let paths = ctx.paths();
    println!("{}", highlight("Files"));
    println!("  Profiles:        {}", paths.profile_file.display());
    println!("  Claude settings: {}", paths.claude_settings_file.display());
    println!("  Env backend:     {}", ctx.env().name());
    Ok(())
}
