use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod commands;
pub mod interactive;
pub mod ui;

use crate::env_backend::BackendKind;

#[derive(Parser)]
#[command(
    name = "ez-switch",
    version,
    about = "Switch Claude Code between z.ai, custom endpoints, API keys and subscription mode",
    long_about = "Switch which API endpoint and credentials Claude Code uses by writing user environment variables and ~/.claude/settings.json.\n\nRun without arguments to enter interactive mode."
)]
pub struct Cli {
    /// Where user environment variables are persisted
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Auto)]
    pub backend: BackendKind,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which configuration is currently in effect
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every managed variable in settings.json and the user environment
    Env {
        /// Also show values from the current process environment
        #[arg(long)]
        process: bool,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a configuration (z.ai, custom, api-key, subscription)
    #[command(subcommand)]
    Switch(commands::switch::SwitchCommand),

    /// Manage saved z.ai API keys
    #[command(subcommand)]
    Key(commands::key::KeyCommand),

    /// Show the files this tool reads and writes
    Paths,

    /// Enter interactive mode
    #[command(alias = "ui")]
    Interactive,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
