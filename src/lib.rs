// Core modules
mod claude_settings;
mod config;
mod context;
pub mod env_backend;
mod error;
mod profile;
pub mod services;
mod target;

// CLI module
pub mod cli;

// Public exports
pub use claude_settings::SettingsFileBackend;
pub use config::{read_json_file, write_json_file, AppPaths};
pub use context::SwitchContext;
pub use env_backend::{BackendKind, EnvironmentBackend, MemoryBackend, ShellRcBackend};
pub use error::{AppError, BackendError};
pub use profile::{ProfileFile, ProfileStore, DEFAULT_PROFILE_NAME};
pub use services::{
    mask_secret, ApplyOutcome, ApplyPhase, ConfigApplier, ConfigKind, ConfigResolver,
    ConfigSource, EffectiveConfig, RESTART_ADVISORY,
};
pub use target::{ApplyPlan, ConfigMode, ConfigurationTarget, KNOWN_KEYS, ZAI_BASE_URL};
