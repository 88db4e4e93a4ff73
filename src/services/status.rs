use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::claude_settings::SettingsFileBackend;
use crate::env_backend::{process_var, EnvironmentBackend};
use crate::target::{is_sensitive_key, ANTHROPIC_AUTH_TOKEN, ANTHROPIC_BASE_URL, KNOWN_KEYS};

/// 脱敏显示时的固定占位
pub const FIXED_MASK: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigSource {
    SettingsFile,
    EnvironmentVariable,
    None,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SettingsFile => "settings file",
            Self::EnvironmentVariable => "user environment variable",
            Self::None => "none",
        })
    }
}

/// 当前生效配置的分类，四种情况互斥且完备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigKind {
    ProviderZai,
    ApiKeyMode,
    SubscriptionMode,
    CustomProvider,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProviderZai => "z.ai API",
            Self::ApiKeyMode => "API key",
            Self::SubscriptionMode => "Claude subscription",
            Self::CustomProvider => "custom base URL",
        })
    }
}

/// 每次查询时重新计算，不做持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub auth_token: Option<String>,
    pub base_url: Option<String>,
    pub source: ConfigSource,
}

impl EffectiveConfig {
    /// 空字符串与未设置等价
    pub fn new(auth_token: Option<String>, base_url: Option<String>, source: ConfigSource) -> Self {
        Self {
            auth_token: non_empty(auth_token),
            base_url: non_empty(base_url),
            source,
        }
    }

    pub fn kind(&self) -> ConfigKind {
        match (&self.base_url, &self.auth_token) {
            (Some(url), _) if url.contains("z.ai") => ConfigKind::ProviderZai,
            (None, Some(_)) => ConfigKind::ApiKeyMode,
            (None, None) => ConfigKind::SubscriptionMode,
            // 只有 base URL 没有 token 时按自定义端点处理
            (Some(_), _) => ConfigKind::CustomProvider,
        }
    }

    pub fn masked_token(&self) -> Option<String> {
        self.auth_token.as_deref().map(mask_secret)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 长度超过 8 时保留首尾各 4 个字符，否则使用固定占位
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        FIXED_MASK.to_string()
    }
}

/// 敏感变量脱敏，其他变量原样显示
pub fn display_value(key: &str, value: &str) -> String {
    if is_sensitive_key(key) && !value.is_empty() {
        mask_secret(value)
    } else {
        value.to_string()
    }
}

/// 单个已知变量在各来源中的取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarReport {
    pub name: String,
    /// `None` 表示 settings.json 中没有这个键；`Some("")` 表示已显式清除
    pub settings: Option<String>,
    pub user_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

/// 从 settings.json 与用户环境变量解析当前配置，settings.json 优先
pub struct ConfigResolver {
    env: Arc<dyn EnvironmentBackend>,
    settings: SettingsFileBackend,
}

impl ConfigResolver {
    pub fn new(env: Arc<dyn EnvironmentBackend>, settings: SettingsFileBackend) -> Self {
        Self { env, settings }
    }

    pub fn current_status(&self) -> EffectiveConfig {
        let doc = self.settings.read();
        let from_settings = |key: &str| {
            doc.get("env")
                .and_then(|env| env.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .filter(|v| !v.trim().is_empty())
        };

        let settings_token = from_settings(ANTHROPIC_AUTH_TOKEN);
        let settings_url = from_settings(ANTHROPIC_BASE_URL);

        let mut used_env = false;
        let mut from_env = |key: &str| {
            let value = self.env.get_user_var(key);
            if value.trim().is_empty() {
                None
            } else {
                used_env = true;
                Some(value)
            }
        };

        let auth_token = match settings_token.clone() {
            Some(v) => Some(v),
            None => from_env(ANTHROPIC_AUTH_TOKEN),
        };
        let base_url = match settings_url.clone() {
            Some(v) => Some(v),
            None => from_env(ANTHROPIC_BASE_URL),
        };

        let source = if settings_token.is_some() || settings_url.is_some() {
            ConfigSource::SettingsFile
        } else if used_env {
            ConfigSource::EnvironmentVariable
        } else {
            ConfigSource::None
        };

        let status = EffectiveConfig::new(auth_token, base_url, source);
        log::debug!("resolved configuration: {} from {}", status.kind(), status.source);
        status
    }

    /// 列出每个已知变量在 settings.json、用户环境（以及可选的当前进程）中的值
    pub fn report(&self, include_process: bool) -> Vec<VarReport> {
        let doc = self.settings.read();
        KNOWN_KEYS
            .iter()
            .map(|key| VarReport {
                name: key.to_string(),
                settings: doc
                    .get("env")
                    .and_then(|env| env.get(*key))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                user_env: self.env.get_user_var(key),
                process: include_process.then(|| process_var(key)),
            })
            .collect()
    }

    pub fn backend_name(&self) -> &'static str {
        self.env.name()
    }
}
