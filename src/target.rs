use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub const ANTHROPIC_AUTH_TOKEN: &str = "ANTHROPIC_AUTH_TOKEN";
pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ANTHROPIC_DEFAULT_OPUS_MODEL: &str = "ANTHROPIC_DEFAULT_OPUS_MODEL";
pub const ANTHROPIC_DEFAULT_SONNET_MODEL: &str = "ANTHROPIC_DEFAULT_SONNET_MODEL";
pub const ANTHROPIC_DEFAULT_HAIKU_MODEL: &str = "ANTHROPIC_DEFAULT_HAIKU_MODEL";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const API_TIMEOUT_MS: &str = "API_TIMEOUT_MS";

/// 与凭据相关、由本工具管理的全部变量
pub const KNOWN_KEYS: [&str; 7] = [
    ANTHROPIC_AUTH_TOKEN,
    ANTHROPIC_BASE_URL,
    ANTHROPIC_DEFAULT_OPUS_MODEL,
    ANTHROPIC_DEFAULT_SONNET_MODEL,
    ANTHROPIC_DEFAULT_HAIKU_MODEL,
    ANTHROPIC_API_KEY,
    API_TIMEOUT_MS,
];

pub const ZAI_BASE_URL: &str = "https://api.z.ai/api/anthropic";
pub const ZAI_DEFAULT_MODEL: &str = "GLM-4.6";
pub const ZAI_API_TIMEOUT_MS: &str = "3000000";

/// 显示时需要脱敏的变量
pub fn is_sensitive_key(name: &str) -> bool {
    name.contains("AUTH_TOKEN") || name.contains("API_KEY")
}

/// 用户想要激活的配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationTarget {
    UseProvider {
        base_url: String,
        auth_token: String,
        model_overrides: IndexMap<String, String>,
    },
    UseCustom {
        base_url: String,
        auth_token: String,
    },
    /// 仅设置 token，不使用自定义端点
    UseApiKey { api_key: String },
    UseSubscription,
}

impl ConfigurationTarget {
    /// z.ai 预设：固定端点 + GLM 模型映射 + 较长的超时
    pub fn zai(auth_token: impl Into<String>) -> Self {
        let mut model_overrides = IndexMap::new();
        for key in [
            ANTHROPIC_DEFAULT_OPUS_MODEL,
            ANTHROPIC_DEFAULT_SONNET_MODEL,
            ANTHROPIC_DEFAULT_HAIKU_MODEL,
        ] {
            model_overrides.insert(key.to_string(), ZAI_DEFAULT_MODEL.to_string());
        }
        model_overrides.insert(API_TIMEOUT_MS.to_string(), ZAI_API_TIMEOUT_MS.to_string());

        Self::UseProvider {
            base_url: ZAI_BASE_URL.to_string(),
            auth_token: auth_token.into(),
            model_overrides,
        }
    }

    pub fn mode(&self) -> ConfigMode {
        match self {
            Self::UseProvider { base_url, .. } if base_url.contains("z.ai") => ConfigMode::Zai,
            Self::UseProvider { .. } | Self::UseCustom { .. } => ConfigMode::Custom,
            Self::UseApiKey { .. } => ConfigMode::ApiKey,
            Self::UseSubscription => ConfigMode::Subscription,
        }
    }

    /// 校验必填字段；失败时不会产生任何写入
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::UseProvider {
                base_url,
                auth_token,
                model_overrides,
            } => {
                validate_base_url(base_url)?;
                validate_secret("auth token", auth_token)?;
                for (key, value) in model_overrides {
                    validate_var_name(key)?;
                    if matches!(key.as_str(), ANTHROPIC_AUTH_TOKEN | ANTHROPIC_BASE_URL) {
                        return Err(AppError::Validation(format!(
                            "{key} cannot be used as a model override"
                        )));
                    }
                    validate_plain_value(key, value)?;
                }
                Ok(())
            }
            Self::UseCustom {
                base_url,
                auth_token,
            } => {
                validate_base_url(base_url)?;
                validate_secret("auth token", auth_token)
            }
            Self::UseApiKey { api_key } => validate_secret("API key", api_key),
            Self::UseSubscription => Ok(()),
        }
    }

    /// 计算完整写入计划：每个已知变量要么写入值，要么清除
    pub fn plan(&self) -> ApplyPlan {
        let mut entries: IndexMap<String, Option<String>> = KNOWN_KEYS
            .iter()
            .map(|key| (key.to_string(), None))
            .collect();

        match self {
            Self::UseProvider {
                base_url,
                auth_token,
                model_overrides,
            } => {
                entries.insert(ANTHROPIC_AUTH_TOKEN.into(), Some(auth_token.trim().into()));
                entries.insert(ANTHROPIC_BASE_URL.into(), Some(base_url.trim().into()));
                for (key, value) in model_overrides {
                    entries.insert(key.clone(), Some(value.trim().to_string()));
                }
            }
            Self::UseCustom {
                base_url,
                auth_token,
            } => {
                entries.insert(ANTHROPIC_AUTH_TOKEN.into(), Some(auth_token.trim().into()));
                entries.insert(ANTHROPIC_BASE_URL.into(), Some(base_url.trim().into()));
            }
            Self::UseApiKey { api_key } => {
                entries.insert(ANTHROPIC_AUTH_TOKEN.into(), Some(api_key.trim().into()));
            }
            Self::UseSubscription => {}
        }

        ApplyPlan { entries }
    }
}

fn validate_base_url(base_url: &str) -> Result<(), AppError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("base URL is required".into()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AppError::Validation(format!("invalid base URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "base URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    validate_plain_value(ANTHROPIC_BASE_URL, trimmed)
}

fn validate_secret(label: &str, secret: &str) -> Result<(), AppError> {
    if secret.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} is required")));
    }
    validate_plain_value(label, secret.trim())
}

// 值会被写进 shell rc 的双引号中，换行和引号会破坏文件结构
fn validate_plain_value(label: &str, value: &str) -> Result<(), AppError> {
    if value.chars().any(|c| c == '\n' || c == '\r' || c == '"') {
        return Err(AppError::Validation(format!(
            "{label} must not contain quotes or line breaks"
        )));
    }
    Ok(())
}

pub fn validate_var_name(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{name}' is not a valid environment variable name"
        )))
    }
}

/// 一次 apply 需要执行的写入；`None` 表示清除
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    pub entries: IndexMap<String, Option<String>>,
}

impl ApplyPlan {
    /// 写入 settings.json 的映射，清除项写为空字符串
    pub fn settings_env(&self) -> IndexMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
            .collect()
    }
}

/// 界面上选择的模式，持久化在配置文件的 `selected_config` 中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    Zai,
    Custom,
    ApiKey,
    Subscription,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zai => "zai",
            Self::Custom => "custom",
            Self::ApiKey => "api_key",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ConfigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zai" => Ok(Self::Zai),
            "custom" => Ok(Self::Custom),
            "api_key" | "api-key" => Ok(Self::ApiKey),
            "subscription" | "claude" => Ok(Self::Subscription),
            other => Err(AppError::Validation(format!("unknown mode '{other}'"))),
        }
    }
}
