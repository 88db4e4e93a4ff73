use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::write_json_file;
use crate::error::AppError;

const ENV_KEY: &str = "env";

enum Loaded {
    Missing,
    Parsed(Map<String, Value>),
    /// 文件存在但不是 JSON 对象，保留原文以便备份
    Invalid(String),
}

/// Claude Code `settings.json` 的读写。
///
/// 只改动 `env` 子对象中的指定键，其余顶层字段原样保留。
#[derive(Debug, Clone)]
pub struct SettingsFileBackend {
    path: PathBuf,
}

impl SettingsFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Loaded, AppError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(e) => return Err(AppError::io(&self.path, e)),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Loaded::Parsed(map)),
            Ok(_) => {
                log::warn!(
                    "settings root is not a JSON object, treating as empty: {}",
                    self.path.display()
                );
                Ok(Loaded::Invalid(content))
            }
            Err(err) => {
                log::warn!(
                    "failed to parse settings file, treating as empty. path: {}, error: {}",
                    self.path.display(),
                    err
                );
                Ok(Loaded::Invalid(content))
            }
        }
    }

    /// 读取整个文档；文件缺失、不可读或格式错误时返回空对象
    pub fn read(&self) -> Value {
        match self.load() {
            Ok(Loaded::Parsed(map)) => Value::Object(map),
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                log::warn!("{err}");
                Value::Object(Map::new())
            }
        }
    }

    /// 读取 `env.<key>`，非字符串值视为未设置
    pub fn env_value(&self, key: &str) -> Option<String> {
        self.read()
            .get(ENV_KEY)
            .and_then(|env| env.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// 将 `kv` 写入 `env`。空字符串表示显式清除，键仍然保留。
    pub fn merge(&self, kv: &IndexMap<String, String>) -> Result<(), AppError> {
        let mut root = match self.load()? {
            Loaded::Parsed(map) => map,
            Loaded::Missing => Map::new(),
            Loaded::Invalid(raw) => {
                self.backup_invalid(&raw)?;
                Map::new()
            }
        };

        let env = root
            .entry(ENV_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !env.is_object() {
            log::warn!("settings `env` is not an object, replacing it");
            *env = Value::Object(Map::new());
        }
        if let Some(env) = env.as_object_mut() {
            for (key, value) in kv {
                env.insert(key.clone(), Value::String(value.clone()));
            }
        }

        write_json_file(&self.path, &Value::Object(root))?;
        log::info!("merged {} env keys into {}", kv.len(), self.path.display());
        Ok(())
    }

    /// 从 `env` 删除给定键，返回实际删除的键；没有匹配时不写文件
    pub fn remove_keys(&self, names: &[&str]) -> Result<Vec<String>, AppError> {
        let Loaded::Parsed(mut root) = self.load()? else {
            return Ok(Vec::new());
        };

        let Some(env) = root.get_mut(ENV_KEY).and_then(Value::as_object_mut) else {
            return Ok(Vec::new());
        };

        let removed: Vec<String> = names
            .iter()
            .filter(|name| env.remove(**name).is_some())
            .map(|name| name.to_string())
            .collect();

        if !removed.is_empty() {
            write_json_file(&self.path, &Value::Object(root))?;
        }
        Ok(removed)
    }

    fn backup_invalid(&self, raw: &str) -> Result<(), AppError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "settings.json".to_string());
        let backup = self
            .path
            .with_file_name(format!("{file_name}.invalid-{timestamp}"));
        fs::write(&backup, raw).map_err(|e| AppError::io(&backup, e))?;
        log::warn!("backed up unparseable settings to {}", backup.display());
        Ok(())
    }
}
