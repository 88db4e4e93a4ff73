use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{delete_file, write_json_file, AppPaths};
use crate::error::AppError;
use crate::target::ConfigMode;

/// 旧单 key 格式迁移后使用的名称
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// `~/.claude_ez_switch/config.json` 的磁盘格式
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub zai_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub current_zai_key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_config: Option<String>,
    /// 旧版本的单个 key，只读不写
    #[serde(default, skip_serializing)]
    zai_key: Option<String>,
}

impl ProfileFile {
    fn normalize(&mut self) {
        for field in [
            &mut self.custom_url,
            &mut self.custom_key,
            &mut self.claude_mode,
            &mut self.claude_key,
            &mut self.selected_config,
        ] {
            *field = field
                .as_ref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string());
        }
    }

    /// 把旧的 `zai_key` 转成名为 `Default` 的条目，返回是否发生了迁移
    fn migrate_single_key(&mut self) -> bool {
        let Some(old_key) = self.zai_key.take() else {
            return false;
        };
        if !self.zai_keys.is_empty() {
            return false;
        }
        log::info!("migrating legacy single z.ai key to profile '{DEFAULT_PROFILE_NAME}'");
        self.zai_keys
            .insert(DEFAULT_PROFILE_NAME.to_string(), old_key);
        if self.current_zai_key_name.is_none() {
            self.current_zai_key_name = Some(DEFAULT_PROFILE_NAME.to_string());
        }
        true
    }
}

/// 已保存的 z.ai key 及界面状态。每次修改都会立即写盘。
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    data: ProfileFile,
}

impl ProfileStore {
    /// 加载配置；文件缺失或损坏时得到空存储，必要时执行一次旧格式迁移
    pub fn load(paths: &AppPaths) -> Self {
        let path = paths.profile_file.clone();
        let (mut data, mut needs_write) = if path.exists() {
            (read_profile_file(&path).unwrap_or_default(), false)
        } else if paths.legacy_profile_file.exists() {
            // 旧文件解析失败时保留原文件，不迁移
            match read_profile_file(&paths.legacy_profile_file) {
                Some(data) => {
                    log::info!(
                        "moving legacy config {} -> {}",
                        paths.legacy_profile_file.display(),
                        path.display()
                    );
                    (data, true)
                }
                None => (ProfileFile::default(), false),
            }
        } else {
            (ProfileFile::default(), false)
        };

        needs_write |= data.migrate_single_key();
        data.normalize();

        if let Some(current) = &data.current_zai_key_name {
            if !data.zai_keys.contains_key(current) {
                log::warn!("current profile '{current}' no longer exists, clearing selection");
                data.current_zai_key_name = None;
            }
        }

        let store = Self { path, data };
        if needs_write {
            match store.save() {
                Ok(()) => {
                    if let Err(err) = delete_file(&paths.legacy_profile_file) {
                        log::warn!("failed to remove legacy config: {err}");
                    }
                }
                Err(err) => log::warn!("failed to write migrated config: {err}"),
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &ProfileFile {
        &self.data
    }

    pub fn save(&self) -> Result<(), AppError> {
        write_json_file(&self.path, &self.data)
    }

    /// 按名称排序的 profile 列表
    pub fn list(&self) -> Vec<String> {
        self.data.zai_keys.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&str, AppError> {
        self.data
            .zai_keys
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.zai_keys.contains_key(name)
    }

    /// 新增或覆盖，名称和 secret 原样保存；是否需要确认、是否清理输入由调用方决定
    pub fn put(&mut self, name: &str, secret: &str) -> Result<(), AppError> {
        self.data
            .zai_keys
            .insert(name.to_string(), secret.to_string());
        self.save()
    }

    /// 删除 profile；删除当前选中的 profile 时同时清空选中状态
    pub fn delete(&mut self, name: &str) -> Result<(), AppError> {
        if self.data.zai_keys.remove(name).is_none() {
            return Err(AppError::ProfileNotFound(name.to_string()));
        }
        if self.data.current_zai_key_name.as_deref() == Some(name) {
            self.data.current_zai_key_name = None;
        }
        self.save()
    }

    pub fn current(&self) -> Option<&str> {
        self.data.current_zai_key_name.as_deref()
    }

    pub fn set_current(&mut self, name: Option<&str>) -> Result<(), AppError> {
        if let Some(name) = name {
            if !self.contains(name) {
                return Err(AppError::ProfileNotFound(name.to_string()));
            }
        }
        self.data.current_zai_key_name = name.map(str::to_string);
        self.save()
    }

    pub fn selected_mode(&self) -> Option<ConfigMode> {
        self.data
            .selected_config
            .as_deref()
            .and_then(|s| s.parse().ok())
    }

    pub fn custom(&self) -> (Option<&str>, Option<&str>) {
        (
            self.data.custom_url.as_deref(),
            self.data.custom_key.as_deref(),
        )
    }

    pub fn api_key(&self) -> Option<&str> {
        self.data.claude_key.as_deref()
    }

    /// 成功应用配置后记录表单状态，供下次预填
    pub fn remember_applied(
        &mut self,
        mode: ConfigMode,
        custom: Option<(&str, &str)>,
        api_key: Option<&str>,
    ) -> Result<(), AppError> {
        self.data.selected_config = Some(mode.as_str().to_string());
        if let Some((url, key)) = custom {
            self.data.custom_url = Some(url.trim().to_string());
            self.data.custom_key = Some(key.trim().to_string());
        }
        match mode {
            ConfigMode::ApiKey => {
                self.data.claude_mode = Some(ConfigMode::ApiKey.as_str().to_string());
                if let Some(key) = api_key {
                    self.data.claude_key = Some(key.trim().to_string());
                }
            }
            ConfigMode::Subscription => {
                self.data.claude_mode = Some(ConfigMode::Subscription.as_str().to_string());
            }
            ConfigMode::Zai | ConfigMode::Custom => {}
        }
        self.data.normalize();
        self.save()
    }
}

fn read_profile_file(path: &Path) -> Option<ProfileFile> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            log::warn!("failed to read {}: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str::<ProfileFile>(&content) {
        Ok(data) => Some(data),
        Err(err) => {
            log::warn!(
                "failed to parse profile file, starting empty. path: {}, error: {}",
                path.display(),
                err
            );
            None
        }
    }
}
