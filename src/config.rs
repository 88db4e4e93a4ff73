use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;

const APP_DIR_NAME: &str = ".claude_ez_switch";
const LEGACY_CONFIG_FILE: &str = ".claude_code_ez_switch_config.json";

/// 应用读写的全部文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// 用户主目录（shell rc 文件所在目录）
    pub home: PathBuf,
    /// `~/.claude_ez_switch/config.json`
    pub profile_file: PathBuf,
    /// 旧版本使用的单文件配置
    pub legacy_profile_file: PathBuf,
    /// Claude Code 的 `settings.json`
    pub claude_settings_file: PathBuf,
}

impl AppPaths {
    /// 以给定目录作为主目录构建路径，Claude 目录固定为 `~/.claude`
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let claude_dir = home.join(".claude");
        Self::with_claude_dir(home, claude_dir)
    }

    pub fn with_claude_dir(home: impl Into<PathBuf>, claude_dir: impl AsRef<Path>) -> Self {
        let home = home.into();
        Self {
            profile_file: home.join(APP_DIR_NAME).join("config.json"),
            legacy_profile_file: home.join(LEGACY_CONFIG_FILE),
            claude_settings_file: claude_dir.as_ref().join("settings.json"),
            home,
        }
    }

    /// 根据当前用户环境探测路径，`CLAUDE_CONFIG_DIR` 非空时覆盖 Claude 目录
    pub fn detect() -> Result<Self, AppError> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("unable to locate the user home directory".into()))?;

        let override_dir = std::env::var("CLAUDE_CONFIG_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(match override_dir {
            Some(dir) => {
                let dir = resolve_override_path(&home, &dir);
                log::debug!("using CLAUDE_CONFIG_DIR override: {}", dir.display());
                Self::with_claude_dir(home, dir)
            }
            None => Self::from_home(home),
        })
    }

    pub fn app_config_dir(&self) -> PathBuf {
        self.home.join(APP_DIR_NAME)
    }
}

fn resolve_override_path(home: &Path, raw: &str) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    if let Some(stripped) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return home.join(stripped);
    }
    PathBuf::from(raw)
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| AppError::JsonSerialize { source: e })?;
    atomic_write(path, json.as_bytes())
}

/// 先写入同目录临时文件再重命名，父目录不存在时自动创建
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| AppError::io(parent, e))?;
    tmp.write_all(data).map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| AppError::io(path, e.error))?;
    Ok(())
}

pub fn delete_file(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn from_home_places_every_file_under_home() {
        let paths = AppPaths::from_home("/home/u");
        assert_eq!(
            paths.profile_file,
            PathBuf::from("/home/u/.claude_ez_switch/config.json")
        );
        assert_eq!(
            paths.legacy_profile_file,
            PathBuf::from("/home/u/.claude_code_ez_switch_config.json")
        );
        assert_eq!(
            paths.claude_settings_file,
            PathBuf::from("/home/u/.claude/settings.json")
        );
    }

    #[test]
    fn override_path_expands_tilde() {
        let home = Path::new("/home/u");
        assert_eq!(resolve_override_path(home, "~"), PathBuf::from("/home/u"));
        assert_eq!(
            resolve_override_path(home, "~/cfg/claude"),
            PathBuf::from("/home/u/cfg/claude")
        );
        assert_eq!(resolve_override_path(home, "/opt/c"), PathBuf::from("/opt/c"));
    }

    #[test]
    fn atomic_write_creates_missing_parent_dirs() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("a").join("b").join("f.json");

        write_json_file(&path, &json!({"k": "v"})).expect("write");
        let back: serde_json::Value = read_json_file(&path).expect("read");
        assert_eq!(back, json!({"k": "v"}));

        // 目录已存在时再次写入同样成功
        write_json_file(&path, &json!({"k": "w"})).expect("rewrite");
        let back: serde_json::Value = read_json_file(&path).expect("read");
        assert_eq!(back["k"], json!("w"));
    }

    #[test]
    fn delete_file_ignores_missing_files() {
        let dir = TempDir::new().expect("tempdir");
        delete_file(&dir.path().join("nope")).expect("missing file is fine");
    }
}
