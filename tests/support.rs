#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ez_switch_lib::{AppPaths, MemoryBackend, ShellRcBackend, SwitchContext};
use tempfile::TempDir;

/// 临时主目录及绑定在其上的上下文
pub struct TestHome {
    pub dir: TempDir,
    pub ctx: SwitchContext,
}

impl TestHome {
    pub fn rc_file(&self) -> PathBuf {
        self.dir.path().join(".bashrc")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.ctx.paths().claude_settings_file.clone()
    }

    pub fn read_settings(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.settings_file()).expect("read settings.json");
        serde_json::from_str(&content).expect("parse settings.json")
    }

    pub fn seed_settings(&self, value: &serde_json::Value) {
        let path = self.settings_file();
        fs::create_dir_all(path.parent().expect("settings parent")).expect("create .claude");
        fs::write(
            &path,
            serde_json::to_string_pretty(value).expect("serialize seed"),
        )
        .expect("seed settings.json");
    }
}

/// 使用 shell rc 后端，只有 `~/.bashrc` 一个候选
pub fn shell_rc_home() -> TestHome {
    let dir = TempDir::new().expect("create temp home");
    let paths = AppPaths::from_home(dir.path());
    let backend = ShellRcBackend::new(vec![dir.path().join(".bashrc")]);
    let ctx = SwitchContext::new(paths, Arc::new(backend));
    TestHome { dir, ctx }
}

pub fn memory_home() -> (TestHome, Arc<MemoryBackend>) {
    let dir = TempDir::new().expect("create temp home");
    let paths = AppPaths::from_home(dir.path());
    let backend = Arc::new(MemoryBackend::new());
    let ctx = SwitchContext::new(paths, backend.clone());
    (TestHome { dir, ctx }, backend)
}
