use std::sync::Arc;

use crate::claude_settings::SettingsFileBackend;
use crate::config::AppPaths;
use crate::env_backend::{BackendKind, EnvironmentBackend};
use crate::error::AppError;
use crate::profile::ProfileStore;
use crate::services::{ConfigApplier, ConfigResolver};

/// 启动时构建一次并显式传递给各组件：文件位置、选定的环境变量后端，
/// 以及整个进程共享的 `ConfigApplier`（保证同一时间只有一个 apply）。
#[derive(Clone)]
pub struct SwitchContext {
    paths: AppPaths,
    env: Arc<dyn EnvironmentBackend>,
    applier: Arc<ConfigApplier>,
}

impl SwitchContext {
    pub fn new(paths: AppPaths, env: Arc<dyn EnvironmentBackend>) -> Self {
        let applier = Arc::new(ConfigApplier::new(
            env.clone(),
            SettingsFileBackend::new(&paths.claude_settings_file),
        ));
        Self {
            paths,
            env,
            applier,
        }
    }

    /// 探测当前用户的路径并按 `kind` 选定后端
    pub fn from_system(kind: BackendKind) -> Result<Self, AppError> {
        let paths = AppPaths::detect()?;
        let env = kind
            .build(&paths.home)
            .map_err(|e| AppError::Config(e.to_string()))?;
        log::debug!("environment backend: {}", env.name());
        Ok(Self::new(paths, env))
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn env(&self) -> &Arc<dyn EnvironmentBackend> {
        &self.env
    }

    pub fn settings(&self) -> SettingsFileBackend {
        SettingsFileBackend::new(&self.paths.claude_settings_file)
    }

    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::new(self.env.clone(), self.settings())
    }

    pub fn applier(&self) -> Arc<ConfigApplier> {
        self.applier.clone()
    }

    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::load(&self.paths)
    }
}
