use serde::Serialize;
use std::sync::{Arc, Mutex, TryLockError};

use crate::claude_settings::SettingsFileBackend;
use crate::env_backend::EnvironmentBackend;
use crate::error::AppError;
use crate::target::{ConfigMode, ConfigurationTarget};

/// 切换后需要重启 Claude Code 才能生效
pub const RESTART_ADVISORY: &str = "You must close and reopen VS Code or any application using Claude Code for the changes to take effect. If you only use the terminal, open a new terminal session.";

/// 单次 apply 所处的阶段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyPhase {
    Idle,
    Validating,
    WritingEnvironment,
    WritingSettings,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub mode: ConfigMode,
    /// 写入了值的用户环境变量
    pub env_set: Vec<String>,
    /// 被删除的用户环境变量
    pub env_removed: Vec<String>,
    /// 写入 settings.json `env` 的键（包括清空为 "" 的键）
    pub settings_keys: Vec<String>,
    pub advisory: &'static str,
}

/// 把目标配置写入用户环境变量和 settings.json。
///
/// 同一时刻只允许一个 apply；并发调用立即返回 `AppError::Busy`。
/// 环境变量逐个写入，失败即停止，已写入的变量不回滚，而是在错误中列出。
pub struct ConfigApplier {
    env: Arc<dyn EnvironmentBackend>,
    settings: SettingsFileBackend,
    in_flight: Mutex<()>,
    phase: Mutex<ApplyPhase>,
}

impl ConfigApplier {
    pub fn new(env: Arc<dyn EnvironmentBackend>, settings: SettingsFileBackend) -> Self {
        Self {
            env,
            settings,
            in_flight: Mutex::new(()),
            phase: Mutex::new(ApplyPhase::Idle),
        }
    }

    pub fn phase(&self) -> ApplyPhase {
        self.phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_phase(&self, phase: ApplyPhase) {
        log::debug!("apply phase -> {phase:?}");
        match self.phase.lock() {
            Ok(mut guard) => *guard = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }

    pub fn apply(&self, target: &ConfigurationTarget) -> Result<ApplyOutcome, AppError> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AppError::Busy),
            // 上一次 apply 中途 panic 不影响文件状态，继续使用锁
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        match self.run(target) {
            Ok(outcome) => {
                self.set_phase(ApplyPhase::Succeeded);
                log::info!("applied {} configuration", outcome.mode);
                Ok(outcome)
            }
            Err(err) => {
                self.set_phase(ApplyPhase::Failed(err.to_string()));
                log::warn!("apply failed: {err}");
                Err(err)
            }
        }
    }

    fn run(&self, target: &ConfigurationTarget) -> Result<ApplyOutcome, AppError> {
        self.set_phase(ApplyPhase::Validating);
        target.validate()?;
        let plan = target.plan();

        self.set_phase(ApplyPhase::WritingEnvironment);
        let mut env_set = Vec::new();
        let mut env_removed = Vec::new();
        let mut applied: Vec<String> = Vec::new();

        for (name, value) in &plan.entries {
            let result = match value {
                Some(v) => self.env.set_user_var(name, v),
                None => self.env.remove_user_var(name),
            };
            if let Err(source) = result {
                return Err(AppError::backend(name.clone(), applied, source));
            }
            applied.push(name.clone());
            match value {
                Some(_) => env_set.push(name.clone()),
                None => env_removed.push(name.clone()),
            }
        }

        self.set_phase(ApplyPhase::WritingSettings);
        let settings_env = plan.settings_env();
        self.settings.merge(&settings_env)?;

        Ok(ApplyOutcome {
            mode: target.mode(),
            env_set,
            env_removed,
            settings_keys: settings_env.keys().cloned().collect(),
            advisory: RESTART_ADVISORY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_backend::MemoryBackend;
    use crate::error::BackendError;
    use crate::target::{ANTHROPIC_AUTH_TOKEN, ANTHROPIC_BASE_URL, KNOWN_KEYS};
    use serde_json::json;
    use tempfile::TempDir;

    /// 写到指定变量时失败
    struct FailingBackend {
        inner: MemoryBackend,
        fail_on: &'static str,
    }

    impl EnvironmentBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn get_user_var(&self, name: &str) -> String {
            self.inner.get_user_var(name)
        }
        fn set_user_var(&self, name: &str, value: &str) -> Result<(), BackendError> {
            if name == self.fail_on {
                return Err(BackendError::Io("access denied".into()));
            }
            self.inner.set_user_var(name, value)
        }
        fn remove_user_var(&self, name: &str) -> Result<(), BackendError> {
            self.inner.remove_user_var(name)
        }
    }

    fn settings(dir: &TempDir) -> SettingsFileBackend {
        SettingsFileBackend::new(dir.path().join(".claude").join("settings.json"))
    }

    #[test]
    fn validation_failure_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let env = Arc::new(MemoryBackend::new());
        let applier = ConfigApplier::new(env.clone(), settings(&dir));

        let err = applier
            .apply(&ConfigurationTarget::UseCustom {
                base_url: String::new(),
                auth_token: "tok".into(),
            })
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(env.snapshot().is_empty());
        assert!(!settings(&dir).path().exists());
        assert!(matches!(applier.phase(), ApplyPhase::Failed(_)));
    }

    #[test]
    fn provider_apply_writes_env_then_settings() {
        let dir = TempDir::new().expect("tempdir");
        let env = Arc::new(MemoryBackend::new());
        let applier = ConfigApplier::new(env.clone(), settings(&dir));

        let outcome = applier
            .apply(&ConfigurationTarget::zai("zai-token"))
            .expect("apply zai");

        assert_eq!(outcome.mode, ConfigMode::Zai);
        assert_eq!(outcome.advisory, RESTART_ADVISORY);
        assert_eq!(env.get_user_var(ANTHROPIC_AUTH_TOKEN), "zai-token");
        let doc = settings(&dir).read();
        assert_eq!(doc["env"][ANTHROPIC_AUTH_TOKEN], json!("zai-token"));
        assert_eq!(doc["env"]["ANTHROPIC_API_KEY"], json!(""));
        assert_eq!(applier.phase(), ApplyPhase::Succeeded);
    }

    #[test]
    fn subscription_after_provider_clears_every_key_to_empty() {
        let dir = TempDir::new().expect("tempdir");
        let env = Arc::new(MemoryBackend::new());
        let applier = ConfigApplier::new(env.clone(), settings(&dir));

        applier
            .apply(&ConfigurationTarget::zai("zai-token"))
            .expect("apply zai");
        let outcome = applier
            .apply(&ConfigurationTarget::UseSubscription)
            .expect("apply subscription");

        let doc = settings(&dir).read();
        for key in KNOWN_KEYS {
            assert_eq!(doc["env"][key], json!(""), "{key} should be cleared, not absent");
        }
        assert!(env.snapshot().is_empty());
        assert_eq!(outcome.env_removed.len(), KNOWN_KEYS.len());
    }

    #[test]
    fn backend_failure_stops_before_settings_and_reports_partial_writes() {
        let dir = TempDir::new().expect("tempdir");
        let env = Arc::new(FailingBackend {
            inner: MemoryBackend::new(),
            fail_on: ANTHROPIC_BASE_URL,
        });
        let applier = ConfigApplier::new(env.clone(), settings(&dir));

        let err = applier
            .apply(&ConfigurationTarget::UseCustom {
                base_url: "https://custom.example/v1".into(),
                auth_token: "tok".into(),
            })
            .unwrap_err();

        match err {
            AppError::Backend {
                var,
                applied,
                source,
            } => {
                assert_eq!(var, ANTHROPIC_BASE_URL);
                assert_eq!(applied, vec![ANTHROPIC_AUTH_TOKEN.to_string()]);
                assert_eq!(source, BackendError::Io("access denied".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // 已写入的变量保留，settings.json 未被触碰
        assert_eq!(env.get_user_var(ANTHROPIC_AUTH_TOKEN), "tok");
        assert!(!settings(&dir).path().exists());
    }

    #[test]
    fn settings_merge_keeps_foreign_keys() {
        let dir = TempDir::new().expect("tempdir");
        let settings_path = dir.path().join("settings.json");
        std::fs::write(&settings_path, r#"{"model": "opus", "env": {"OTHER": "1"}}"#)
            .expect("seed");
        let applier = ConfigApplier::new(
            Arc::new(MemoryBackend::new()),
            SettingsFileBackend::new(&settings_path),
        );

        applier
            .apply(&ConfigurationTarget::UseApiKey {
                api_key: "sk-abc".into(),
            })
            .expect("apply api key");

        let doc = SettingsFileBackend::new(&settings_path).read();
        assert_eq!(doc["model"], json!("opus"));
        assert_eq!(doc["env"]["OTHER"], json!("1"));
        assert_eq!(doc["env"][ANTHROPIC_AUTH_TOKEN], json!("sk-abc"));
        assert_eq!(doc["env"][ANTHROPIC_BASE_URL], json!(""));
    }
}
