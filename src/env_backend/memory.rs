use std::collections::BTreeMap;
use std::sync::Mutex;

use super::EnvironmentBackend;
use crate::error::BackendError;

/// 进程内存中的变量表，用于测试以及由调用方自行持久化的嵌入场景
#[derive(Debug, Default)]
pub struct MemoryBackend {
    vars: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl EnvironmentBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_user_var(&self, name: &str) -> String {
        self.vars
            .lock()
            .ok()
            .and_then(|v| v.get(name).cloned())
            .unwrap_or_default()
    }

    fn set_user_var(&self, name: &str, value: &str) -> Result<(), BackendError> {
        let mut vars = self
            .vars
            .lock()
            .map_err(|e| BackendError::Io(format!("lock poisoned: {e}")))?;
        vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_user_var(&self, name: &str) -> Result<(), BackendError> {
        let mut vars = self
            .vars
            .lock()
            .map_err(|e| BackendError::Io(format!("lock poisoned: {e}")))?;
        vars.remove(name);
        Ok(())
    }
}
