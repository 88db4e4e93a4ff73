use std::io::ErrorKind;
use std::time::Duration;

use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};
use winreg::RegKey;

use super::{run_with_timeout, EnvironmentBackend, BACKEND_TIMEOUT};
use crate::error::BackendError;

const ENVIRONMENT_KEY: &str = "Environment";

/// 写入 `HKCU\Environment`，新启动的进程可见，无需管理员权限
#[derive(Debug, Clone)]
pub struct RegistryBackend {
    timeout: Duration,
}

impl RegistryBackend {
    pub fn new() -> Self {
        Self {
            timeout: BACKEND_TIMEOUT,
        }
    }
}

impl Default for RegistryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_environment(flags: u32) -> Result<RegKey, BackendError> {
    RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey_with_flags(ENVIRONMENT_KEY, flags)
        .map_err(|e| BackendError::Io(format!("HKCU\\{ENVIRONMENT_KEY}: {e}")))
}

impl EnvironmentBackend for RegistryBackend {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn get_user_var(&self, name: &str) -> String {
        let name = name.to_string();
        run_with_timeout(self.timeout, move || {
            let key = open_environment(KEY_READ)?;
            Ok(key.get_value::<String, _>(&name).unwrap_or_default())
        })
        .unwrap_or_else(|err| {
            log::warn!("reading user environment variable failed: {err}");
            String::new()
        })
    }

    fn set_user_var(&self, name: &str, value: &str) -> Result<(), BackendError> {
        let name = name.to_string();
        let value = value.to_string();
        run_with_timeout(self.timeout, move || {
            let key = open_environment(KEY_READ | KEY_WRITE)?;
            key.set_value(&name, &value)
                .map_err(|e| BackendError::Io(format!("{name}: {e}")))
        })
    }

    fn remove_user_var(&self, name: &str) -> Result<(), BackendError> {
        let name = name.to_string();
        run_with_timeout(self.timeout, move || {
            let key = open_environment(KEY_READ | KEY_WRITE)?;
            match key.delete_value(&name) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(BackendError::Io(format!("{name}: {e}"))),
            }
        })
    }
}
