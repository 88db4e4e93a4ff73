//! 用户级持久环境变量的存储后端。
//!
//! Windows 下写入注册表 `HKCU\Environment`，其他平台写入 shell 启动文件中的
//! `export NAME="VALUE"` 行。后端在启动时选定一次，之后不再按调用检测平台。

mod memory;
#[cfg(windows)]
mod registry;
mod shell_rc;

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::BackendError;

pub use memory::MemoryBackend;
#[cfg(windows)]
pub use registry::RegistryBackend;
pub use shell_rc::{default_rc_candidates, ShellRcBackend, MARKER_BEGIN, MARKER_END};

/// 后端调用的等待上限。超时只停止等待，工作线程仍可能随后完成写入；
/// shell rc 后端用文件锁把这类迟到的写入与后续改写串行化。
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

pub trait EnvironmentBackend: Send + Sync {
    /// 后端名称，用于日志与状态显示
    fn name(&self) -> &'static str;

    /// 读取持久化的用户变量，未设置时返回空字符串
    fn get_user_var(&self, name: &str) -> String;

    fn set_user_var(&self, name: &str, value: &str) -> Result<(), BackendError>;

    /// 删除变量；变量不存在时视为成功
    fn remove_user_var(&self, name: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// 按平台自动选择
    #[default]
    Auto,
    /// Windows 用户环境变量（注册表）
    Registry,
    /// shell 启动文件中的 export 行
    ShellRc,
}

impl BackendKind {
    /// 构造具体后端，`Auto` 在此处一次性解析为平台实现
    pub fn build(self, home: &std::path::Path) -> Result<Arc<dyn EnvironmentBackend>, BackendError> {
        let kind = match self {
            Self::Auto if cfg!(windows) => Self::Registry,
            Self::Auto => Self::ShellRc,
            other => other,
        };
        log::debug!("selected environment backend: {kind:?}");

        match kind {
            Self::Registry => registry_backend(),
            _ => Ok(Arc::new(ShellRcBackend::new(default_rc_candidates(home)))),
        }
    }
}

#[cfg(windows)]
fn registry_backend() -> Result<Arc<dyn EnvironmentBackend>, BackendError> {
    Ok(Arc::new(RegistryBackend::new()))
}

#[cfg(not(windows))]
fn registry_backend() -> Result<Arc<dyn EnvironmentBackend>, BackendError> {
    Err(BackendError::Unsupported(
        "the registry backend is only available on Windows",
    ))
}

/// 读取当前进程环境，仅用于显示，从不作为持久化来源
pub fn process_var(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

/// 在工作线程中执行后端调用，超过 `limit` 时返回 `BackendError::Timeout`。
/// 超时后工作线程仍会在后台结束，其结果被丢弃。
pub fn run_with_timeout<T, F>(limit: Duration, f: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("env-backend".into())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|e| BackendError::Io(format!("failed to spawn backend worker: {e}")))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(BackendError::Timeout(limit)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(BackendError::Io("backend worker exited without a result".into()))
        }
    }
}
