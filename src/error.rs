use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// 环境变量后端错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no writable location for user environment variables")]
    NoWritableTarget,
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend not supported on this platform: {0}")]
    Unsupported(&'static str),
}

impl BackendError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", path.as_ref().display(), source))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("failed to write {var}: {source}{}", applied_suffix(.applied))]
    Backend {
        var: String,
        /// 本次调用中已成功写入（不会回滚）的变量
        applied: Vec<String>,
        #[source]
        source: BackendError,
    },
    #[error("another configuration change is in progress, try again")]
    Busy,
    #[error("{0}")]
    Message(String),
}

fn applied_suffix(applied: &[String]) -> String {
    if applied.is_empty() {
        String::new()
    } else {
        format!(" (already applied: {})", applied.join(", "))
    }
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn backend(var: impl Into<String>, applied: Vec<String>, source: BackendError) -> Self {
        Self::Backend {
            var: var.into(),
            applied,
            source,
        }
    }

    /// 是否属于可以稍后重试的错误
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Message(format!("lock poisoned: {err}"))
    }
}
