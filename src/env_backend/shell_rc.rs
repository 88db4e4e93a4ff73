use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use regex::Regex;

use super::{run_with_timeout, EnvironmentBackend, BACKEND_TIMEOUT};
use crate::error::BackendError;

pub const MARKER_BEGIN: &str = "# >>> claude-ez-switch >>>";
pub const MARKER_END: &str = "# <<< claude-ez-switch <<<";

/// 按优先级列出候选 shell 启动文件，当前 `$SHELL` 对应的文件排在最前
pub fn default_rc_candidates(home: &Path) -> Vec<PathBuf> {
    let shell = std::env::var("SHELL").unwrap_or_default();
    let mut names: Vec<&str> = Vec::new();

    if shell.contains("zsh") {
        names.push(".zshrc");
    } else if shell.contains("bash") {
        if cfg!(target_os = "macos") {
            names.push(".bash_profile");
        } else {
            names.push(".bashrc");
        }
    }
    for name in [".bashrc", ".zshrc", ".bash_profile", ".profile"] {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names.into_iter().map(|n| home.join(n)).collect()
}

/// 以 `export NAME="VALUE"` 行表示用户环境变量。
///
/// 所有受管理的行位于标记块内；设置变量前会先删除文件中同名的 export 行，
/// 因此重复设置不会留下冲突的定义。
///
/// 文件的读改写在 `write_lock` 下完成；超时返回后仍在运行的工作线程
/// 与之后的改写按顺序执行，后者总是基于最新内容。
#[derive(Debug, Clone)]
pub struct ShellRcBackend {
    candidates: Vec<PathBuf>,
    timeout: Duration,
    write_lock: Arc<Mutex<()>>,
}

impl ShellRcBackend {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            timeout: BACKEND_TIMEOUT,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// 第一个已存在且可写的候选文件；都不存在时取第一个父目录存在的候选
    pub fn resolve_target(&self) -> Result<PathBuf, BackendError> {
        if let Some(existing) = self
            .candidates
            .iter()
            .find(|p| p.is_file() && is_writable(p))
        {
            return Ok(existing.clone());
        }

        self.candidates
            .iter()
            .find(|p| !p.exists() && p.parent().map(Path::is_dir).unwrap_or(false))
            .cloned()
            .ok_or(BackendError::NoWritableTarget)
    }

    fn rewrite<F>(&self, edit: F) -> Result<(), BackendError>
    where
        F: FnOnce(&str) -> Option<String> + Send + 'static,
    {
        let target = self.resolve_target()?;
        let lock = Arc::clone(&self.write_lock);
        run_with_timeout(self.timeout, move || {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let content = match fs::read_to_string(&target) {
                Ok(c) => c,
                Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
                Err(e) => return Err(BackendError::io(&target, e)),
            };
            let Some(updated) = edit(&content) else {
                return Ok(());
            };
            // 直接写回而不是重命名，保留 dotfile 软链接
            fs::write(&target, updated).map_err(|e| BackendError::io(&target, e))?;
            log::debug!("updated shell rc file {}", target.display());
            Ok(())
        })
    }
}

fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

impl EnvironmentBackend for ShellRcBackend {
    fn name(&self) -> &'static str {
        "shell-rc"
    }

    fn get_user_var(&self, name: &str) -> String {
        let Ok(target) = self.resolve_target() else {
            return String::new();
        };
        fs::read_to_string(&target)
            .ok()
            .and_then(|content| find_export(&content, name))
            .unwrap_or_default()
    }

    fn set_user_var(&self, name: &str, value: &str) -> Result<(), BackendError> {
        let name = name.to_string();
        let line = format!("export {}=\"{}\"", name, escape_value(value));
        self.rewrite(move |content| {
            let (stripped, _) = strip_exports(content, &name);
            Some(insert_into_block(&stripped, &line))
        })
    }

    fn remove_user_var(&self, name: &str) -> Result<(), BackendError> {
        // 没有候选文件可写时也就不可能存在该变量
        if matches!(self.resolve_target(), Err(BackendError::NoWritableTarget)) {
            return Ok(());
        }
        let name = name.to_string();
        self.rewrite(move |content| {
            let (stripped, removed) = strip_exports(content, &name);
            removed.then(|| drop_empty_block(&stripped))
        })
    }
}

fn export_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"^\s*export\s+{}=", regex::escape(name)))
        .expect("escaped variable name always forms a valid pattern")
}

/// 原文件的换行风格：CRLF 或 LF，以及末尾是否有换行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineStyle {
    eol: &'static str,
    trailing: bool,
}

impl LineStyle {
    fn detect(content: &str) -> Self {
        Self {
            eol: if content.contains("\r\n") { "\r\n" } else { "\n" },
            trailing: content.is_empty() || content.ends_with('\n'),
        }
    }

    fn join(&self, lines: &[&str]) -> String {
        if lines.is_empty() {
            return String::new();
        }
        let mut out = lines.join(self.eol);
        if self.trailing {
            out.push_str(self.eol);
        }
        out
    }
}

/// 删除所有 `export NAME=` 行，返回新内容以及是否删除过
fn strip_exports(content: &str, name: &str) -> (String, bool) {
    let pattern = export_pattern(name);
    let mut removed = false;
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            let hit = pattern.is_match(line);
            removed |= hit;
            !hit
        })
        .collect();
    (LineStyle::detect(content).join(&kept), removed)
}

fn insert_into_block(content: &str, line: &str) -> String {
    let mut lines: Vec<&str> = content.lines().collect();
    let begin = lines.iter().position(|l| l.trim() == MARKER_BEGIN);
    let end = lines.iter().rposition(|l| l.trim() == MARKER_END);

    match (begin, end) {
        (Some(b), Some(e)) if b < e => {
            lines.insert(e, line);
        }
        _ => {
            if lines.last().map(|l| !l.trim().is_empty()).unwrap_or(false) {
                lines.push("");
            }
            lines.push(MARKER_BEGIN);
            lines.push(line);
            lines.push(MARKER_END);
        }
    }
    LineStyle::detect(content).join(&lines)
}

/// 标记块内已无任何行时移除标记
fn drop_empty_block(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let begin = lines.iter().position(|l| l.trim() == MARKER_BEGIN);
    let end = lines.iter().rposition(|l| l.trim() == MARKER_END);

    let (Some(b), Some(e)) = (begin, end) else {
        return content.to_string();
    };
    if e != b + 1 {
        return content.to_string();
    }

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    kept.extend_from_slice(&lines[..b]);
    kept.extend_from_slice(&lines[e + 1..]);
    // 去掉插入块时补上的空行
    if b == kept.len() && kept.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        kept.pop();
    }
    LineStyle::detect(content).join(&kept)
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 读取最后一条 `export NAME=...` 的值
fn find_export(content: &str, name: &str) -> Option<String> {
    let pattern = export_pattern(name);
    content
        .lines()
        .filter_map(|line| {
            let m = pattern.find(line)?;
            Some(parse_shell_value(&line[m.end()..]))
        })
        .last()
}

fn parse_shell_value(raw: &str) -> String {
    let mut chars = raw.trim_start().chars();
    match chars.next() {
        Some('"') => {
            let mut out = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(next) = chars.next() {
                            if !matches!(next, '\\' | '"' | '$' | '`') {
                                out.push('\\');
                            }
                            out.push(next);
                        }
                    }
                    other => out.push(other),
                }
            }
            out
        }
        Some('\'') => chars.take_while(|c| *c != '\'').collect(),
        Some(first) => std::iter::once(first)
            .chain(chars)
            .take_while(|c| !c.is_whitespace() && *c != ';' && *c != '#')
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend_in(dir: &TempDir) -> (ShellRcBackend, PathBuf) {
        let rc = dir.path().join(".bashrc");
        let backend = ShellRcBackend::new(vec![rc.clone(), dir.path().join(".profile")]);
        (backend, rc)
    }

    fn export_lines(content: &str, name: &str) -> usize {
        let pattern = export_pattern(name);
        content.lines().filter(|l| pattern.is_match(l)).count()
    }

    #[test]
    fn setting_twice_leaves_single_export() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        fs::write(&rc, "alias ll='ls -l'\nexport PATH=\"$HOME/bin:$PATH\"\n").expect("seed rc");

        backend.set_user_var("ANTHROPIC_BASE_URL", "x").expect("first set");
        backend.set_user_var("ANTHROPIC_BASE_URL", "y").expect("second set");

        assert_eq!(backend.get_user_var("ANTHROPIC_BASE_URL"), "y");
        let content = fs::read_to_string(&rc).expect("read rc");
        assert_eq!(export_lines(&content, "ANTHROPIC_BASE_URL"), 1);
        assert!(content.starts_with("alias ll='ls -l'\nexport PATH="));
        assert_eq!(content.matches(MARKER_BEGIN).count(), 1);
    }

    #[test]
    fn set_replaces_user_written_export_outside_block() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        fs::write(&rc, "export ANTHROPIC_AUTH_TOKEN=old\n").expect("seed rc");

        backend.set_user_var("ANTHROPIC_AUTH_TOKEN", "new").expect("set");

        let content = fs::read_to_string(&rc).expect("read rc");
        assert_eq!(export_lines(&content, "ANTHROPIC_AUTH_TOKEN"), 1);
        assert!(!content.contains("=old"));
    }

    #[test]
    fn similar_names_are_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        fs::write(&rc, "export ANTHROPIC_API_KEY_BACKUP=\"keep\"\n").expect("seed rc");

        backend.set_user_var("ANTHROPIC_API_KEY", "v").expect("set");
        backend.remove_user_var("ANTHROPIC_API_KEY").expect("remove");

        assert_eq!(
            fs::read_to_string(&rc).expect("read rc"),
            "export ANTHROPIC_API_KEY_BACKUP=\"keep\"\n"
        );
    }

    #[test]
    fn remove_restores_original_content() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        let original = "# my rc\nexport EDITOR=vim\n";
        fs::write(&rc, original).expect("seed rc");

        backend.set_user_var("API_TIMEOUT_MS", "3000000").expect("set");
        backend.remove_user_var("API_TIMEOUT_MS").expect("remove");

        assert_eq!(fs::read_to_string(&rc).expect("read rc"), original);
        assert_eq!(backend.get_user_var("API_TIMEOUT_MS"), "");
    }

    #[test]
    fn removing_unset_variable_is_a_noop() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        fs::write(&rc, "export EDITOR=vim\n").expect("seed rc");

        backend.remove_user_var("ANTHROPIC_AUTH_TOKEN").expect("noop remove");
        assert_eq!(fs::read_to_string(&rc).expect("read rc"), "export EDITOR=vim\n");
    }

    #[test]
    fn missing_rc_file_is_created_in_existing_home() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);

        backend.set_user_var("ANTHROPIC_AUTH_TOKEN", "tok").expect("set");
        assert!(rc.exists());
        assert_eq!(backend.get_user_var("ANTHROPIC_AUTH_TOKEN"), "tok");
    }

    #[test]
    fn existing_later_candidate_wins_over_missing_earlier_one() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, _) = backend_in(&dir);
        let profile = dir.path().join(".profile");
        fs::write(&profile, "").expect("seed profile");

        assert_eq!(backend.resolve_target().expect("target"), profile);
    }

    #[test]
    fn no_candidate_directory_means_no_writable_target() {
        let dir = TempDir::new().expect("tempdir");
        let backend = ShellRcBackend::new(vec![dir.path().join("missing").join(".bashrc")]);

        assert_eq!(
            backend.set_user_var("A", "b"),
            Err(BackendError::NoWritableTarget)
        );
        assert_eq!(backend.get_user_var("A"), "");
        backend.remove_user_var("A").expect("nothing to remove");
    }

    #[test]
    fn values_with_shell_metacharacters_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, _) = backend_in(&dir);
        let value = r"a$b`c\d";

        backend.set_user_var("ANTHROPIC_AUTH_TOKEN", value).expect("set");
        assert_eq!(backend.get_user_var("ANTHROPIC_AUTH_TOKEN"), value);
    }

    #[test]
    fn crlf_line_endings_survive_set_and_remove() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        let original = "# windows-edited rc\r\nexport EDITOR=vim\r\n";
        fs::write(&rc, original).expect("seed rc");

        backend.set_user_var("ANTHROPIC_AUTH_TOKEN", "tok").expect("set");
        let content = fs::read_to_string(&rc).expect("read rc");
        assert!(content.starts_with(original));
        assert_eq!(content.matches('\n').count(), content.matches("\r\n").count());
        assert_eq!(backend.get_user_var("ANTHROPIC_AUTH_TOKEN"), "tok");

        backend.remove_user_var("ANTHROPIC_AUTH_TOKEN").expect("remove");
        assert_eq!(fs::read_to_string(&rc).expect("read rc"), original);
    }

    #[test]
    fn missing_final_newline_is_not_added() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        let original = "export EDITOR=vim";
        fs::write(&rc, original).expect("seed rc");

        backend.set_user_var("ANTHROPIC_BASE_URL", "https://x.example").expect("set");
        let content = fs::read_to_string(&rc).expect("read rc");
        assert!(content.ends_with(MARKER_END));

        backend.remove_user_var("ANTHROPIC_BASE_URL").expect("remove");
        assert_eq!(fs::read_to_string(&rc).expect("read rc"), original);
    }

    #[cfg(unix)]
    #[test]
    fn write_failure_is_reported_as_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        // 悬空软链接指向不存在的目录，写入必然失败
        std::os::unix::fs::symlink(dir.path().join("absent").join("rc"), &rc).expect("symlink");

        let err = backend.set_user_var("ANTHROPIC_AUTH_TOKEN", "tok").unwrap_err();
        assert!(matches!(err, BackendError::Io(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn slow_rewrite_times_out_and_completes_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let (backend, rc) = backend_in(&dir);
        fs::write(&rc, "export EDITOR=vim\n").expect("seed rc");
        let backend = backend.with_timeout(Duration::from_millis(50));

        let held = backend.write_lock.lock().expect("hold write lock");
        let err = backend.set_user_var("ANTHROPIC_AUTH_TOKEN", "late").unwrap_err();
        assert_eq!(err, BackendError::Timeout(Duration::from_millis(50)));
        drop(held);

        let patient = backend.clone().with_timeout(Duration::from_secs(5));
        patient.set_user_var("ANTHROPIC_BASE_URL", "https://x.example").expect("set");

        // 迟到的写入在锁释放后完成，不会覆盖之后的改写
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while patient.get_user_var("ANTHROPIC_AUTH_TOKEN").is_empty() {
            assert!(std::time::Instant::now() < deadline, "late write never landed");
            std::thread::sleep(Duration::from_millis(10));
        }
        let content = fs::read_to_string(&rc).expect("read rc");
        assert_eq!(export_lines(&content, "ANTHROPIC_AUTH_TOKEN"), 1);
        assert_eq!(export_lines(&content, "ANTHROPIC_BASE_URL"), 1);
        assert_eq!(content.matches(MARKER_BEGIN).count(), 1);
    }

    #[test]
    fn parses_unquoted_and_single_quoted_values() {
        assert_eq!(parse_shell_value("plain # comment"), "plain");
        assert_eq!(parse_shell_value("'single quoted'"), "single quoted");
        assert_eq!(parse_shell_value("\"with \\\"quote\\\"\""), "with \"quote\"");
    }

    #[test]
    fn shell_specific_rc_comes_first() {
        let home = Path::new("/home/u");
        let candidates = default_rc_candidates(home);
        assert!(candidates.contains(&home.join(".profile")));
        assert_eq!(
            candidates.len(),
            4,
            "each rc file appears exactly once: {candidates:?}"
        );
    }
}
