use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::Settings;
use crate::searcher::{
    find_program, run_for_stdout, run_invocation, BackendKind, Candidates, Invocation, SearchBackend,
};
use crate::types::SearchQuery;

/// IPC 探测的超时
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything 常见安装位置
const COMMON_ES_PATHS: [&str; 2] = [
    r"C:\Program Files\Everything\es.exe",
    r"C:\Program Files (x86)\Everything\es.exe",
];

/// Everything 搜索后端 (voidtools es.exe，仅 Windows)
///
/// Everything 查的是全局 NTFS 索引，范围参数只是尽力而为，
/// 根目录之外的结果由统一过滤剔除。
#[derive(Debug, Clone)]
pub struct EverythingBackend {
    es_path: Option<PathBuf>,
    instance: String,
    timeout: Duration,
}

impl EverythingBackend {
    pub fn new(es_path: Option<PathBuf>, instance: impl Into<String>, timeout: Duration) -> Self {
        Self {
            es_path,
            instance: instance.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let es_path = if cfg!(windows) {
            match &settings.es_path {
                Some(p) => p.is_file().then(|| p.clone()),
                None => locate_es(),
            }
        } else {
            None
        };
        Self::new(es_path, settings.es_instance.clone(), settings.everything_timeout())
    }

    fn program(&self) -> PathBuf {
        self.es_path.clone().unwrap_or_else(|| PathBuf::from("es.exe"))
    }

    fn push_instance(&self, inv: &mut Invocation) {
        // 配置了实例名才加 -instance
        if !self.instance.is_empty() {
            inv.arg("-instance").arg(&self.instance);
        }
    }

    /// 由查询构造 es.exe 命令，不启动进程
    ///
    /// 每个搜索词单独成一个参数，避免整个查询被引号包住导致 es.exe 解析失败。
    pub fn invocation(&self, query: &SearchQuery) -> Invocation {
        let mut inv = Invocation::new(self.program());
        self.push_instance(&mut inv);

        let base = std::path::absolute(&query.path).unwrap_or_else(|_| query.path.clone());
        if query.recursive {
            inv.arg("-path").arg(base);
        } else {
            inv.arg("-parent").arg(base);
        }

        inv.arg("file:");

        let extensions = query.normalized_extensions();
        if !extensions.is_empty() {
            let joined: Vec<&str> = extensions.iter().map(|e| e.trim_start_matches('.')).collect();
            inv.arg(format!("ext:{}", joined.join(";")));
        }

        if let Some(min) = query.min_size {
            inv.arg(format!("size:>={}", min));
        }
        if let Some(max) = query.max_size {
            inv.arg(format!("size:<={}", max));
        }

        // 空格在 Everything 里是 AND，[] 不是通配符，`\` 会按路径匹配，`-` 开头会被当成 es.exe 选项：
        // 这些都会缩小结果，干脆不传
        if let Some(pattern) = query.name_pattern().filter(|p| {
            !p.starts_with('-')
                && !p
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '{' | '}' | '\\'))
        }) {
            inv.arg(pattern);
        }

        inv
    }

    /// es.exe 能连上 Everything 服务才算可用
    fn check_ipc(&self) -> bool {
        let mut inv = Invocation::new(self.program());
        self.push_instance(&mut inv);
        inv.arg("-get-everything-version");

        match run_for_stdout(&inv, PROBE_TIMEOUT) {
            Some(stdout) => {
                let version = String::from_utf8_lossy(&stdout);
                let v = version.trim();
                debug!("Everything 版本: {}", v);
                !v.is_empty() && v != "0.0.0.0"
            }
            None => false,
        }
    }
}

impl SearchBackend for EverythingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Everything
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> Candidates<'a> {
        let inv = self.invocation(query);
        Box::new(run_invocation(&inv, self.timeout).unwrap_or_default().into_iter())
    }

    fn is_available(&self) -> bool {
        cfg!(windows) && self.es_path.is_some() && self.check_ipc()
    }
}

/// 查找 es.exe：PATH → 程序目录下的 lib/ 与同级目录 → 常见安装位置
fn locate_es() -> Option<PathBuf> {
    if let Some(p) = find_program("es") {
        return Some(p);
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        // 绿色分发时 es.exe 放在程序旁边
        for candidate in [exe_dir.join("lib").join("es.exe"), exe_dir.join("es.exe")] {
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    COMMON_ES_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(instance: &str) -> EverythingBackend {
        EverythingBackend::new(Some(PathBuf::from("es")), instance, Duration::from_secs(1))
    }

    #[test]
    fn basic_command_scopes_to_path() {
        let q = SearchQuery::new("/test");
        let inv = backend("").invocation(&q);
        assert_eq!(inv.program, PathBuf::from("es"));
        let a = inv.args_lossy();
        assert_eq!(a[0], "-path");
        assert!(Path::new(&a[1]).is_absolute());
        assert!(a.contains(&"file:".to_string()));
        assert!(!a.contains(&"-instance".to_string()));
    }

    #[test]
    fn non_recursive_uses_parent() {
        let q = SearchQuery::new("/test").recursive(false);
        let a = backend("").invocation(&q).args_lossy();
        assert_eq!(a[0], "-parent");
    }

    #[test]
    fn instance_comes_first() {
        let q = SearchQuery::new("/test");
        let a = backend("1.5a").invocation(&q).args_lossy();
        assert_eq!(&a[..2], ["-instance", "1.5a"]);
    }

    #[test]
    fn filters_become_search_terms() {
        let q = SearchQuery::new("/test")
            .with_extensions(["py", ".md"])
            .with_size(Some(10), Some(20))
            .with_pattern("report*");
        let a = backend("").invocation(&q).args_lossy();
        assert!(a.contains(&"ext:py;md".to_string()));
        assert!(a.contains(&"size:>=10".to_string()));
        assert!(a.contains(&"size:<=20".to_string()));
        assert_eq!(a.last().map(String::as_str), Some("report*"));
    }

    #[test]
    fn narrowing_patterns_are_not_passed() {
        let q = SearchQuery::new("/test").with_pattern("my report*");
        let a = backend("").invocation(&q).args_lossy();
        assert_eq!(a.last().map(String::as_str), Some("file:"));

        for pattern in ["[ab]*.txt", "-draft*", r"docs\*.md"] {
            let q = SearchQuery::new("/test").with_pattern(pattern);
            let a = backend("").invocation(&q).args_lossy();
            assert_eq!(a.last().map(String::as_str), Some("file:"), "{}", pattern);
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn unavailable_off_windows() {
        assert!(!EverythingBackend::from_settings(&Settings::default()).is_available());
        assert!(!backend("").is_available());
    }
}
