use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::filter::portable_glob;
use crate::searcher::{find_program, run_invocation, BackendKind, Candidates, Invocation, SearchBackend};
use crate::types::SearchQuery;

/// Unix `find` 后端，Windows 上不可用（同名程序是另一个工具）
#[derive(Debug, Clone)]
pub struct FindBackend {
    find_path: Option<PathBuf>,
    timeout: Duration,
}

impl FindBackend {
    pub fn new(find_path: Option<PathBuf>, timeout: Duration) -> Self {
        Self { find_path, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let find_path = if cfg!(windows) { None } else { find_program("find") };
        Self::new(find_path, settings.tool_timeout())
    }

    /// 由查询构造 find 命令，不启动进程
    ///
    /// 大小用字节单位 `c`，避免 `k` 向上取整把边界上的文件漏掉；
    /// 时间条件 find 只能按天，精度不够就不翻译，交给统一过滤。
    pub fn invocation(&self, query: &SearchQuery) -> Invocation {
        let program = self.find_path.clone().unwrap_or_else(|| PathBuf::from("find"));
        let mut inv = Invocation::new(program);
        inv.arg(&query.path);

        if !query.recursive {
            inv.args(["-maxdepth", "1"]);
        }

        // ( -type f [大小] -o -type l )：符号链接的 -size 量的是链接本身，链接交给统一过滤
        inv.args(["(", "-type", "f"]);
        // -size +Nc 是严格大于，-size -Nc 是严格小于
        if let Some(min) = query.min_size.filter(|m| *m > 0) {
            inv.arg("-size").arg(format!("+{}c", min - 1));
        }
        if let Some(max) = query.max_size {
            inv.arg("-size").arg(format!("-{}c", max.saturating_add(1)));
        }
        inv.args(["-o", "-type", "l", ")"]);

        // find 不认 `{a,b}`，这种通配符交给统一过滤
        if let Some(pattern) = query
            .name_pattern()
            .and_then(portable_glob)
            .filter(|p| !p.contains('{'))
        {
            inv.arg("-iname").arg(pattern);
        }

        let extensions = query.normalized_extensions();
        if !extensions.is_empty() {
            inv.arg("(");
            for (i, ext) in extensions.iter().enumerate() {
                if i > 0 {
                    inv.arg("-o");
                }
                inv.arg("-iname").arg(format!("*{}", ext));
            }
            inv.arg(")");
        }

        inv
    }
}

impl SearchBackend for FindBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Find
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> Candidates<'a> {
        let inv = self.invocation(query);
        Box::new(run_invocation(&inv, self.timeout).unwrap_or_default().into_iter())
    }

    fn is_available(&self) -> bool {
        self.find_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(query: &SearchQuery) -> Vec<String> {
        FindBackend::new(Some(PathBuf::from("find")), Duration::from_secs(1))
            .invocation(query)
            .args_lossy()
    }

    const TYPES: [&str; 7] = ["(", "-type", "f", "-o", "-type", "l", ")"];

    fn expected(prefix: &[&str], rest: &[&str]) -> Vec<String> {
        prefix
            .iter()
            .chain(TYPES.iter())
            .chain(rest.iter())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn basic_command() {
        let q = SearchQuery::new("/test");
        let inv = FindBackend::new(Some(PathBuf::from("find")), Duration::from_secs(1)).invocation(&q);
        assert_eq!(inv.program, PathBuf::from("find"));
        assert_eq!(inv.args_lossy(), expected(&["/test"], &[]));
        assert!(inv.current_dir.is_none());
    }

    #[test]
    fn non_recursive_puts_maxdepth_first() {
        let q = SearchQuery::new("/test").recursive(false);
        assert_eq!(args(&q), expected(&["/test", "-maxdepth", "1"], &[]));
    }

    #[test]
    fn extensions_are_or_grouped() {
        let q = SearchQuery::new("/test").with_extensions(["py", ".TXT"]);
        assert_eq!(
            args(&q),
            expected(&["/test"], &["(", "-iname", "*.py", "-o", "-iname", "*.txt", ")"])
        );
    }

    #[test]
    fn sizes_apply_to_regular_files_only() {
        let q = SearchQuery::new("/test").with_size(Some(100), Some(2048));
        assert_eq!(
            args(&q),
            vec![
                "/test", "(", "-type", "f", "-size", "+99c", "-size", "-2049c", "-o", "-type", "l", ")"
            ]
        );

        // 最小值为 0 不需要条件
        let q = SearchQuery::new("/test").with_size(Some(0), None);
        assert!(!args(&q).contains(&"-size".to_string()));
    }

    #[test]
    fn pattern_is_case_insensitive() {
        let q = SearchQuery::new("/test").with_pattern("Test*");
        let a = args(&q);
        let i = a.iter().position(|s| s == "-iname").unwrap();
        assert_eq!(a[i + 1], "Test*");
    }

    #[test]
    fn unportable_patterns_are_left_to_the_filter() {
        for pattern in ["{a,b}.txt", "[draft", r"a\b.txt"] {
            let q = SearchQuery::new("/test").with_pattern(pattern);
            assert!(!args(&q).contains(&"-iname".to_string()), "{}", pattern);
        }

        // 以 - 开头的模式作为 -iname 的参数，不会被当成表达式
        let q = SearchQuery::new("/test").with_pattern("-draft*");
        assert_eq!(args(&q), expected(&["/test"], &["-iname", "-draft*"]));
    }

    #[test]
    fn time_bounds_are_left_to_the_filter() {
        let now = chrono::Local::now();
        let q = SearchQuery::new("/test").with_modified(Some(now), Some(now));
        assert_eq!(args(&q), expected(&["/test"], &[]));
    }
}
