use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::filter::portable_glob;
use crate::searcher::{find_program, run_invocation, BackendKind, Candidates, Invocation, SearchBackend};
use crate::types::SearchQuery;

/// fd 可能的可执行文件名（Debian 系叫 fdfind）
const FD_NAMES: [&str; 2] = ["fd", "fdfind"];

/// fd 后端 (https://github.com/sharkdp/fd)
#[derive(Debug, Clone)]
pub struct FdBackend {
    fd_path: Option<PathBuf>,
    timeout: Duration,
}

impl FdBackend {
    pub fn new(fd_path: Option<PathBuf>, timeout: Duration) -> Self {
        Self { fd_path, timeout }
    }

    /// 配置里指定了路径就只认这一个，否则在 PATH 中查找
    pub fn from_settings(settings: &Settings) -> Self {
        let fd_path = match &settings.fd_path {
            Some(p) => p.is_file().then(|| p.clone()),
            None => FD_NAMES.iter().find_map(|name| find_program(name)),
        };
        Self::new(fd_path, settings.tool_timeout())
    }

    /// 由查询构造 fd 命令，不启动进程
    ///
    /// 只翻译不会缩小候选集的参数：`--no-ignore`/`--no-ignore-vcs` 让 .gitignore 里的文件
    /// 和 .git 目录也能出现；始终 `--hidden`，隐藏目录里的文件要进候选，点文件由统一过滤剔除；
    /// `--type l` 带上符号链接，指向哪里由统一过滤判断。
    pub fn invocation(&self, query: &SearchQuery) -> Invocation {
        let program = self.fd_path.clone().unwrap_or_else(|| PathBuf::from("fd"));
        let mut inv = Invocation::new(program);
        inv.args(["--type", "f", "--type", "l"]);
        inv.args(["--hidden", "--no-ignore", "--no-ignore-vcs", "--color", "never"]);

        if !query.recursive {
            inv.args(["--max-depth", "1"]);
        }

        for ext in query.normalized_extensions() {
            inv.arg("--extension").arg(ext.trim_start_matches('.'));
        }

        // 大小不翻译：--size 对符号链接不一定按目标文件计算，会漏掉链接

        match query.name_pattern().and_then(portable_glob) {
            Some(pattern) => {
                inv.args(["--glob", "--ignore-case", "--"]).arg(pattern);
            }
            None => {
                inv.arg(".");
            }
        }

        inv.current_dir(&query.path);
        inv
    }
}

impl SearchBackend for FdBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Fd
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> Candidates<'a> {
        let inv = self.invocation(query);
        let lines = run_invocation(&inv, self.timeout).unwrap_or_default();
        // 在根目录下运行，输出是相对路径
        Box::new(lines.into_iter().map(move |line| query.path.join(line)))
    }

    fn is_available(&self) -> bool {
        self.fd_path.is_some()
    }
}
