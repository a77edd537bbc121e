use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::everything::EverythingBackend;
use crate::fd::FdBackend;
use crate::find::FindBackend;
use crate::types::SearchQuery;
use crate::walker::WalkBackend;

/// 后端产出的候选路径，未经校验
pub type Candidates<'a> = Box<dyn Iterator<Item = PathBuf> + 'a>;

/// 搜索后端：只负责"尽量快地给出候选"
///
/// 候选里可能混有目录、隐藏文件、越界的大小，最终结果一律由执行器的统一过滤决定。
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn search<'a>(&'a self, query: &'a SearchQuery) -> Candidates<'a>;

    /// 纯探测，工具缺失返回 false，不报错
    fn is_available(&self) -> bool;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Fd,
    Everything,
    Find,
    /// 进程内遍历，任何平台都可用
    Walk,
}

impl BackendKind {
    /// 自动选择的优先级：最快的在前，进程内遍历兜底
    pub const PRIORITY: [BackendKind; 4] = [Self::Fd, Self::Everything, Self::Find, Self::Walk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fd => "fd",
            Self::Everything => "everything",
            Self::Find => "find",
            Self::Walk => "python",
        }
    }

    pub fn build(self, settings: &Settings) -> Box<dyn SearchBackend> {
        match self {
            Self::Fd => Box::new(FdBackend::from_settings(settings)),
            Self::Everything => Box::new(EverythingBackend::from_settings(settings)),
            Self::Find => Box::new(FindBackend::from_settings(settings)),
            Self::Walk => Box::new(WalkBackend),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fd" => Ok(Self::Fd),
            "everything" | "es" => Ok(Self::Everything),
            "find" => Ok(Self::Find),
            "python" | "walk" | "builtin" => Ok(Self::Walk),
            other => Err(format!("未知后端: {}", other)),
        }
    }
}

/// 按优先级列出当前机器可用的后端
pub fn available_backends(settings: &Settings) -> Vec<Box<dyn SearchBackend>> {
    BackendKind::PRIORITY
        .iter()
        .map(|kind| kind.build(settings))
        .filter(|b| b.is_available())
        .collect()
}

/// 选择后端：显式指定且可用则用之，否则按优先级自动选择；永不失败
pub fn select_backend(preference: &str, settings: &Settings) -> Box<dyn SearchBackend> {
    let preference = preference.trim();
    if !preference.is_empty() && !preference.eq_ignore_ascii_case("auto") {
        match preference.parse::<BackendKind>() {
            Ok(kind) => {
                let backend = kind.build(settings);
                if backend.is_available() {
                    info!("使用指定后端: {}", kind);
                    return backend;
                }
                warn!("指定后端 '{}' 不可用，改为自动选择", kind);
            }
            Err(e) => warn!("{}，改为自动选择", e),
        }
    }

    for kind in BackendKind::PRIORITY {
        let backend = kind.build(settings);
        if backend.is_available() {
            info!("自动选择后端: {}", kind);
            return backend;
        }
    }

    Box::new(WalkBackend)
}

/// 一次外部工具调用：程序、参数、工作目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    /// 便于日志阅读的命令行
    pub fn command_line(&self) -> String {
        let mut words = vec![self.program.to_string_lossy().to_string()];
        words.extend(self.args_lossy());
        shell_words::join(words)
    }
}

/// 带超时地运行外部工具，返回 stdout 中的路径
///
/// 超时、启动失败、非零退出都返回 None 并告警，由调用方当作零候选。
pub fn run_invocation(invocation: &Invocation, timeout: Duration) -> Option<Vec<PathBuf>> {
    let stdout = run_for_stdout(invocation, timeout)?;
    Some(parse_path_lines(&stdout))
}

pub(crate) fn run_for_stdout(invocation: &Invocation, timeout: Duration) -> Option<Vec<u8>> {
    debug!("执行命令: {}", invocation.command_line());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            warn!("无法创建运行时: {}", e);
            return None;
        }
    };

    let program = invocation.program.display().to_string();
    runtime.block_on(async {
        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        // Windows 下不弹出控制台窗口
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!("启动 {} 失败: {}", program, e);
                return None;
            }
        };

        // 超时后 future 被丢弃，kill_on_drop 负责结束子进程
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.stderr.is_empty() {
                    debug!("{} stderr: {}", program, decode_console(&output.stderr).trim());
                }
                if output.status.success() {
                    Some(output.stdout)
                } else {
                    warn!("{} 执行失败: {}", program, output.status);
                    None
                }
            }
            Ok(Err(e)) => {
                warn!("{} 执行失败: {}", program, e);
                None
            }
            Err(_) => {
                warn!("{} 超时 ({}s)，按零结果处理", program, timeout.as_secs());
                None
            }
        }
    })
}

/// 控制台输出解码：先试 UTF-8，不合法再按 GBK
pub(crate) fn decode_console(bytes: &[u8]) -> String {
    let (decoded_utf8, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return decoded_utf8.into_owned();
    }
    let (decoded_gbk, _, _) = encoding_rs::GBK.decode(bytes);
    decoded_gbk.into_owned()
}

/// 按行切分 stdout，跳过空行
pub fn parse_path_lines(stdout: &[u8]) -> Vec<PathBuf> {
    #[cfg(unix)]
    {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // Unix 路径是字节串，直接切分，不做解码
        stdout
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| PathBuf::from(OsStr::from_bytes(line)))
            .collect()
    }
    #[cfg(not(unix))]
    {
        decode_console(stdout)
            .lines()
            .map(|line| line.trim().trim_matches('"'))
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

/// 在 PATH 中查找可执行文件
pub fn find_program(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let file_name = if std::env::consts::EXE_SUFFIX.is_empty() || name.ends_with(std::env::consts::EXE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, std::env::consts::EXE_SUFFIX)
    };
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
