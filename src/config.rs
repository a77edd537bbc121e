use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// 结果数量上限默认值
pub const MAX_RESULTS: usize = 1000;

/// 外部工具 (fd/find) 超时，秒
pub const TOOL_TIMEOUT_SECS: u64 = 300;

/// Everything 走全局索引，超时更短
pub const EVERYTHING_TIMEOUT_SECS: u64 = 60;

/// 配置文件路径环境变量
pub const CONFIG_ENV: &str = "NLFIND_CONFIG";

/// 解析完成后的配置值，由调用方显式传入选择器/执行器
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_path: PathBuf,
    pub max_results: usize,
    pub include_hidden: bool,
    pub recursive: bool,
    /// `auto` | `fd` | `find` | `everything` | `python`
    pub backend: String,
    pub tool_timeout_secs: u64,
    pub everything_timeout_secs: u64,
    /// Everything 实例名，空串表示默认实例
    pub es_instance: String,
    pub es_path: Option<PathBuf>,
    pub fd_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            max_results: MAX_RESULTS,
            include_hidden: false,
            recursive: true,
            backend: "auto".to_string(),
            tool_timeout_secs: TOOL_TIMEOUT_SECS,
            everything_timeout_secs: EVERYTHING_TIMEOUT_SECS,
            es_instance: String::new(),
            es_path: None,
            fd_path: None,
        }
    }
}

impl Settings {
    /// 默认值 → 配置文件 → 环境变量
    pub fn load() -> Self {
        let mut settings = match config_file_path() {
            Some(p) if p.is_file() => Self::from_file(&p).unwrap_or_else(|e| {
                warn!("配置文件 {} 读取失败，使用默认配置: {}", p.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&raw)?;
        debug!("已加载配置文件 {}", path.display());
        Ok(settings)
    }

    /// 用环境变量覆盖；非法值忽略并告警
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SEARCH_DEFAULT_PATH").filter(|v| !v.is_empty()) {
            self.default_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SEARCH_MAX_RESULTS") {
            match v.trim().parse() {
                Ok(n) => self.max_results = n,
                Err(_) => warn!("忽略非法的 SEARCH_MAX_RESULTS: {}", v),
            }
        }
        if let Some(v) = lookup("SEARCH_INCLUDE_HIDDEN") {
            match parse_bool(&v) {
                Some(b) => self.include_hidden = b,
                None => warn!("忽略非法的 SEARCH_INCLUDE_HIDDEN: {}", v),
            }
        }
        if let Some(v) = lookup("SEARCH_RECURSIVE") {
            match parse_bool(&v) {
                Some(b) => self.recursive = b,
                None => warn!("忽略非法的 SEARCH_RECURSIVE: {}", v),
            }
        }
        if let Some(v) = lookup("SEARCH_BACKEND").filter(|v| !v.trim().is_empty()) {
            self.backend = v.trim().to_lowercase();
        }
        if let Some(v) = lookup("SEARCH_ES_INSTANCE") {
            self.es_instance = v;
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn everything_timeout(&self) -> Duration {
        Duration::from_secs(self.everything_timeout_secs)
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `$NLFIND_CONFIG`，否则 `<config_dir>/nlfind/config.json`
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|p| p.join("nlfind").join("config.json"))
}
