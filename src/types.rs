use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 默认结果上限
pub const DEFAULT_LIMIT: usize = 1000;

/// 结构化搜索条件
///
/// 所有过滤字段缺省即"不限制"，不会变成"什么都不匹配"。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// 搜索根目录
    pub path: PathBuf,
    /// 文件名通配符 (`*`、`?`、`[...]`)
    pub pattern: Option<String>,
    /// 扩展名列表，`py` 与 `.py` 均可
    pub extensions: Vec<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub modified_after: Option<DateTime<Local>>,
    pub modified_before: Option<DateTime<Local>>,
    /// 文件内容子串，不区分大小写
    pub content_pattern: Option<String>,
    pub include_hidden: bool,
    pub recursive: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            pattern: None,
            extensions: Vec::new(),
            min_size: None,
            max_size: None,
            modified_after: None,
            modified_before: None,
            content_pattern: None,
            include_hidden: false,
            recursive: true,
        }
    }
}

impl SearchQuery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    pub fn with_size(mut self, min_size: Option<u64>, max_size: Option<u64>) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    pub fn with_modified(
        mut self,
        after: Option<DateTime<Local>>,
        before: Option<DateTime<Local>>,
    ) -> Self {
        self.modified_after = after;
        self.modified_before = before;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content_pattern = Some(content.into());
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 规范化后的扩展名（小写、带点、去重、去空）
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.extensions.len());
        for ext in self.extensions.iter().filter_map(|e| normalize_extension(e)) {
            if !out.contains(&ext) {
                out.push(ext);
            }
        }
        out
    }

    /// 非空的文件名通配符
    pub fn name_pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// 非空的内容匹配串
    pub fn content_needle(&self) -> Option<&str> {
        self.content_pattern.as_deref().filter(|p| !p.is_empty())
    }
}

/// `py` / `.PY` / ` .py ` 统一成 `.py`，空串返回 None
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Size,
    Modified,
    Created,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Created => "created",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "modified" | "mtime" => Ok(Self::Modified),
            "created" | "ctime" => Ok(Self::Created),
            other => Err(format!("未知排序字段: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 执行参数：查询 + 排序 + 上限（先排序后截断）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: SearchQuery,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl SearchParams {
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// 单个命中文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
    pub is_dir: bool,
}

impl FileInfo {
    /// 读取当前元数据构造，不做缓存
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Self::from_metadata(path, &metadata)
    }

    pub fn from_metadata(path: &Path, metadata: &std::fs::Metadata) -> std::io::Result<Self> {
        let resolved = resolve_keeping_name(path)?;
        let modified: DateTime<Local> = metadata.modified()?.into();
        // 部分 Linux 文件系统拿不到创建时间，退回修改时间
        let created = metadata
            .created()
            .map(DateTime::<Local>::from)
            .unwrap_or(modified);

        Ok(Self {
            name: file_name_of(path),
            extension: extension_of(path),
            path: resolved,
            size: metadata.len(),
            created,
            modified,
            is_dir: metadata.is_dir(),
        })
    }
}

/// 规范化父目录、保留最后一段：符号链接以自己的路径出现，而不是目标路径
fn resolve_keeping_name(path: &Path) -> std::io::Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            Ok(std::fs::canonicalize(parent)?.join(name))
        }
        _ => std::fs::canonicalize(path),
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 带点的扩展名，没有则空串；`a.tar.gz` 取 `.gz`
pub(crate) fn extension_of(path: &Path) -> String {
    match path.extension().map(|e| e.to_string_lossy()) {
        Some(ext) if !ext.is_empty() => format!(".{}", ext),
        _ => String::new(),
    }
}

/// 一次搜索的最终结果，构造后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub files: Vec<FileInfo>,
    pub total_count: usize,
    #[serde(rename = "search_time", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl SearchResult {
    pub fn search_time(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
