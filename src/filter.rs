use chrono::{DateTime, Local};
use globset::{GlobBuilder, GlobMatcher};
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::content_search::content_matches;
use crate::types::{extension_of, FileInfo, SearchQuery};

/// 统一过滤：对任何后端的候选重新校验查询里的全部条件
///
/// 后端选择因此只影响速度，不影响结果。
#[derive(Debug)]
pub struct QueryFilter<'q> {
    query: &'q SearchQuery,
    /// 根目录的绝对路径与规范路径，用于比对全局索引给出的绝对候选
    bases: Vec<PathBuf>,
    glob: Option<NameMatcher>,
    extensions: Vec<String>,
    content: Option<String>,
}

impl<'q> QueryFilter<'q> {
    pub fn new(query: &'q SearchQuery) -> Self {
        let mut bases = Vec::with_capacity(2);
        if let Ok(abs) = std::path::absolute(&query.path) {
            bases.push(abs);
        }
        if let Ok(canon) = std::fs::canonicalize(&query.path) {
            if !bases.contains(&canon) {
                bases.push(canon);
            }
        }

        Self {
            query,
            bases,
            glob: query.name_pattern().map(NameMatcher::new),
            extensions: query.normalized_extensions(),
            content: query.content_needle().map(str::to_lowercase),
        }
    }

    pub fn query(&self) -> &SearchQuery {
        self.query
    }

    /// 完整校验，通过则读取元数据生成 FileInfo；任何读取失败都只跳过该候选
    pub fn check(&self, candidate: &Path) -> Option<FileInfo> {
        if !self.accepts_path(candidate) {
            return None;
        }

        // 跟随符号链接：指向普通文件的链接按文件处理，指向目录或断开的链接被拒绝
        let metadata = match std::fs::metadata(candidate) {
            Ok(m) => m,
            Err(e) => {
                debug!("跳过 {}: {}", candidate.display(), e);
                return None;
            }
        };
        if !self.accepts_metadata(&metadata) {
            return None;
        }

        // 内容匹配最贵，放在最后
        if let Some(needle) = &self.content {
            if !content_matches(candidate, needle) {
                return None;
            }
        }

        match FileInfo::from_metadata(candidate, &metadata) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("跳过 {}: {}", candidate.display(), e);
                None
            }
        }
    }

    /// 不触碰文件系统的检查：范围、深度、隐藏、通配符、扩展名
    pub fn accepts_path(&self, candidate: &Path) -> bool {
        let Some(relative) = self.relative_to_base(candidate) else {
            return false;
        };

        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                // `..`、根、盘符都意味着跑出了根目录
                _ => return false,
            }
        }
        if depth == 0 || (!self.query.recursive && depth > 1) {
            return false;
        }

        // 隐藏只看文件名本身，隐藏目录里的普通文件照常返回
        if !self.query.include_hidden && candidate.file_name().is_some_and(is_hidden_name) {
            return false;
        }

        self.accepts_name(candidate)
    }

    /// 文件名层面的条件：通配符与扩展名
    pub fn accepts_name(&self, candidate: &Path) -> bool {
        if let Some(glob) = &self.glob {
            match candidate.file_name() {
                Some(name) if glob.is_match(name) => {}
                _ => return false,
            }
        }

        if !self.extensions.is_empty() {
            let ext = extension_of(candidate).to_lowercase();
            if !self.extensions.contains(&ext) {
                return false;
            }
        }

        true
    }

    /// 元数据条件：必须是普通文件（调用方传入跟随链接后的元数据），大小与修改时间在闭区间内
    pub fn accepts_metadata(&self, metadata: &Metadata) -> bool {
        if !metadata.is_file() {
            return false;
        }

        let size = metadata.len();
        if self.query.min_size.is_some_and(|min| size < min) {
            return false;
        }
        if self.query.max_size.is_some_and(|max| size > max) {
            return false;
        }

        if self.query.modified_after.is_some() || self.query.modified_before.is_some() {
            let Ok(modified) = metadata.modified() else {
                return false;
            };
            let modified: DateTime<Local> = modified.into();
            if self.query.modified_after.is_some_and(|after| modified < after) {
                return false;
            }
            if self.query.modified_before.is_some_and(|before| modified > before) {
                return false;
            }
        }

        true
    }

    fn relative_to_base(&self, candidate: &Path) -> Option<PathBuf> {
        // 同为相对或同为绝对时可以直接比较
        if candidate.is_absolute() == self.query.path.is_absolute() {
            if let Some(rel) = strip_base(candidate, &self.query.path) {
                return Some(rel);
            }
        }
        if self.bases.is_empty() {
            return None;
        }
        let absolute = std::path::absolute(candidate).ok()?;
        self.bases
            .iter()
            .find_map(|base| strip_base(&absolute, base))
    }
}

pub(crate) fn is_hidden_name(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// 文件名通配符的唯一构造方式，统一过滤与外部工具的翻译共用
fn build_glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(false)
        .backslash_escape(false)
        .build()
}

/// 通配符能否原样交给外部工具
///
/// 只有 globset 能编译、且不含 `\` 的模式才传出去：`\` 在这里是普通字符，
/// 在 fd/find 里却是转义符；编译失败的模式在这里按字面量比较，外部工具则会报错退出。
/// 两种情况都会让外部工具漏掉候选，因此不翻译，由统一过滤负责。
pub(crate) fn portable_glob(pattern: &str) -> Option<&str> {
    if pattern.contains('\\') || build_glob(pattern).is_err() {
        return None;
    }
    Some(pattern)
}

/// 文件名匹配器
#[derive(Debug)]
enum NameMatcher {
    Glob(GlobMatcher),
    /// 通配符语法非法时退化为整名比较
    Literal(String),
}

impl NameMatcher {
    /// 通配符不区分大小写，`*` 可匹配任意字符
    fn new(pattern: &str) -> Self {
        match build_glob(pattern) {
            Ok(glob) => Self::Glob(glob.compile_matcher()),
            Err(e) => {
                debug!("通配符 {:?} 无效 ({})，按字面量匹配", pattern, e);
                Self::Literal(pattern.to_lowercase())
            }
        }
    }

    fn is_match(&self, name: &OsStr) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(Path::new(name)),
            Self::Literal(literal) => name.to_string_lossy().to_lowercase() == *literal,
        }
    }
}

/// 逐个组件比较的 strip_prefix；Windows 下忽略大小写
fn strip_base(path: &Path, base: &Path) -> Option<PathBuf> {
    let mut rest = path.components();
    for b in base.components() {
        if matches!(b, Component::CurDir) {
            continue;
        }
        let mut c = rest.next()?;
        while matches!(c, Component::CurDir) {
            c = rest.next()?;
        }
        if !component_eq(c.as_os_str(), b.as_os_str()) {
            return None;
        }
    }
    Some(rest.as_path().to_path_buf())
}

fn component_eq(a: &OsStr, b: &OsStr) -> bool {
    if cfg!(windows) {
        a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
    } else {
        a == b
    }
}
