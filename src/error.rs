use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

/// 对调用方可见的错误
///
/// 后端执行失败、单个文件读不到都在内部降级处理，不会出现在这里。
#[derive(Debug, Error)]
pub enum SearchError {
    /// 搜索根目录不存在或不是目录
    #[error("无效路径: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 结构化查询无法解析
    #[error("查询解析失败: {0}")]
    Query(String),
}

impl SearchError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: "路径不存在",
        }
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: "不是目录",
        }
    }

    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Query(e.to_string())
    }
}
