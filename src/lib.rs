//! nlfind 搜索核心
//!
//! 多个搜索后端（进程内遍历、fd、find、Everything）只负责产出候选路径，
//! 统一过滤、排序、截断在执行器里完成，所以换哪个后端结果都一样。

pub mod config;
pub mod content_search;
pub mod error;
pub mod everything;
pub mod executor;
pub mod fd;
pub mod filter;
pub mod find;
pub mod query_spec;
pub mod searcher;
pub mod types;
pub mod walker;

pub use config::Settings;
pub use error::{Result, SearchError};
pub use executor::SearchExecutor;
pub use searcher::{available_backends, select_backend, BackendKind, SearchBackend};
pub use types::{FileInfo, SearchParams, SearchQuery, SearchResult, SortField, SortOrder};
