use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Result, SearchError};
use crate::filter::QueryFilter;
use crate::searcher::{select_backend, SearchBackend};
use crate::types::{FileInfo, SearchParams, SearchResult, SortField, SortOrder};

/// 搜索执行器：后端给候选，统一过滤、排序、截断在这里完成
pub struct SearchExecutor {
    backend: Box<dyn SearchBackend>,
}

impl std::fmt::Debug for SearchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchExecutor")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl SearchExecutor {
    /// 按配置里的偏好选择后端
    pub fn new(settings: &Settings) -> Self {
        Self::with_backend(select_backend(&settings.backend, settings))
    }

    pub fn with_backend(backend: Box<dyn SearchBackend>) -> Self {
        info!("搜索执行器使用后端: {}", backend.name());
        Self { backend }
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    pub fn execute(&self, params: &SearchParams) -> Result<SearchResult> {
        let start = Instant::now();
        let query = &params.query;

        if !query.path.exists() {
            return Err(SearchError::not_found(&query.path));
        }
        if !query.path.is_dir() {
            return Err(SearchError::not_a_directory(&query.path));
        }

        info!("开始搜索: {} (后端: {})", query.path.display(), self.backend.name());
        debug!("查询条件: {:?}", query);

        // 后端输出一律不可信，每个候选都重新校验
        let filter = QueryFilter::new(query);
        let mut candidates = 0usize;
        let mut files: Vec<FileInfo> = Vec::new();
        for candidate in self.backend.search(query) {
            candidates += 1;
            if let Some(info) = filter.check(&candidate) {
                files.push(info);
            }
        }

        // 先排序再截断，截断结果才是按字段的前 N 个
        sort_files(&mut files, params.sort_by, params.sort_order);
        files.truncate(params.limit);

        let elapsed = start.elapsed();
        info!(
            "找到 {} 个文件 (候选 {} 个)，耗时 {:.2}s",
            files.len(),
            candidates,
            elapsed.as_secs_f64()
        );

        Ok(SearchResult {
            query: query.clone(),
            total_count: files.len(),
            files,
            elapsed,
        })
    }
}

/// 稳定排序，相等的元素保持后端发现顺序（降序也一样）
pub fn sort_files(files: &mut [FileInfo], field: SortField, order: SortOrder) {
    let compare = |a: &FileInfo, b: &FileInfo| -> Ordering {
        match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Size => a.size.cmp(&b.size),
            SortField::Modified => a.modified.cmp(&b.modified),
            SortField::Created => a.created.cmp(&b.created),
        }
    };
    match order {
        SortOrder::Asc => files.sort_by(compare),
        SortOrder::Desc => files.sort_by(|a, b| compare(b, a)),
    }
}
