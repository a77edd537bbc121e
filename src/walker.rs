use walkdir::WalkDir;
use tracing::debug;

use crate::filter::QueryFilter;
use crate::searcher::{BackendKind, Candidates, SearchBackend};
use crate::types::SearchQuery;

/// 进程内目录遍历后端
///
/// 没有外部工具可依赖，所以自己把条件都过一遍（内容匹配除外），是唯一可以单独信任的后端。
/// 不进入指向目录的符号链接；指向文件的链接按目标的元数据判断。
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkBackend;

impl SearchBackend for WalkBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Walk
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> Candidates<'a> {
        let filter = QueryFilter::new(query);

        let walker = WalkDir::new(&query.path)
            .min_depth(1)
            .max_depth(if query.recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .into_iter();

        Box::new(
            walker
                .filter_map(|entry_result| match entry_result {
                    Ok(e) => Some(e),
                    Err(e) => {
                        debug!("遍历跳过: {}", e);
                        None
                    }
                })
                .filter(|entry| !entry.file_type().is_dir())
                .filter(move |entry| {
                    if !filter.accepts_path(entry.path()) {
                        return false;
                    }
                    let metadata = if entry.path_is_symlink() {
                        std::fs::metadata(entry.path())
                    } else {
                        entry.metadata().map_err(Into::into)
                    };
                    match metadata {
                        Ok(metadata) => filter.accepts_metadata(&metadata),
                        Err(_) => false,
                    }
                })
                .map(|entry| entry.into_path()),
        )
    }

    fn is_available(&self) -> bool {
        true
    }
}
