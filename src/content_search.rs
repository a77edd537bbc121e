use std::path::Path;
use tracing::debug;

/// 内容匹配：按 UTF-8 解码（非法字节替换，不报错），不区分大小写查找子串
///
/// `needle_lower` 需要调用方预先转小写，避免每个文件重复计算。
pub fn content_matches(path: &Path, needle_lower: &str) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            debug!("读取内容失败 {}: {}", path.display(), e);
            return false;
        }
    };
    text_contains(&bytes, needle_lower)
}

pub(crate) fn text_contains(bytes: &[u8], needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    let (text, _, _) = encoding_rs::UTF_8.decode(bytes);
    text.to_lowercase().contains(needle_lower)
}
