//! 查询生产方（例如语言模型）输出的 JSON → `SearchQuery`
//!
//! 生产方常见的毛病在这里统一兜住：外面包了 Markdown 代码块、
//! 大小写成 `"10MB"`、日期只有 `2024-01-01`。

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::types::{normalize_extension, SearchQuery};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuery {
    path: Option<PathBuf>,
    pattern: Option<String>,
    extensions: Vec<String>,
    min_size: Option<SizeValue>,
    max_size: Option<SizeValue>,
    modified_after: Option<String>,
    modified_before: Option<String>,
    content_pattern: Option<String>,
    include_hidden: Option<bool>,
    recursive: Option<bool>,
}

/// 解码生产方给出的结构化查询
///
/// `base` 为调用方显式给定的根目录，优先于 JSON 里的 `path`；两者都没有时用当前目录。
pub fn decode(text: &str, base: Option<&Path>) -> Result<SearchQuery> {
    let body = strip_code_fence(text);
    let raw: RawQuery = serde_json::from_str(body)?;

    let path = match (base, raw.path) {
        (Some(b), _) => b.to_path_buf(),
        (None, Some(p)) => p,
        (None, None) => PathBuf::from("."),
    };

    let defaults = SearchQuery::default();
    Ok(SearchQuery {
        path,
        pattern: raw.pattern.filter(|p| !p.trim().is_empty()),
        extensions: raw
            .extensions
            .iter()
            .filter_map(|e| normalize_extension(e))
            .collect(),
        min_size: raw.min_size.map(size_to_bytes).transpose()?,
        max_size: raw.max_size.map(size_to_bytes).transpose()?,
        modified_after: raw.modified_after.as_deref().map(parse_time).transpose()?,
        modified_before: raw.modified_before.as_deref().map(parse_time).transpose()?,
        content_pattern: raw.content_pattern.filter(|p| !p.is_empty()),
        include_hidden: raw.include_hidden.unwrap_or(defaults.include_hidden),
        recursive: raw.recursive.unwrap_or(defaults.recursive),
    })
}

/// 去掉 ``` 或 ```json 包裹
fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = match body.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        body = stripped;
    }
    body.trim()
}

fn size_to_bytes(value: SizeValue) -> Result<u64> {
    match value {
        SizeValue::Bytes(n) => Ok(n),
        SizeValue::Float(f) if f >= 0.0 => Ok(f as u64),
        SizeValue::Float(f) => Err(SearchError::Query(format!("大小不能为负数: {}", f))),
        SizeValue::Text(s) => parse_size(&s),
    }
}

/// `"10MB"`、`"1.5 gb"`、`"512"` → 字节数（1024 进制）
pub fn parse_size(text: &str) -> Result<u64> {
    let s = text.trim().to_uppercase();
    const UNITS: [(&str, u64); 5] = [
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
        ("B", 1),
    ];

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(unit, mult)| s.strip_suffix(unit).map(|n| (n.trim(), *mult)))
        .unwrap_or((s.as_str(), 1));

    let value: f64 = number
        .parse()
        .map_err(|_| SearchError::Query(format!("无法解析大小: {}", text)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SearchError::Query(format!("无法解析大小: {}", text)));
    }
    Ok((value * multiplier as f64) as u64)
}

/// RFC 3339 / `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD`（本地零点）
pub fn parse_time(text: &str) -> Result<DateTime<Local>> {
    let s = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| SearchError::Query(format!("无法解析时间: {}", text)))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| SearchError::Query(format!("本地时间不存在: {}", text)))
}
