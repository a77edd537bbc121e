use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;

use nlfind::query_spec::{self, parse_size, parse_time};
use nlfind::{available_backends, BackendKind, SearchExecutor, SearchParams, SearchQuery, SearchResult, Settings, SortField, SortOrder};

#[derive(Parser, Debug)]
#[command(author, version, about = "nlfind 文件搜索（结构化查询，多后端结果一致）", long_about = None)]
pub struct CliArgs {
    /// 文件名通配符，如 "*.py"（直接搜索，不经过查询生成）
    pub pattern: Option<String>,

    /// 从文件读取结构化查询 JSON，`-` 表示标准输入
    #[arg(long = "query-json", value_name = "FILE", conflicts_with = "pattern")]
    pub query_json: Option<String>,

    /// 搜索目录（默认=配置中的 default_path）
    #[arg(short = 'p', long = "path")]
    pub path: Option<PathBuf>,

    /// 扩展名，可重复：-e py -e .txt
    #[arg(short = 'e', long = "ext")]
    pub extensions: Vec<String>,

    /// 最小大小，支持 10MB / 1.5GB
    #[arg(long = "min-size")]
    pub min_size: Option<String>,

    /// 最大大小
    #[arg(long = "max-size")]
    pub max_size: Option<String>,

    /// 修改时间不早于，如 2024-01-01
    #[arg(long = "after")]
    pub after: Option<String>,

    /// 修改时间不晚于
    #[arg(long = "before")]
    pub before: Option<String>,

    /// 文件内容包含（不区分大小写）
    #[arg(short = 'c', long = "content")]
    pub content: Option<String>,

    /// 包含隐藏文件
    #[arg(short = 'H', long = "hidden")]
    pub hidden: bool,

    /// 只搜索当前层
    #[arg(long = "no-recursive")]
    pub no_recursive: bool,

    /// 最大结果数（默认=配置中的 max_results）
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,

    /// 排序字段: name, size, modified, created
    #[arg(short = 's', long = "sort", default_value = "name")]
    pub sort: SortField,

    /// 降序
    #[arg(short = 'd', long = "desc")]
    pub desc: bool,

    /// 后端: auto, fd, find, everything, python
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// 输出 JSON
    #[arg(long = "json")]
    pub json: bool,

    /// 列出各后端是否可用
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// 输出调试日志
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// 命令行参数 + 配置 → 执行参数
    pub fn to_params(&self, settings: &Settings) -> Result<SearchParams> {
        let base = self.path.clone().unwrap_or_else(|| settings.default_path.clone());

        let mut query = match &self.query_json {
            Some(source) => {
                let text = read_source(source)?;
                // -p 优先于 JSON 里的 path
                query_spec::decode(&text, self.path.as_deref()).context("结构化查询解析失败")?
            }
            None => {
                let mut q = SearchQuery::new(base)
                    .include_hidden(settings.include_hidden)
                    .recursive(settings.recursive);
                q.pattern = self.pattern.clone();
                q
            }
        };

        if !self.extensions.is_empty() {
            query = query.with_extensions(&self.extensions);
        }
        if let Some(s) = &self.min_size {
            query.min_size = Some(parse_size(s)?);
        }
        if let Some(s) = &self.max_size {
            query.max_size = Some(parse_size(s)?);
        }
        if let Some(s) = &self.after {
            query.modified_after = Some(parse_time(s)?);
        }
        if let Some(s) = &self.before {
            query.modified_before = Some(parse_time(s)?);
        }
        if let Some(c) = &self.content {
            query.content_pattern = Some(c.clone());
        }
        if self.hidden {
            query.include_hidden = true;
        }
        if self.no_recursive {
            query.recursive = false;
        }

        let order = if self.desc { SortOrder::Desc } else { SortOrder::Asc };
        Ok(SearchParams::new(query)
            .sorted_by(self.sort, order)
            .with_limit(self.limit.unwrap_or(settings.max_results)))
    }
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("读取标准输入失败")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("读取查询文件失败: {}", source))
    }
}

// CLI入口
pub fn run_cli(args: CliArgs, mut settings: Settings) -> Result<()> {
    if let Some(backend) = &args.backend {
        settings.backend = backend.clone();
    }

    if args.list_backends {
        let available: Vec<BackendKind> = available_backends(&settings).iter().map(|b| b.kind()).collect();
        for kind in BackendKind::PRIORITY {
            let mark = if available.contains(&kind) { "可用" } else { "不可用" };
            println!("{:<12} {}", kind.as_str(), mark);
        }
        return Ok(());
    }

    let params = args.to_params(&settings)?;
    let executor = SearchExecutor::new(&settings);
    let result = executor.execute(&params)?;

    if args.json {
        let output = json!({
            "code": 0,
            "msg": "success",
            "backend": executor.backend().name(),
            "query": result.query,
            "total_count": result.total_count,
            "search_time": result.search_time(),
            "results": result.files,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        display_results(&result);
    }
    Ok(())
}

fn display_results(result: &SearchResult) {
    if result.files.is_empty() {
        println!("未找到文件。");
        return;
    }

    println!("共找到 {} 个文件，耗时 {:.2}s", result.total_count, result.search_time());
    println!("{:<40} {:>10}  {:<16}  目录", "名称", "大小", "修改时间");
    for f in &result.files {
        let parent = f.path.parent().map(|p| p.display().to_string()).unwrap_or_default();
        println!(
            "{:<40} {:>10}  {:<16}  {}",
            f.name,
            format_size(f.size),
            f.modified.format("%Y-%m-%d %H:%M"),
            parent
        );
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut full = vec!["nlfind"];
        full.extend_from_slice(args);
        CliArgs::parse_from(full)
    }

    #[test]
    fn flags_build_params() {
        let settings = Settings {
            default_path: PathBuf::from("/default"),
            max_results: 50,
            ..Settings::default()
        };
        let args = parse(&["*.rs", "-e", "rs", "--min-size", "1KB", "-s", "size", "-d", "-H", "--no-recursive"]);
        let params = args.to_params(&settings).unwrap();

        assert_eq!(params.query.path, PathBuf::from("/default"));
        assert_eq!(params.query.pattern.as_deref(), Some("*.rs"));
        assert_eq!(params.query.extensions, vec![".rs"]);
        assert_eq!(params.query.min_size, Some(1024));
        assert!(params.query.include_hidden);
        assert!(!params.query.recursive);
        assert_eq!(params.sort_by, SortField::Size);
        assert_eq!(params.sort_order, SortOrder::Desc);
        assert_eq!(params.limit, 50);
    }

    #[test]
    fn explicit_path_and_limit_win() {
        let args = parse(&["-p", "/here", "-n", "3"]);
        let params = args.to_params(&Settings::default()).unwrap();
        assert_eq!(params.query.path, PathBuf::from("/here"));
        assert_eq!(params.limit, 3);
        assert!(params.query.pattern.is_none());
    }

    #[test]
    fn query_json_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("q.json");
        std::fs::write(&file, r#"{"extensions": [".md"], "content_pattern": "todo"}"#).unwrap();

        let args = parse(&["--query-json", file.to_str().unwrap(), "-p", "/notes"]);
        let params = args.to_params(&Settings::default()).unwrap();
        assert_eq!(params.query.path, PathBuf::from("/notes"));
        assert_eq!(params.query.extensions, vec![".md"]);
        assert_eq!(params.query.content_pattern.as_deref(), Some("todo"));
    }

    #[test]
    fn bad_sort_field_is_rejected() {
        assert!(CliArgs::try_parse_from(["nlfind", "-s", "owner"]).is_err());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
    }
}
