//! 后端一致性自检：同一查询依次交给每个可用后端，比较最终结果

use clap::Parser;
use std::path::PathBuf;

use nlfind::{available_backends, FileInfo, SearchExecutor, SearchParams, SearchQuery, Settings};

#[derive(Parser, Debug)]
#[command(about = "对比所有可用后端的搜索结果")]
struct Args {
    /// 搜索目录
    #[arg(default_value = ".")]
    path: PathBuf,

    /// 文件名通配符
    #[arg(short = 'g', long = "glob")]
    pattern: Option<String>,

    /// 扩展名，可重复
    #[arg(short = 'e', long = "ext")]
    extensions: Vec<String>,

    /// 内容包含
    #[arg(short = 'c', long = "content")]
    content: Option<String>,

    /// 包含隐藏文件
    #[arg(short = 'H', long = "hidden")]
    hidden: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let settings = Settings::load();

    let mut query = SearchQuery::new(&args.path)
        .with_extensions(&args.extensions)
        .include_hidden(args.hidden);
    query.pattern = args.pattern;
    query.content_pattern = args.content;
    // 不截断，比较完整结果
    let params = SearchParams::new(query).with_limit(usize::MAX);

    println!("=== 搜索后端一致性测试 ===");
    println!("目录: {}", args.path.display());

    let mut baseline: Option<(String, Vec<(PathBuf, u64)>)> = None;
    let mut mismatches = 0;

    for backend in available_backends(&settings) {
        let name = backend.name().to_string();
        let executor = SearchExecutor::with_backend(backend);
        let result = match executor.execute(&params) {
            Ok(r) => r,
            Err(e) => {
                println!("[{}] 搜索失败: {}", name, e);
                std::process::exit(1);
            }
        };

        let paths = comparison_key(&result.files);
        println!("\n[{}] {} 个文件，耗时 {:.3}s", name, paths.len(), result.search_time());

        match &baseline {
            None => baseline = Some((name, paths)),
            Some((base_name, base_paths)) => {
                if *base_paths == paths {
                    println!("  >>> 与 {} 一致", base_name);
                } else {
                    mismatches += 1;
                    println!("  >>> 与 {} 不一致", base_name);
                    for (p, size) in paths.iter().filter(|e| !base_paths.contains(e)) {
                        println!("     多出: {} ({} B)", p.display(), size);
                    }
                    for (p, size) in base_paths.iter().filter(|e| !paths.contains(e)) {
                        println!("     缺少: {} ({} B)", p.display(), size);
                    }
                }
            }
        }
    }

    if mismatches > 0 {
        println!("\n=== {} 个后端结果不一致 ===", mismatches);
        std::process::exit(1);
    }
    println!("\n=== 所有可用后端结果一致 ===");
}

/// 名称相同的文件排序后保持发现顺序，各后端可能不同，按路径排好再比
fn comparison_key(files: &[FileInfo]) -> Vec<(PathBuf, u64)> {
    let mut key: Vec<(PathBuf, u64)> = files.iter().map(|f| (f.path.clone(), f.size)).collect();
    key.sort();
    key
}
