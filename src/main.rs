mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{run_cli, CliArgs};
use nlfind::{SearchError, Settings};

fn init_logging(verbose: bool) {
    // RUST_LOG 优先，其次 --verbose
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let settings = Settings::load();
    if let Err(e) = run_cli(args, settings) {
        match e.downcast_ref::<SearchError>() {
            Some(err @ SearchError::InvalidPath { .. }) => eprintln!("错误: {}", err),
            _ => eprintln!("搜索失败: {:#}", e),
        }
        std::process::exit(1);
    }
}
