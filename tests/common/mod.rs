#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use nlfind::{BackendKind, FileInfo, SearchExecutor, Settings};
use tempfile::TempDir;

/// 标准测试目录
///
/// ```text
/// test.py            134 字节，含 "Python"
/// test.txt           60 字节
/// test.pdf           空文件
/// subdir/nested.py
/// .hidden
/// ```
pub fn fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let root = dir.path();

    let mut py = String::from("# Python file\n");
    py.push_str(&"x = 1\n".repeat(20));
    fs::write(root.join("test.py"), py).unwrap();
    fs::write(root.join("test.txt"), "Hello World\n".repeat(5)).unwrap();
    fs::write(root.join("test.pdf"), "").unwrap();
    fs::create_dir(root.join("subdir")).unwrap();
    fs::write(root.join("subdir").join("nested.py"), "def f():\n    pass\n").unwrap();
    fs::write(root.join(".hidden"), "secret\n").unwrap();

    dir
}

pub fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn walker() -> SearchExecutor {
    SearchExecutor::with_backend(BackendKind::Walk.build(&Settings::default()))
}

/// 排好序的文件名，方便与后端顺序无关地比较
pub fn sorted_names(files: &[FileInfo]) -> Vec<String> {
    let mut names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    names.sort();
    names
}

/// 排好序的 (路径, 大小, 文件名)，后端一致性比较用
pub fn sorted_entries(files: &[FileInfo]) -> Vec<(PathBuf, u64, String)> {
    let mut entries: Vec<(PathBuf, u64, String)> = files
        .iter()
        .map(|f| (f.path.clone(), f.size, f.name.clone()))
        .collect();
    entries.sort();
    entries
}

pub fn names(files: &[FileInfo]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}
