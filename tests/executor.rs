mod common;

use common::{fixture, names, sorted_names, walker, write};
use nlfind::{SearchError, SearchParams, SearchQuery, SortField, SortOrder};

fn run(query: SearchQuery) -> nlfind::SearchResult {
    walker().execute(&SearchParams::new(query)).unwrap()
}

#[test]
fn no_filters_finds_visible_files() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()));
    assert_eq!(
        sorted_names(&result.files),
        ["nested.py", "test.pdf", "test.py", "test.txt"]
    );
    assert_eq!(result.total_count, 4);
    assert!(result.search_time() >= 0.0);
}

#[test]
fn extension_filter() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).with_extensions(["py"]));
    assert_eq!(sorted_names(&result.files), ["nested.py", "test.py"]);

    // 扩展名写法不影响结果
    let result = run(SearchQuery::new(dir.path()).with_extensions([".PY"]));
    assert_eq!(result.total_count, 2);
}

#[test]
fn content_filter_is_case_insensitive() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).with_content("python"));
    assert_eq!(names(&result.files), ["test.py"]);

    let result = run(SearchQuery::new(dir.path()).with_content("HELLO WORLD"));
    assert_eq!(names(&result.files), ["test.txt"]);
}

#[test]
fn non_recursive_stays_at_top_level() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).recursive(false));
    assert_eq!(sorted_names(&result.files), ["test.pdf", "test.py", "test.txt"]);

    let result = run(SearchQuery::new(dir.path()).recursive(false).with_extensions(["py"]));
    assert_eq!(names(&result.files), ["test.py"]);
}

#[test]
fn hidden_files_only_on_request() {
    let dir = fixture();
    let visible = run(SearchQuery::new(dir.path()));
    let all = run(SearchQuery::new(dir.path()).include_hidden(true));
    assert_eq!(visible.total_count, 4);
    assert_eq!(all.total_count, 5);
    assert!(sorted_names(&all.files).contains(&".hidden".to_string()));
}

#[test]
fn files_inside_hidden_directories_are_not_hidden() {
    let dir = fixture();
    write(dir.path(), ".config/settings.py", "x");
    write(dir.path(), ".config/.token", "x");

    let result = run(SearchQuery::new(dir.path()).with_extensions(["py"]));
    assert_eq!(sorted_names(&result.files), ["nested.py", "settings.py", "test.py"]);

    let result = run(SearchQuery::new(dir.path()).include_hidden(true));
    assert_eq!(result.total_count, 7);
}

#[cfg(unix)]
#[test]
fn symlinks_to_files_are_results() {
    let dir = fixture();
    std::os::unix::fs::symlink(dir.path().join("test.py"), dir.path().join("link.py")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("subdir"), dir.path().join("linkdir")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("missing.py"), dir.path().join("broken.py")).unwrap();

    let result = run(SearchQuery::new(dir.path()).with_extensions(["py"]));
    assert_eq!(sorted_names(&result.files), ["link.py", "nested.py", "test.py"]);
    let link = result.files.iter().find(|f| f.name == "link.py").unwrap();
    assert_eq!(link.size, 134);
    assert!(link.path.ends_with("link.py"));
}

#[test]
fn uppercase_extension_matches() {
    let dir = fixture();
    write(dir.path(), "UPPER.PY", "print()\n");
    let result = run(SearchQuery::new(dir.path()).with_extensions(["py"]));
    assert_eq!(sorted_names(&result.files), ["UPPER.PY", "nested.py", "test.py"]);
}

#[test]
fn glob_pattern_ignores_case() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).with_pattern("TEST.*"));
    assert_eq!(sorted_names(&result.files), ["test.pdf", "test.py", "test.txt"]);
}

#[test]
fn size_bounds_are_inclusive() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).with_size(Some(60), Some(134)));
    assert_eq!(sorted_names(&result.files), ["test.py", "test.txt"]);

    let result = run(SearchQuery::new(dir.path()).with_size(Some(1), None));
    assert!(!sorted_names(&result.files).contains(&"test.pdf".to_string()));
}

#[test]
fn sort_happens_before_truncation() {
    let dir = fixture();
    let params = SearchParams::new(SearchQuery::new(dir.path()))
        .sorted_by(SortField::Size, SortOrder::Desc)
        .with_limit(1);
    let result = walker().execute(&params).unwrap();
    assert_eq!(names(&result.files), ["test.py"]);
    assert_eq!(result.total_count, 1);

    let params = SearchParams::new(SearchQuery::new(dir.path()))
        .sorted_by(SortField::Name, SortOrder::Asc)
        .with_limit(2);
    let result = walker().execute(&params).unwrap();
    assert_eq!(names(&result.files), ["nested.py", "test.pdf"]);
}

#[test]
fn repeated_searches_agree() {
    let dir = fixture();
    let params = SearchParams::new(SearchQuery::new(dir.path())).sorted_by(SortField::Name, SortOrder::Asc);
    let first = walker().execute(&params).unwrap();
    let second = walker().execute(&params).unwrap();
    assert_eq!(names(&first.files), names(&second.files));
}

#[test]
fn missing_path_is_invalid() {
    let err = walker()
        .execute(&SearchParams::new(SearchQuery::new("/nonexistent/path/xyz")))
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidPath { .. }));
}

#[test]
fn file_as_root_is_invalid() {
    let dir = fixture();
    let err = walker()
        .execute(&SearchParams::new(SearchQuery::new(dir.path().join("test.py"))))
        .unwrap_err();
    assert!(err.is_invalid_path());
}

#[test]
fn results_carry_metadata() {
    let dir = fixture();
    let result = run(SearchQuery::new(dir.path()).with_pattern("test.py"));
    let file = &result.files[0];
    assert_eq!(file.size, 134);
    assert_eq!(file.extension, ".py");
    assert!(file.path.is_absolute());
    assert!(!file.is_dir);
    assert!(file.created <= chrono::Local::now());
}
