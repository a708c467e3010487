// tests/walk_hidden_dirs.rs

use std::collections::BTreeSet;
use std::error::Error;
use std::ffi::OsStr;
use std::path::PathBuf;

use proptest::prelude::*;
use watchpty::errors::WatchptyError;
use watchpty::watch::{collect_watch_dirs, is_hidden_dir_name};
use watchpty_test_utils::{init_tracing, TreeBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn relative_set(root: &std::path::Path, dirs: &[PathBuf]) -> BTreeSet<String> {
    dirs.iter()
        .map(|d| {
            d.strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn hidden_names() {
    assert!(is_hidden_dir_name(OsStr::new(".git")));
    assert!(is_hidden_dir_name(OsStr::new(".")));
    assert!(!is_hidden_dir_name(OsStr::new("..")));
    assert!(!is_hidden_dir_name(OsStr::new("..cache")));
    assert!(!is_hidden_dir_name(OsStr::new("src")));
    assert!(!is_hidden_dir_name(OsStr::new("a.b")));
}

/// `proj/.git/HEAD` and `proj/src/main.txt`: only `proj` and `proj/src`
/// are watched.
#[test]
fn project_tree_skips_git_dir() -> TestResult {
    init_tracing();

    let tree = TreeBuilder::new()
        .file("proj/.git/HEAD", "ref: refs/heads/main\n")
        .file("proj/src/main.txt", "hello\n");
    let root = tree.join("proj");

    let dirs = collect_watch_dirs(&root)?;

    assert_eq!(dirs, vec![root.clone(), root.join("src")]);
    Ok(())
}

#[test]
fn hidden_dirs_are_pruned_with_descendants() -> TestResult {
    init_tracing();

    let tree = TreeBuilder::new()
        .dir(".cache/deep/deeper")
        .dir("a/.hidden/inner")
        .dir("a/b/c")
        .dir("d")
        .file(".hiddenfile", "not a directory");

    let dirs = collect_watch_dirs(tree.path())?;
    let rel = relative_set(tree.path(), &dirs);

    let expected: BTreeSet<String> = ["", "a", "a/b", "a/b/c", "d"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(rel, expected);
    Ok(())
}

#[test]
fn explicitly_named_hidden_root_is_still_watched() -> TestResult {
    init_tracing();

    let tree = TreeBuilder::new().dir(".config/nvim/.undo").dir(".config/nvim/lua");
    let root = tree.join(".config");

    let dirs = collect_watch_dirs(&root)?;

    assert_eq!(
        dirs,
        vec![root.clone(), root.join("nvim"), root.join("nvim/lua")]
    );
    Ok(())
}

#[test]
fn missing_root_is_a_walk_error() {
    init_tracing();

    let tree = TreeBuilder::new();
    let missing = tree.join("does-not-exist");

    match collect_watch_dirs(&missing) {
        Err(WatchptyError::Walk { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Walk error, got {other:?}"),
    }
}

// Random trees of up to three levels; names drawn from a small alphabet
// where a leading '.' marks a hidden directory.
fn dir_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("src".to_string()),
        Just("lib".to_string()),
        Just("docs".to_string()),
        Just(".git".to_string()),
        Just(".cache".to_string()),
        Just("..odd".to_string()),
    ]
}

fn tree_paths() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(proptest::collection::vec(dir_name(), 1..=3), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn watched_set_is_exactly_the_unhidden_paths(paths in tree_paths()) {
        let mut builder = TreeBuilder::new();
        for components in &paths {
            builder = builder.dir(&components.join("/"));
        }

        let dirs = collect_watch_dirs(builder.path()).unwrap();
        let rel = relative_set(builder.path(), &dirs);

        // Expected: every prefix of every created path whose components are
        // all non-hidden, plus the root.
        let mut expected = BTreeSet::new();
        expected.insert(String::new());
        for components in &paths {
            for depth in 1..=components.len() {
                let prefix = &components[..depth];
                if prefix.iter().any(|c| is_hidden_dir_name(OsStr::new(c))) {
                    break;
                }
                expected.insert(prefix.join("/"));
            }
        }

        prop_assert_eq!(rel, expected);
    }
}
