//! Local backend against a scratch directory.

use std::collections::HashSet;

use futures::TryStreamExt;
use pathy::{LocalPath, MkdirOptions, PathError, PurePath, RmOptions, StoragePath};
use tempfile::TempDir;

fn scratch() -> (TempDir, LocalPath) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = LocalPath::new(dir.path().to_str().expect("temp dir is not UTF-8"));
    (dir, root)
}

async fn collect(stream: pathy::PathStream<LocalPath>) -> HashSet<String> {
    stream
        .map_ok(|p| p.full_path())
        .try_collect()
        .await
        .expect("listing failed")
}

#[tokio::test]
async fn test_simple_crud() {
    let (_dir, root) = scratch();
    let path = root.join(["first", "second.txt"]);
    path.parent().mkdir(MkdirOptions::default()).await.unwrap();

    assert!(!path.exists().await.unwrap());
    path.write(b"some data").await.unwrap();

    assert!(path.exists().await.unwrap());
    assert!(path.is_file().await.unwrap());
    assert!(!path.is_dir().await.unwrap());
    assert_eq!(&path.read().await.unwrap()[..], b"some data");

    path.rm(RmOptions::default()).await.unwrap();
    assert!(!path.exists().await.unwrap());
}

#[tokio::test]
async fn test_missing_entity_queries_are_false() {
    let (_dir, root) = scratch();
    let missing = root.join(["nope"]);
    assert!(!missing.exists().await.unwrap());
    assert!(!missing.is_file().await.unwrap());
    assert!(!missing.is_dir().await.unwrap());
    missing.rm(RmOptions { recursive: true }).await.unwrap();
    assert!(missing.read().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_touch_is_idempotent() {
    let (_dir, root) = scratch();
    let path = root.join(["empty"]);
    path.touch().await.unwrap();
    path.touch().await.unwrap();
    assert!(path.is_file().await.unwrap());
    assert!(path.read().await.unwrap().is_empty());

    path.write(b"kept").await.unwrap();
    path.touch().await.unwrap();
    assert_eq!(&path.read().await.unwrap()[..], b"kept");
}

#[tokio::test]
async fn test_mkdir() {
    let (_dir, root) = scratch();
    let nested = root.join(["a", "b", "c"]);

    let err = nested.mkdir(MkdirOptions::default()).await.unwrap_err();
    assert!(err.is_not_found());

    nested.mkdir(MkdirOptions { parents: true }).await.unwrap();
    assert!(nested.is_dir().await.unwrap());

    // already a directory: nothing to do
    nested.mkdir(MkdirOptions::default()).await.unwrap();

    let file = root.join(["file"]);
    file.touch().await.unwrap();
    let err = file.mkdir(MkdirOptions { parents: true }).await.unwrap_err();
    assert!(matches!(err, PathError::Conflict { operation: "mkdir", .. }));
}

#[tokio::test]
async fn test_rm_requires_recursive_for_non_empty() {
    let (_dir, root) = scratch();
    let dir = root.join(["dir"]);
    dir.join(["sub"]).mkdir(MkdirOptions { parents: true }).await.unwrap();
    dir.join(["sub", "f.txt"]).touch().await.unwrap();

    let err = dir.rm(RmOptions::default()).await.unwrap_err();
    assert!(matches!(err, PathError::NotEmpty { .. }));
    assert!(dir.exists().await.unwrap());

    dir.rm(RmOptions { recursive: true }).await.unwrap();
    assert!(!dir.exists().await.unwrap());

    let empty = root.join(["empty"]);
    empty.mkdir(MkdirOptions::default()).await.unwrap();
    empty.rm(RmOptions::default()).await.unwrap();
    assert!(!empty.exists().await.unwrap());
}

#[tokio::test]
async fn test_ls_one_level() {
    let (_dir, root) = scratch();
    root.join(["a.txt"]).touch().await.unwrap();
    root.join(["b.txt"]).touch().await.unwrap();
    root.join(["sub"]).mkdir(MkdirOptions::default()).await.unwrap();
    root.join(["sub", "deep.txt"]).touch().await.unwrap();

    let found = collect(root.ls()).await;
    let expected: HashSet<String> = ["a.txt", "b.txt", "sub"]
        .iter()
        .map(|n| root.join([*n]).full_path())
        .collect();
    assert_eq!(found, expected);

    // a second call starts over
    assert_eq!(collect(root.ls()).await.len(), 3);
}

#[tokio::test]
async fn test_ls_missing_dir_fails() {
    let (_dir, root) = scratch();
    let result: Result<Vec<LocalPath>, PathError> = root.join(["missing"]).ls().try_collect().await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_glob_default_is_one_level() {
    let (_dir, root) = scratch();
    let mut expected = HashSet::new();
    for i in 0..10 {
        let file = root.join([format!("file-{i}")]);
        file.touch().await.unwrap();
        expected.insert(file.full_path());
    }
    let sub = root.join(["sub"]);
    sub.mkdir(MkdirOptions::default()).await.unwrap();
    sub.join(["hidden"]).touch().await.unwrap();
    expected.insert(sub.full_path());

    assert_eq!(collect(root.glob(None)).await, expected);
}

#[tokio::test]
async fn test_glob_nested_patterns() {
    let (_dir, root) = scratch();
    for rel in ["x/one.csv", "x/two.json", "x/y/three.csv", "x/y/z/four.csv", "top.csv"] {
        let file = root.join([rel]);
        file.parent().mkdir(MkdirOptions { parents: true }).await.unwrap();
        file.touch().await.unwrap();
    }

    let star = collect(root.glob(Some("x/*.csv"))).await;
    assert_eq!(star, HashSet::from([root.join(["x/one.csv"]).full_path()]));

    let recursive = collect(root.glob(Some("**/*.csv"))).await;
    let expected: HashSet<String> = ["x/one.csv", "x/y/three.csv", "x/y/z/four.csv", "top.csv"]
        .iter()
        .map(|rel| root.join([*rel]).full_path())
        .collect();
    assert_eq!(recursive, expected);

    let literal = collect(root.glob(Some("x/two.json"))).await;
    assert_eq!(literal, HashSet::from([root.join(["x/two.json"]).full_path()]));

    assert!(collect(root.glob(Some("nothing/*"))).await.is_empty());
}

#[tokio::test]
async fn test_mv() {
    let (_dir, root) = scratch();
    let from = root.join(["from.txt"]);
    from.write(b"moving").await.unwrap();

    let to = from.with_name("to.txt");
    let moved = from.mv(&to).await.unwrap();

    assert_eq!(moved, to);
    assert!(!from.exists().await.unwrap());
    assert_eq!(&to.read().await.unwrap()[..], b"moving");
}

#[tokio::test]
async fn test_streams() {
    let (_dir, root) = scratch();
    let path = root.join(["streamed.log"]);

    let mut sink = path.write_stream().await.unwrap();
    sink.write(b"hello ").await.unwrap();
    sink.write(b"world").await.unwrap();
    assert!(!path.exists().await.unwrap());
    sink.close().await.unwrap();

    assert_eq!(&path.read().await.unwrap()[..], b"hello world");

    let mut collected = Vec::new();
    path.read_callback(|chunk| collected.extend_from_slice(&chunk))
        .await
        .unwrap();
    assert_eq!(collected, b"hello world");

    let mut reader = path.read_stream().await.unwrap();
    let mut text = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut text)
        .await
        .unwrap();
    assert_eq!(text, "hello world");

    // staging file is gone after commit
    let names: HashSet<String> = root
        .ls()
        .map_ok(|p| p.name().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(names, HashSet::from(["streamed.log".to_string()]));
}

#[tokio::test]
async fn test_with_ext_then_write() {
    let (_dir, root) = scratch();
    let base = root.join(["report"]);
    let csv = base.with_ext("csv");
    assert_eq!(csv.name(), "report.csv");
    csv.write(b"a,b\n").await.unwrap();
    assert!(csv.exists().await.unwrap());
    assert!(!base.exists().await.unwrap());
}

#[tokio::test]
async fn test_abandoned_stream_leaves_nothing_behind() {
    let (_dir, root) = scratch();
    let path = root.join(["out.txt"]);

    let mut sink = path.write_stream().await.unwrap();
    sink.write(b"never committed").await.unwrap();
    drop(sink);

    assert!(!path.exists().await.unwrap());
    assert!(collect(root.ls()).await.is_empty());
    assert!(collect(root.glob(None)).await.is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_non_utf8_entries_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (dir, root) = scratch();
    std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff")), b"x").unwrap();
    root.join(["good.txt"]).write(b"y").await.unwrap();

    let expected = HashSet::from([root.join(["good.txt"]).full_path()]);
    assert_eq!(collect(root.ls()).await, expected);
    assert_eq!(collect(root.glob(Some("**"))).await, expected);
}
