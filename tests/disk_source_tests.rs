//! 本地 JSON 目录数据源集成测试

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use iplocator::errors::IpLocatorError;
use iplocator::source::{DiskSource, GeoRecord, LookupSource};

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_loads_nested_directories() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "eu/fr.json",
        r#"[{"ip":"2.2.2.2","country":"FR","city":"Paris"}]"#,
    );
    write(
        dir.path(),
        "us/west/ca.json",
        r#"[{"ip":"8.8.8.8","country":"US","city":"Mountain View"},
            {"ip":"8.8.4.4","country":"US","city":""}]"#,
    );

    let source = DiskSource::load(dir.path()).unwrap();
    assert_eq!(source.len(), 3);
    assert_eq!(
        source.lookup("2.2.2.2").await.unwrap(),
        GeoRecord::new("FR", "Paris")
    );
    assert_eq!(source.lookup("8.8.4.4").await.unwrap().country, "US");
}

#[tokio::test]
async fn test_unknown_ip_is_empty_record() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.json", r#"[{"ip":"8.8.8.8","country":"US","city":""}]"#);

    let source = DiskSource::load(dir.path()).unwrap();
    assert!(source.lookup("9.9.9.9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_later_files_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "01-base.json", r#"[{"ip":"1.1.1.1","country":"AU","city":"Sydney"}]"#);
    write(dir.path(), "02-fix.json", r#"[{"ip":"1.1.1.1","country":"US","city":"Los Angeles"}]"#);

    let source = DiskSource::load(dir.path()).unwrap();
    assert_eq!(
        source.lookup("1.1.1.1").await.unwrap(),
        GeoRecord::new("US", "Los Angeles")
    );
}

#[tokio::test]
async fn test_non_json_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README.md", "not data");
    write(dir.path(), "data.json", r#"[{"ip":"8.8.8.8","country":"US"}]"#);

    let source = DiskSource::load(dir.path()).unwrap();
    assert_eq!(source.len(), 1);
    // 缺省字段按空字符串处理
    assert_eq!(source.lookup("8.8.8.8").await.unwrap(), GeoRecord::new("US", ""));
}

#[tokio::test]
async fn test_ip_keys_are_normalized() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "v6.json",
        r#"[{"ip":"2001:0db8:0000:0000:0000:0000:0000:0001","country":"NL","city":"Amsterdam"}]"#,
    );

    let source = DiskSource::load(dir.path()).unwrap();
    assert_eq!(source.lookup("2001:db8::1").await.unwrap().country, "NL");
}

#[tokio::test]
async fn test_single_file_path() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "only.json", r#"[{"ip":"8.8.8.8","country":"US","city":""}]"#);

    let source = DiskSource::load(dir.path().join("only.json")).unwrap();
    assert_eq!(source.len(), 1);
}

#[test]
fn test_empty_directory_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let source = DiskSource::load(dir.path()).unwrap();
    assert!(source.is_empty());
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.json", r#"{"ip": "8.8.8.8"}"#);

    let err = DiskSource::load(dir.path()).err().unwrap();
    assert!(matches!(err, IpLocatorError::Serialization(_)));
}

#[test]
fn test_missing_path_is_file_operation_error() {
    let dir = TempDir::new().unwrap();
    let err = DiskSource::load(dir.path().join("nope")).err().unwrap();
    assert!(matches!(err, IpLocatorError::FileOperation(_)));
}
