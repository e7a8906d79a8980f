// Discovery tests against real directories
#![allow(clippy::unwrap_used, clippy::expect_used)]

use rusqlite::Connection;
use tallyman_core::errors::{ExErrorKind, Result};
use tallyman_core::Version;
use tallyman_engine::{Artifact, MigrationLoader, Registry};
use tempfile::TempDir;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn touch(dir: &TempDir, name: &str) {
    std::fs::write(dir.path().join(name), "SELECT 1;").unwrap();
}

fn noop(_: &Connection) -> Result<()> {
    Ok(())
}

fn loader(dir: &TempDir) -> MigrationLoader {
    MigrationLoader::new(Some(dir.path().to_path_buf()), Registry::default()).unwrap()
}

#[test]
fn test_list_available_sorts_by_timestamp() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230301000000.sql");
    touch(&dir, "Version20221231235959.sql");
    touch(&dir, "Version20230101000000.sql");

    assert_eq!(
        loader(&dir).list_available().unwrap(),
        vec![v("20221231235959"), v("20230101000000"), v("20230301000000")]
    );
}

#[test]
fn test_non_conforming_names_are_ignored() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.sql");
    touch(&dir, "README.md");
    touch(&dir, "Version2023.sql");
    touch(&dir, "version20230102000000.sql");
    touch(&dir, "Version20230103000000.sql.orig~");
    std::fs::create_dir(dir.path().join("Version20230104000000.sql")).unwrap();

    assert_eq!(loader(&dir).list_available().unwrap(), vec![v("20230101000000")]);
}

#[test]
fn test_impossible_calendar_date_is_discovery_error() {
    for name in ["Version20230230000000.sql", "Version20231301000000.sql"] {
        let dir = TempDir::new().unwrap();
        touch(&dir, "Version20230101000000.sql");
        touch(&dir, name);

        let err = loader(&dir).list_available().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Discovery);
        assert!(err.message().contains(name), "message: {}", err.message());
    }
}

#[test]
fn test_artifacts_classify_each_version() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.sql");
    touch(&dir, "Version20230102000000.rs");
    touch(&dir, "Version20230103000000.rs");
    let mut registry = Registry::default();
    registry.register_fn("20230103000000", noop).unwrap();
    registry.register_fn("20230104000000", noop).unwrap();

    let loader = MigrationLoader::new(Some(dir.path().to_path_buf()), registry).unwrap();
    let artifacts = loader.artifacts().unwrap();

    assert!(matches!(artifacts[&v("20230101000000")], Artifact::Script(_)));
    assert!(matches!(artifacts[&v("20230102000000")], Artifact::Unregistered(_)));
    assert!(matches!(artifacts[&v("20230103000000")], Artifact::Registered(Some(_))));
    assert_eq!(artifacts[&v("20230104000000")], Artifact::Registered(None));
}

#[test]
fn test_two_files_for_one_version_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.sql");
    touch(&dir, "Version20230101000000.rs");

    let err = loader(&dir).list_available().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Configuration);
    assert_eq!(err.version(), Some("20230101000000"));
}

#[test]
fn test_script_and_registration_for_one_version_collide() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.sql");
    let mut registry = Registry::default();
    registry.register_fn("20230101000000", noop).unwrap();

    let loader = MigrationLoader::new(Some(dir.path().to_path_buf()), registry).unwrap();
    let err = loader.list_available().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Configuration);
    assert!(err.message().contains("PdoMigrations::Version20230101000000"));
}

#[test]
fn test_load_missing_version_is_not_found() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.sql");

    let err = loader(&dir).load(&v("20230102000000")).err().unwrap();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.version(), Some("20230102000000"));
}

#[test]
fn test_load_unregistered_file_is_invalid_unit() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "Version20230101000000.rs");

    let err = loader(&dir).load(&v("20230101000000")).err().unwrap();
    assert_eq!(err.kind(), ExErrorKind::InvalidUnit);
    assert!(err.message().contains("PdoMigrations::Version20230101000000"));
}

#[test]
fn test_load_script_returns_runnable_unit() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("Version20230101000000.sql"),
        "-- users\nCREATE TABLE users (id INTEGER);",
    )
    .unwrap();

    let unit = loader(&dir).load(&v("20230101000000")).unwrap();
    assert_eq!(unit.description(), Some("users"));

    let conn = Connection::open_in_memory().unwrap();
    unit.apply(&conn).unwrap();
}

#[test]
fn test_unreadable_source_is_discovery_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let loader = MigrationLoader::new(Some(missing), Registry::default()).unwrap();

    let err = loader.list_available().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Discovery);
}

#[test]
fn test_no_source_lists_registry_only() {
    let mut registry = Registry::default();
    registry.register_fn("20230101000000", noop).unwrap();
    let loader = MigrationLoader::new(None, registry).unwrap();

    assert_eq!(loader.list_available().unwrap(), vec![v("20230101000000")]);
    assert!(loader.source().is_none());
}
