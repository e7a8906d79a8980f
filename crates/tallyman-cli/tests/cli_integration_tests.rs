//! CLI integration tests
//!
//! Run the `tallyman` binary against a scratch directory holding a SQLite
//! database and a migrations folder.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("migrations")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn db_path(&self) -> PathBuf {
        self.root().join("app.db")
    }

    fn database_url(&self) -> String {
        format!("sqlite://localhost/{}", self.db_path().display())
    }

    fn migration(&self, name: &str, sql: &str) {
        fs::write(self.root().join("migrations").join(name), sql).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tallyman"))
            .current_dir(self.root())
            .env_remove("TALLYMAN_DATABASE_URL")
            .env("RUST_LOG", "off")
            .args(["--database-url", &self.database_url(), "--migrations-path", "migrations"])
            .args(args)
            .output()
            .expect("Failed to execute CLI")
    }

    fn applied(&self) -> Vec<String> {
        let conn = Connection::open(self.db_path()).unwrap();
        let mut stmt = conn
            .prepare("SELECT version FROM migration_versions ORDER BY executed_at, rowid")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_migrate_applies_pending_in_order() {
    let project = Project::new();
    project.migration("Version20230102000000.sql", "CREATE TABLE posts (id INTEGER);");
    project.migration("Version20230101000000.sql", "CREATE TABLE users (id INTEGER);");

    let output = project.run(&["migrate"]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Applied 20230101000000"));
    assert!(out.contains("Applied 20230102000000"));
    assert_eq!(project.applied(), vec!["20230101000000", "20230102000000"]);

    let again = project.run(&["migrate"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("Nothing to migrate"));
}

#[test]
fn test_migrate_failure_exits_with_error() {
    let project = Project::new();
    project.migration("Version20230101000000.sql", "CREATE TABLE users (id INTEGER);");
    project.migration("Version20230102000000.sql", "INSERT INTO nowhere VALUES (1);");

    let output = project.run(&["migrate"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error: "), "Stderr: {}", err);
    assert!(err.contains("SQL ERROR"), "Stderr: {}", err);
    assert!(err.contains("20230102000000"), "Stderr: {}", err);
    assert_eq!(project.applied(), vec!["20230101000000"]);

    let out = stdout(&output);
    assert!(out.contains("Applied 20230101000000"), "Stdout: {}", out);
    assert!(!out.contains("Applied 20230102000000"), "Stdout: {}", out);
}

#[test]
fn test_dry_run_touches_nothing() {
    let project = Project::new();
    project.migration("Version20230101000000.sql", "CREATE TABLE users (id INTEGER);");

    let output = project.run(&["migrate", "--dry-run"]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Would apply 20230101000000"));
    assert!(project.applied().is_empty());
}

#[test]
fn test_migrate_single_version_skips_applied_unless_forced() {
    let project = Project::new();
    project.migration(
        "Version20230101000000.sql",
        "CREATE TABLE IF NOT EXISTS users (id INTEGER);",
    );
    project.migration("Version20230102000000.sql", "CREATE TABLE posts (id INTEGER);");

    let output = project.run(&["migrate", "--version", "20230101000000"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    assert_eq!(project.applied(), vec!["20230101000000"]);

    let skipped = project.run(&["migrate", "--version", "20230101000000"]);
    assert!(skipped.status.success());
    assert!(stdout(&skipped).contains("already applied"));
    assert_eq!(project.applied().len(), 1);

    let forced = project.run(&["migrate", "--version", "20230101000000", "--force"]);
    assert!(forced.status.success(), "Stderr: {}", stderr(&forced));
    assert_eq!(project.applied(), vec!["20230101000000", "20230101000000"]);
}

#[test]
fn test_status_reports_states() {
    let project = Project::new();
    project.migration(
        "Version20230101000000.sql",
        "-- create users\nCREATE TABLE users (id INTEGER);",
    );
    project.migration("Version20230102000000.sql", "CREATE TABLE posts (id INTEGER);");
    let migrate = project.run(&["migrate", "--version", "20230101000000"]);
    assert!(migrate.status.success(), "Stderr: {}", stderr(&migrate));

    let output = project.run(&["status", "--json"]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["version"], "20230101000000");
    assert_eq!(rows[0]["state"], "applied");
    assert_eq!(rows[0]["description"], "create users");
    assert_eq!(rows[1]["state"], "pending");
    assert!(rows[1]["applied_at"].is_null());

    let table = project.run(&["status"]);
    assert!(stdout(&table).contains("1 applied, 1 pending"));
}

#[test]
fn test_generate_creates_file_and_refuses_overwrite() {
    let project = Project::new();

    let output = project.run(&["generate", "--version", "20240101120000"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let path = project
        .root()
        .join("migrations")
        .join("Version20240101120000.sql");
    assert!(path.is_file());

    let again = project.run(&["generate", "--version", "20240101120000", "--kind", "rs"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("already exists"));
    assert!(!project
        .root()
        .join("migrations")
        .join("Version20240101120000.rs")
        .exists());

    // The scaffold is a valid, empty unit
    let migrate = project.run(&["migrate"]);
    assert!(migrate.status.success(), "Stderr: {}", stderr(&migrate));
    assert_eq!(project.applied(), vec!["20240101120000"]);
}

#[test]
fn test_schema_prints_ddl_for_configured_table() {
    let project = Project::new();
    fs::write(
        project.root().join("tallyman.toml"),
        "table_name = \"schema_log\"\n",
    )
    .unwrap();

    let output = project.run(&["schema"]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("CREATE TABLE IF NOT EXISTS"));
    assert!(out.contains("schema_log"));
}

#[test]
fn test_config_file_is_read() {
    let project = Project::new();
    project.migration("Version20230101000000.sql", "CREATE TABLE users (id INTEGER);");
    fs::write(
        project.root().join("custom.toml"),
        "table_name = \"applied_versions\"\n",
    )
    .unwrap();

    let output = project.run(&["--config", "custom.toml", "migrate"]);

    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let conn = Connection::open(project.db_path()).unwrap();
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM applied_versions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(n, 1);
}

#[test]
fn test_missing_database_name_is_reported() {
    let project = Project::new();

    let output = Command::new(env!("CARGO_BIN_EXE_tallyman"))
        .current_dir(project.root())
        .env_remove("TALLYMAN_DATABASE_URL")
        .args(["--database-url", "sqlite://localhost", "status"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("database name not provided"));
}
