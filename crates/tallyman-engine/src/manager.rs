//! Migrations manager
//!
//! Holds the one connection a run uses and answers the three questions a
//! runner asks: what exists, what ran, what is left. `run_all` and `run_one`
//! apply units and record them.
//!
//! Logging follows the op pattern:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure

#![allow(clippy::result_large_err)]

use crate::loader::{Artifact, MigrationLoader};
use crate::registry::Registry;
use crate::script::SqlScriptMigration;
use crate::unit::Migration;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tallyman_core::errors::{ExError, MigrationError, Result};
use tallyman_core::{log_op_end, log_op_error, log_op_start, Configuration, Version};
use tallyman_core_types::RunId;
use tallyman_store::{db, AppliedVersionStore, TableSpec};

/// One line of `status()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: Version,
    /// First recorded execution time, `None` while pending
    pub applied_at: Option<NaiveDateTime>,
    pub description: Option<String>,
    /// Recorded as applied but no longer provided by any artifact
    pub orphaned: bool,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

pub struct MigrationsManager {
    conn: Connection,
    loader: MigrationLoader,
    table: TableSpec,
}

impl MigrationsManager {
    /// Validate `config`, open its database and build the loader
    ///
    /// # Errors
    ///
    /// `Configuration` for bad settings, an unreachable database, or a
    /// registry labelled with a different namespace than the configuration.
    pub fn open(config: &Configuration, registry: Registry) -> Result<Self> {
        config.validate()?;
        let params = config.connection_params()?;
        let conn = db::open(&params, &config.driver_options)?;
        tracing::info!(dsn = %params.dsn(), table = %config.table_name, "connected");
        Self::build(conn, params.driver, config, registry)
    }

    /// Adopt an already open SQLite connection
    pub fn with_connection(
        conn: Connection,
        config: &Configuration,
        registry: Registry,
    ) -> Result<Self> {
        Self::build(conn, tallyman_core::Driver::Sqlite, config, registry)
    }

    fn build(
        conn: Connection,
        driver: tallyman_core::Driver,
        config: &Configuration,
        registry: Registry,
    ) -> Result<Self> {
        if registry.namespace() != config.migrations_namespace {
            return Err(MigrationError::NamespaceMismatch {
                registry: registry.namespace().to_string(),
                configured: config.migrations_namespace.clone(),
            }
            .into());
        }
        let table = TableSpec::from_config(driver, config)?;
        let loader = MigrationLoader::new(config.migrations_path.clone(), registry)?;
        Ok(Self {
            conn,
            loader,
            table,
        })
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| tallyman_store::errors::configuration("close_connection", e))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn loader(&self) -> &MigrationLoader {
        &self.loader
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    fn store(&self) -> AppliedVersionStore<'_> {
        AppliedVersionStore::new(&self.conn, self.table.clone())
    }

    /// Every version an artifact provides, ascending
    pub fn available_migrations(&self) -> Result<Vec<Version>> {
        self.loader.list_available()
    }

    /// Recorded versions in execution order, creating the table on first use
    pub fn applied_migrations(&self) -> Result<Vec<Version>> {
        let store = self.store();
        store.ensure_initialized()?;
        store.list_applied()
    }

    /// Available versions that have not been recorded, ascending
    pub fn pending_migrations(&self) -> Result<Vec<Version>> {
        let available = self.available_migrations()?;
        let applied = self.applied_migrations()?;
        Ok(pending_versions(available, &applied))
    }

    /// Every known version with its applied timestamp
    ///
    /// Recorded versions that no artifact provides any more are listed too,
    /// flagged as orphaned.
    pub fn status(&self) -> Result<Vec<MigrationStatus>> {
        let artifacts = self.loader.artifacts()?;
        let store = self.store();
        store.ensure_initialized()?;

        let mut applied_at: BTreeMap<Version, NaiveDateTime> = BTreeMap::new();
        for record in store.list_records()? {
            applied_at.entry(record.version).or_insert(record.executed_at);
        }

        let mut lines: Vec<MigrationStatus> = artifacts
            .iter()
            .map(|(version, artifact)| MigrationStatus {
                version: version.clone(),
                applied_at: applied_at.get(version).copied(),
                description: self.describe(version, artifact),
                orphaned: false,
            })
            .collect();

        lines.extend(
            applied_at
                .iter()
                .filter(|(version, _)| !artifacts.contains_key(*version))
                .map(|(version, at)| MigrationStatus {
                    version: version.clone(),
                    applied_at: Some(*at),
                    description: None,
                    orphaned: true,
                }),
        );
        lines.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(lines)
    }

    fn describe(&self, version: &Version, artifact: &Artifact) -> Option<String> {
        match artifact {
            Artifact::Script(path) => SqlScriptMigration::load(version.clone(), path)
                .ok()
                .and_then(|unit| unit.description().map(str::to_string)),
            Artifact::Registered(_) => self
                .loader
                .registry()
                .instantiate(version)
                .and_then(|unit| unit.description().map(str::to_string)),
            Artifact::Unregistered(_) => None,
        }
    }

    /// Apply every pending version in ascending order
    ///
    /// Stops at the first failure. Versions applied before it stay recorded;
    /// the failing one and everything after it stay pending. Returns the
    /// versions applied by this call.
    pub fn run_all(&self) -> Result<Vec<Version>> {
        self.run_all_with(|_| {})
    }

    /// `run_all`, calling `on_applied` as soon as each version is recorded
    ///
    /// The returned error does not carry the versions applied before it, so
    /// callers that report progress learn them here.
    pub fn run_all_with<F>(&self, on_applied: F) -> Result<Vec<Version>>
    where
        F: FnMut(&Version),
    {
        let run_id = RunId::new();
        log_op_start!("run_all", run_id = run_id.as_str());
        let start = Instant::now();

        let result = self.run_all_impl(&run_id, on_applied).map_err(|e| {
            let e = e.with_run_id(run_id.clone());
            let duration_ms = start.elapsed().as_millis() as u64;
            match e.version() {
                Some(version) => log_op_error!(
                    "run_all",
                    e.clone(),
                    duration_ms = duration_ms,
                    run_id = run_id.as_str(),
                    version = version
                ),
                None => log_op_error!(
                    "run_all",
                    e.clone(),
                    duration_ms = duration_ms,
                    run_id = run_id.as_str()
                ),
            }
            e
        })?;

        log_op_end!(
            "run_all",
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = run_id.as_str(),
            applied = result.len()
        );
        Ok(result)
    }

    fn run_all_impl<F>(&self, run_id: &RunId, mut on_applied: F) -> Result<Vec<Version>>
    where
        F: FnMut(&Version),
    {
        let pending = self.pending_migrations()?;
        tracing::info!(run_id = run_id.as_str(), pending = pending.len(), "pending migrations");

        let mut applied = Vec::with_capacity(pending.len());
        for version in pending {
            self.apply_and_record(&version)?;
            on_applied(&version);
            applied.push(version);
        }
        Ok(applied)
    }

    /// Apply one version and record it, whether or not it ran before
    pub fn run_one(&self, version: &Version) -> Result<()> {
        let run_id = RunId::new();
        log_op_start!(
            "run_one",
            run_id = run_id.as_str(),
            version = version.as_str()
        );
        let start = Instant::now();

        self.run_one_impl(version).map_err(|e| {
            let e = e.with_run_id(run_id.clone());
            log_op_error!(
                "run_one",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                run_id = run_id.as_str(),
                version = version.as_str()
            );
            e
        })?;

        log_op_end!(
            "run_one",
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = run_id.as_str(),
            version = version.as_str()
        );
        Ok(())
    }

    fn run_one_impl(&self, version: &Version) -> Result<()> {
        self.store().ensure_initialized()?;
        self.apply_and_record(version)
    }

    fn apply_and_record(&self, version: &Version) -> Result<()> {
        let unit = self.loader.load(version).map_err(|e| tag(e, version))?;
        tracing::info!(version = version.as_str(), "applying migration");
        unit.apply(&self.conn).map_err(|e| tag(e, version))?;
        self.store().record_applied(version)?;
        tracing::debug!(version = version.as_str(), "migration recorded");
        Ok(())
    }
}

fn tag(err: ExError, version: &Version) -> ExError {
    if err.version().is_some() {
        err
    } else {
        err.with_version(version.as_str())
    }
}

/// `available` minus `applied`, keeping the order of `available`
///
/// Applied versions with no matching artifact are ignored.
pub fn pending_versions(available: Vec<Version>, applied: &[Version]) -> Vec<Version> {
    let applied: HashSet<&Version> = applied.iter().collect();
    available
        .into_iter()
        .filter(|version| !applied.contains(version))
        .collect()
}
