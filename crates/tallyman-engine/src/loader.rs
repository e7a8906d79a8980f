//! Migration discovery and loading
//!
//! Versions come from two places: `Version<ts>.<ext>` files in the configured
//! directory and units compiled into the registry. Each version must resolve
//! to exactly one artifact.

use crate::registry::Registry;
use crate::script::SqlScriptMigration;
use crate::unit::Migration;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tallyman_core::errors::{ExError, ExErrorKind, MigrationError, Result};
use tallyman_core::Version;

const ARTIFACT_PATTERN: &str = r"^Version(\d{14})\.([A-Za-z0-9]+)$";
const SCRIPT_EXTENSION: &str = "sql";

/// Where the unit for a version comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// `Version<ts>.sql`, executed as a script
    Script(PathBuf),
    /// A unit in the registry, optionally with its source file on disk
    Registered(Option<PathBuf>),
    /// A non-SQL file with no registered unit behind it
    Unregistered(PathBuf),
}

pub struct MigrationLoader {
    source: Option<PathBuf>,
    registry: Registry,
    pattern: Regex,
}

impl MigrationLoader {
    pub fn new(source: Option<PathBuf>, registry: Registry) -> Result<Self> {
        let pattern = Regex::new(ARTIFACT_PATTERN).map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("build_loader")
                .with_message(e.to_string())
        })?;
        Ok(Self {
            source,
            registry,
            pattern,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every available version, ascending by embedded timestamp
    ///
    /// Files that do not follow the naming convention are skipped.
    pub fn list_available(&self) -> Result<Vec<Version>> {
        Ok(self.artifacts()?.into_keys().collect())
    }

    /// Every available version with the artifact it resolves to
    pub fn artifacts(&self) -> Result<BTreeMap<Version, Artifact>> {
        let mut files = self.scan()?;
        for version in self.registry.versions() {
            files.entry(version.clone()).or_default();
        }

        files
            .into_iter()
            .map(|(version, paths)| {
                let artifact = self.resolve(&version, paths)?;
                Ok((version, artifact))
            })
            .collect()
    }

    /// Materialize the unit for `version`
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing provides the version, `InvalidUnit` when a file
    /// exists but no unit can be built from it.
    pub fn load(&self, version: &Version) -> Result<Box<dyn Migration>> {
        let paths = self.scan()?.remove(version).unwrap_or_default();
        match self.resolve(version, paths)? {
            Artifact::Script(path) => Ok(Box::new(SqlScriptMigration::load(
                version.clone(),
                &path,
            )?)),
            Artifact::Registered(_) => self.registry.instantiate(version).ok_or_else(|| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("load")
                    .with_version(version.as_str())
                    .with_message("registered unit disappeared")
            }),
            Artifact::Unregistered(path) => Err(MigrationError::InvalidUnit {
                version: version.to_string(),
                reason: format!(
                    "{} has no registered unit {}",
                    path.display(),
                    self.registry.qualified_name(version)
                ),
            }
            .into()),
        }
    }

    fn resolve(&self, version: &Version, mut paths: Vec<PathBuf>) -> Result<Artifact> {
        let registered = self.registry.contains(version);
        let has_script = paths.iter().any(|p| is_script(p));

        if paths.len() > 1 || (registered && has_script) {
            let mut artifacts: Vec<String> =
                paths.iter().map(|p| p.display().to_string()).collect();
            if registered {
                artifacts.push(self.registry.qualified_name(version));
            }
            return Err(MigrationError::DuplicateVersion {
                version: version.to_string(),
                artifacts,
            }
            .into());
        }

        if registered {
            return Ok(Artifact::Registered(paths.pop()));
        }
        match paths.pop() {
            Some(path) if is_script(&path) => Ok(Artifact::Script(path)),
            Some(path) => Ok(Artifact::Unregistered(path)),
            None => Err(MigrationError::ArtifactNotFound {
                version: version.to_string(),
                location: self.describe_source(),
            }
            .into()),
        }
    }

    fn scan(&self) -> Result<BTreeMap<Version, Vec<PathBuf>>> {
        let mut found: BTreeMap<Version, Vec<PathBuf>> = BTreeMap::new();
        let Some(dir) = &self.source else {
            return Ok(found);
        };

        let unreadable = |e: std::io::Error| MigrationError::SourceUnreadable {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(captures) = self.pattern.captures(name) else {
                tracing::trace!(file = name, "not a migration artifact");
                continue;
            };
            // Matches the convention, so it is an error rather than skipped
            let version = Version::parse(&captures[1]).map_err(|_| {
                MigrationError::ImpossibleTimestamp {
                    path: path.display().to_string(),
                    value: captures[1].to_string(),
                }
            })?;
            found.entry(version).or_default().push(path);
        }

        for paths in found.values_mut() {
            paths.sort();
        }
        Ok(found)
    }

    fn describe_source(&self) -> String {
        match &self.source {
            Some(dir) => format!("{} or namespace {}", dir.display(), self.registry.namespace()),
            None => format!("namespace {}", self.registry.namespace()),
        }
    }
}

fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
}
