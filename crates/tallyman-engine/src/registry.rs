//! Explicit registration of code-defined migration units
//!
//! Units written in Rust are compiled into the binary and registered under
//! their version. The registry replaces looking classes up by name at run
//! time: whatever is not in the table does not exist.

use crate::unit::Migration;
use rusqlite::Connection;
use std::collections::BTreeMap;
use tallyman_core::config::DEFAULT_NAMESPACE;
use tallyman_core::errors::{MigrationError, Result};
use tallyman_core::Version;

type Factory = Box<dyn Fn() -> Box<dyn Migration>>;

/// Plain function used as a unit by `Registry::register_fn`
pub type ApplyFn = fn(&Connection) -> Result<()>;

struct FnMigration(ApplyFn);

impl Migration for FnMigration {
    fn apply(&self, conn: &Connection) -> Result<()> {
        (self.0)(conn)
    }
}

/// Version -> unit factory table, labelled with a namespace
pub struct Registry {
    namespace: String,
    factories: BTreeMap<Version, Factory>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("versions", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Registry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            factories: BTreeMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a factory producing the unit for `version`
    ///
    /// # Errors
    ///
    /// `Configuration` if the version is malformed or already registered.
    pub fn register<F>(&mut self, version: &str, factory: F) -> Result<&mut Self>
    where
        F: Fn() -> Box<dyn Migration> + 'static,
    {
        let version = Version::parse(version)?;
        if self.factories.contains_key(&version) {
            return Err(MigrationError::DuplicateVersion {
                version: version.to_string(),
                artifacts: vec![self.qualified_name(&version); 2],
            }
            .into());
        }
        self.factories.insert(version, Box::new(factory));
        Ok(self)
    }

    /// Register a plain function as the unit for `version`
    pub fn register_fn(&mut self, version: &str, apply: ApplyFn) -> Result<&mut Self> {
        self.register(version, move || Box::new(FnMigration(apply)))
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.factories.contains_key(version)
    }

    /// Registered versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.factories.keys()
    }

    /// Build a fresh unit for `version`, if one is registered
    pub fn instantiate(&self, version: &Version) -> Option<Box<dyn Migration>> {
        self.factories.get(version).map(|factory| factory())
    }

    /// `<namespace>::Version<ts>`, the name a unit is known by in messages
    pub fn qualified_name(&self, version: &Version) -> String {
        format!("{}::Version{}", self.namespace, version)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
