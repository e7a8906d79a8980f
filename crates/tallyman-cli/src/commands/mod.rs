//! Subcommands and the options they share

pub mod generate;
pub mod migrate;
pub mod schema;
pub mod status;

use clap::Args;
use std::path::{Path, PathBuf};
use tallyman_core::errors::Result;
use tallyman_core::Configuration;
use tallyman_engine::{MigrationsManager, Registry};

/// Read when `--config` is not given and the file exists
pub const DEFAULT_CONFIG_FILE: &str = "tallyman.toml";

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file [default: tallyman.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, e.g. sqlite://localhost/app.db
    #[arg(long, global = true, env = "TALLYMAN_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory holding Version<YYYYMMDDHHMMSS>.* files
    #[arg(long, global = true)]
    pub migrations_path: Option<PathBuf>,
}

impl GlobalArgs {
    /// The configuration file, if any, with command-line overrides applied
    pub fn configuration(&self) -> Result<Configuration> {
        let mut config = match &self.config {
            Some(path) => Configuration::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Configuration::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Configuration::default(),
        };
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(path) = &self.migrations_path {
            config.migrations_path = Some(path.clone());
        }
        Ok(config)
    }

    /// Open the configured database
    ///
    /// The binary has no compiled-in units, so only `.sql` files are runnable.
    pub fn open_manager(&self) -> Result<MigrationsManager> {
        let config = self.configuration()?;
        let registry = Registry::new(config.migrations_namespace.clone());
        MigrationsManager::open(&config, registry)
    }
}
