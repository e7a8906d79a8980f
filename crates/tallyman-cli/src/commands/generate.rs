//! Generate command
//!
//! Usage: tallyman generate [--version <VERSION>] [--kind sql|rs]

use super::GlobalArgs;
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tallyman_core::errors::{ExError, ExErrorKind};
use tallyman_core::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitKind {
    /// SQL script, runnable as is
    Sql,
    /// Rust function to register with the engine's Registry
    Rs,
}

impl UnitKind {
    fn extension(self) -> &'static str {
        match self {
            UnitKind::Sql => "sql",
            UnitKind::Rs => "rs",
        }
    }

    fn template(self, version: &Version, namespace: &str) -> String {
        match self {
            UnitKind::Sql => format!(
                "-- Version{version}\n\
                 -- Runs without a transaction: keep every statement safe to re-run.\n\n"
            ),
            UnitKind::Rs => format!(
                "// {namespace}::Version{version}\n\
                 //\n\
                 // registry.register_fn(\"{version}\", version_{version})?;\n\n\
                 use rusqlite::Connection;\n\
                 use tallyman_core::errors::Result;\n\
                 use tallyman_engine::unit::exec_batch;\n\n\
                 pub fn version_{version}(conn: &Connection) -> Result<()> {{\n    \
                     exec_batch(conn, \"\")?;\n    \
                     Ok(())\n\
                 }}\n"
            ),
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Version to create [default: current UTC time]
    #[arg(long)]
    pub version: Option<String>,

    #[arg(long, value_enum, default_value_t = UnitKind::Sql)]
    pub kind: UnitKind,
}

pub fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = global.configuration()?;
    let dir: PathBuf = config
        .migrations_path
        .clone()
        .ok_or("no migrations path configured (set migrations_path or --migrations-path)")?;

    let version = match &args.version {
        Some(v) => Version::parse(v)?,
        None => Version::now(),
    };

    std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
    if let Some(existing) = existing_artifact(&dir, &version).map_err(|e| io_error(&dir, e))? {
        return Err(format!(
            "version {} already exists: {}",
            version,
            existing.display()
        )
        .into());
    }

    let path = dir.join(format!("Version{}.{}", version, args.kind.extension()));
    let template = args.kind.template(&version, &config.migrations_namespace);
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .and_then(|mut file| file.write_all(template.as_bytes()))
        .map_err(|e| io_error(&path, e))?;

    println!("Created {}", path.display());
    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op("generate")
        .with_message(format!("{}: {}", path.display(), err))
}

fn existing_artifact(dir: &Path, version: &Version) -> std::io::Result<Option<PathBuf>> {
    let stem = format!("Version{}", version);
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.file_stem().is_some_and(|s| s == stem.as_str()) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_template_description_is_version() {
        let version = Version::parse("20230101000000").unwrap();
        let sql = UnitKind::Sql.template(&version, "PdoMigrations");
        assert!(sql.starts_with("-- Version20230101000000\n"));
    }

    #[test]
    fn test_rs_template_names_registration() {
        let version = Version::parse("20230101000000").unwrap();
        let rs = UnitKind::Rs.template(&version, "App");
        assert!(rs.contains("App::Version20230101000000"));
        assert!(rs.contains("register_fn(\"20230101000000\", version_20230101000000)"));
        assert!(rs.contains("pub fn version_20230101000000(conn: &Connection)"));
    }
}
