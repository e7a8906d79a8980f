//! Migrate command
//!
//! Usage: tallyman migrate [--version <VERSION>] [--dry-run] [--force]

use super::GlobalArgs;
use clap::Args;
use tallyman_core::Version;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Apply only this version (YYYYMMDDHHMMSS)
    #[arg(long)]
    pub version: Option<String>,

    /// List what would run without touching the database
    #[arg(long)]
    pub dry_run: bool,

    /// With --version, apply even if the version is already recorded
    #[arg(long, requires = "version")]
    pub force: bool,
}

pub fn execute(args: MigrateArgs, global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manager = global.open_manager()?;

    match &args.version {
        Some(version) => {
            let version = Version::parse(version)?;
            let already = manager.applied_migrations()?.contains(&version);
            if already && !args.force {
                println!("Version {} already applied, skipping (use --force to re-run)", version);
            } else if args.dry_run {
                println!("Would apply {}", version);
            } else {
                manager.run_one(&version)?;
                println!("Applied {}", version);
            }
        }
        None if args.dry_run => {
            let pending = manager.pending_migrations()?;
            if pending.is_empty() {
                println!("Nothing to migrate");
            }
            for version in pending {
                println!("Would apply {}", version);
            }
        }
        None => {
            // Printed as they land so a failure still shows what was applied
            let applied = manager.run_all_with(|version| println!("Applied {}", version))?;
            if applied.is_empty() {
                println!("Nothing to migrate");
            }
        }
    }

    manager.close()?;
    Ok(())
}
