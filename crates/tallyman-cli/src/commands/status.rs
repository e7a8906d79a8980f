//! Status command
//!
//! Usage: tallyman status [--json]

use super::GlobalArgs;
use clap::Args;
use tallyman_engine::MigrationStatus;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatusArgs, global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manager = global.open_manager()?;
    let lines = manager.status()?;
    manager.close()?;

    if args.json {
        let rows: Vec<serde_json::Value> = lines.iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if lines.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    println!("{:<16} {:<9} {:<23} DESCRIPTION", "VERSION", "STATE", "APPLIED AT");
    for line in &lines {
        println!(
            "{:<16} {:<9} {:<23} {}",
            line.version,
            state(line),
            applied_at(line).unwrap_or_else(|| "-".to_string()),
            line.description.as_deref().unwrap_or("")
        );
    }

    let pending = lines.iter().filter(|l| !l.is_applied()).count();
    println!();
    println!("{} applied, {} pending", lines.len() - pending, pending);
    Ok(())
}

fn state(line: &MigrationStatus) -> &'static str {
    match (line.is_applied(), line.orphaned) {
        (_, true) => "orphaned",
        (true, false) => "applied",
        (false, false) => "pending",
    }
}

fn applied_at(line: &MigrationStatus) -> Option<String> {
    line.applied_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}

fn to_json(line: &MigrationStatus) -> serde_json::Value {
    serde_json::json!({
        "version": line.version.as_str(),
        "state": state(line),
        "applied_at": applied_at(line),
        "description": line.description,
    })
}
