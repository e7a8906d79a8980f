//! tallyman CLI
//!
//! Command-line interface for running versioned schema migrations

use clap::{Parser, Subcommand};
use tallyman_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "tallyman")]
#[command(about = "tallyman - Versioned schema migrations", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show applied and pending migrations
    Status(commands::status::StatusArgs),
    /// Apply pending migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Scaffold a new migration file
    Generate(commands::generate::GenerateArgs),
    /// Print the bookkeeping table DDL
    Schema,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    logging_facility::init(if cli.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Status(args) => commands::status::execute(args, &cli.global),
        Commands::Migrate(args) => commands::migrate::execute(args, &cli.global),
        Commands::Generate(args) => commands::generate::execute(args, &cli.global),
        Commands::Schema => commands::schema::execute(&cli.global),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
