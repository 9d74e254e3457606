use anyhow::{Context as _, Result};
use clap::Parser;
use rollcall_core::Config;

mod cli;
mod commands;
mod prompt;

use cli::{Cli, Commands};
use commands::register::RegisterArgs;
use commands::Context;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(dir) = cli.faces_dir {
        config.faces_dir = dir;
    }
    let ctx = Context {
        config,
        assume_yes: cli.yes,
    };

    match cli.command {
        Commands::Register {
            id,
            name,
            force,
            frames,
            camera,
        } => commands::register::run(
            &ctx,
            RegisterArgs {
                id,
                name,
                force,
                frames,
                camera,
            },
        )?,
        Commands::Users { action } => commands::users::run(&ctx, action)?,
        Commands::Lecture { action } => commands::lecture::run(&ctx, action)?,
        Commands::Today { limit } => commands::view::today(&ctx, limit)?,
        Commands::View { action } => commands::view::run(&ctx, action)?,
        Commands::Delete { action } => commands::delete::run(&ctx, action)?,
        Commands::Db { action } => commands::db::run(&ctx, action)?,
        Commands::Devices => commands::devices(),
    }

    Ok(())
}
