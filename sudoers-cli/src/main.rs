//! pp-sudoers: keeps a host's sudoers.d grants in line with its intent.
//!
//! # Usage
//!
//! ```text
//! pp-sudoers [--config FILE] [--path DIR] [--store DIR] [--host NAME] sync [--json]
//! pp-sudoers watch
//! pp-sudoers status [--json]
//! pp-sudoers diff
//! pp-sudoers render <app> [principal...]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    context::GlobalArgs, diff::DiffArgs, render::RenderArgs, status::StatusArgs, sync::SyncArgs,
    watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pp-sudoers",
    version,
    about = "Reconcile per-application sudoers grants against intent",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass for this host.
    Sync(SyncArgs),

    /// Watch the intent store and reconcile on every change.
    Watch(WatchArgs),

    /// Show per-application grant status without changing anything.
    Status(StatusArgs),

    /// Show unified diffs of what a pass would change.
    Diff(DiffArgs),

    /// Print the grant rendered for an application.
    Render(RenderArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The daemon installs its own tracing subscriber, which also captures
    // `log` records; a second logger would prevent that.
    if !matches!(cli.command, Commands::Watch(_)) {
        init_logging();
    }

    match cli.command {
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Watch(args) => args.run(&cli.global),
        Commands::Status(args) => args.run(&cli.global),
        Commands::Diff(args) => args.run(&cli.global),
        Commands::Render(args) => args.run(),
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    let _ = env_logger::Builder::from_env(env).try_init();
}
