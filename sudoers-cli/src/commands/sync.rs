//! `pp-sudoers sync`: one reconciliation pass for this host.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use sudoers_sync::report::Tee;
use sudoers_sync::{
    run_pass, CommandValidator, LogReporter, MemoryReporter, PassEvent, PassReport, Reporter,
};

use super::context::{GlobalArgs, RunContext};

/// Arguments for `pp-sudoers sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Emit the pass report as JSON instead of one line per event.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RunContext::load(global)?;
        let store = ctx.store();
        let validator = CommandValidator::from_config(&ctx.config.validator);

        if self.json {
            let memory = MemoryReporter::new();
            let report = run_pass(
                &ctx.config,
                &store,
                &ctx.host,
                &validator,
                &Tee(&LogReporter, &memory),
            )
            .with_context(|| format!("pass failed for host '{}'", ctx.host))?;
            let payload = SyncJson {
                host: &ctx.host,
                report: &report,
                events: memory.messages(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize pass JSON")?
            );
            return Ok(());
        }

        let report = run_pass(&ctx.config, &store, &ctx.host, &validator, &ConsoleReporter)
            .with_context(|| format!("pass failed for host '{}'", ctx.host))?;
        print_summary(&ctx.host, &report);
        Ok(())
    }
}

#[derive(Serialize)]
struct SyncJson<'a> {
    host: &'a str,
    report: &'a PassReport,
    events: Vec<String>,
}

/// Prints each event as it happens; failures go to stderr.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: &PassEvent) {
        match event {
            PassEvent::ValidationFailed { failure, .. } => {
                eprintln!("{} {event}", "✗".red().bold());
                for line in failure.output.lines() {
                    eprintln!("    {}", line.bright_black());
                }
            }
            _ if event.is_failure() => eprintln!("{} {event}", "✗".red().bold()),
            PassEvent::Installed { .. } | PassEvent::Deleted { .. } => {
                println!("{} {event}", "✓".green().bold())
            }
            PassEvent::Unchanged { .. } => println!("{} {event}", "·".bright_black()),
            _ => println!("{} {event}", "!".yellow().bold()),
        }
    }
}

fn print_summary(host: &str, report: &PassReport) {
    let line = format!(
        "'{host}': {} installed, {} unchanged, {} deleted, {} failed ({} ms)",
        report.installed.len(),
        report.unchanged.len(),
        report.deleted.len(),
        report.failed.len() + report.delete_failed.len(),
        report.duration_ms,
    );
    if report.has_failures() {
        println!("{} {line}", "!".yellow().bold());
    } else {
        println!("{} {line}", "✓".green().bold());
    }
}
