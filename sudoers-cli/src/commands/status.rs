//! `pp-sudoers status`: per-application grant status, read-only.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sudoers_renderer::Renderer;
use sudoers_sync::pipeline::desired_for_host;
use sudoers_sync::plan::{plan, GrantStatus, Plan};
use sudoers_sync::MemoryReporter;

use super::context::{GlobalArgs, RunContext};

/// Arguments for `pp-sudoers status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RunContext::load(global)?;
        let renderer = Renderer::new().context("failed to build renderer")?;
        let lookups = MemoryReporter::new();
        let desired = desired_for_host(&ctx.store(), &ctx.host, &lookups)
            .with_context(|| format!("failed to load intent for host '{}'", ctx.host))?;
        let result = plan(&ctx.config, &renderer, &desired)
            .with_context(|| format!("failed to inspect {}", ctx.config.path.display()))?;

        if self.json {
            print_json(&ctx, &result, lookups.messages())?;
            return Ok(());
        }

        print_table(&ctx, result, lookups.messages());
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    host: &'a str,
    path: String,
    converged: bool,
    grants: Vec<GrantStatusJson>,
    retained: Vec<String>,
    stale: Vec<String>,
    unmanaged: usize,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct GrantStatusJson {
    app: String,
    status: &'static str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "application")]
    app: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "file")]
    file: String,
}

fn print_json(ctx: &RunContext, result: &Plan, warnings: Vec<String>) -> Result<()> {
    let payload = StatusJson {
        host: &ctx.host,
        path: ctx.config.path.display().to_string(),
        converged: result.is_converged(),
        grants: result
            .grants
            .iter()
            .map(|g| GrantStatusJson {
                app: g.app.0.clone(),
                status: g.status.label(),
                path: g.path.display().to_string(),
                reason: match &g.status {
                    GrantStatus::Invalid { reason } => Some(reason.clone()),
                    _ => None,
                },
            })
            .collect(),
        retained: result.retained.iter().map(|a| a.0.clone()).collect(),
        stale: result.stale.clone(),
        unmanaged: result.unmanaged,
        warnings,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(ctx: &RunContext, result: Plan, warnings: Vec<String>) {
    println!(
        "pp-sudoers v{} | host {} | {} grants | {} stale | {} unmanaged",
        env!("CARGO_PKG_VERSION"),
        ctx.host,
        result.grants.len(),
        result.stale.len(),
        result.unmanaged,
    );

    for warning in &warnings {
        println!("{} {warning}", "!".yellow().bold());
    }

    let converged = result.is_converged();
    let needs_sync = result.grants.iter().any(|g| g.status.needs_sync()) || !result.stale.is_empty();

    let mut rows: Vec<StatusTableRow> = result
        .grants
        .into_iter()
        .map(|g| StatusTableRow {
            status: status_cell(&g.status),
            file: g.path.display().to_string(),
            app: g.app.0,
        })
        .collect();
    rows.extend(result.retained.into_iter().map(|app| StatusTableRow {
        file: ctx
            .config
            .managed_path(&app.managed_file_name(&ctx.config.prefix))
            .display()
            .to_string(),
        app: app.0,
        status: "RETAINED".yellow().bold().to_string(),
    }));
    rows.extend(result.stale.into_iter().map(|name| StatusTableRow {
        app: "-".to_string(),
        status: "STALE".red().bold().to_string(),
        file: ctx.config.managed_path(&name).display().to_string(),
    }));

    if rows.is_empty() {
        println!("No grants for this host.");
        return;
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if converged {
        println!("{} up to date", "✓".green().bold());
    } else if needs_sync {
        println!("Run 'pp-sudoers sync' to apply pending changes.");
    }
}

fn status_cell(status: &GrantStatus) -> String {
    match status {
        GrantStatus::Current => "CURRENT".green().bold().to_string(),
        GrantStatus::Missing => "MISSING".yellow().bold().to_string(),
        GrantStatus::Outdated => "OUTDATED".yellow().bold().to_string(),
        GrantStatus::Invalid { reason } => format!("{} ({reason})", "INVALID".red().bold()),
    }
}
