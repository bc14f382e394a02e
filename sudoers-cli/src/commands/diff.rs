//! `pp-sudoers diff`: unified diffs of what a pass would change.

use anyhow::{Context, Result};
use clap::Args;

use sudoers_renderer::Renderer;
use sudoers_sync::diff::diff;
use sudoers_sync::pipeline::desired_for_host;
use sudoers_sync::LogReporter;

use super::context::{GlobalArgs, RunContext};

/// Arguments for `pp-sudoers diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RunContext::load(global)?;
        let renderer = Renderer::new().context("failed to build renderer")?;
        let desired = desired_for_host(&ctx.store(), &ctx.host, &LogReporter)
            .with_context(|| format!("failed to load intent for host '{}'", ctx.host))?;

        let diffs = diff(&ctx.config, &renderer, &desired)
            .with_context(|| format!("diff failed for {}", ctx.config.path.display()))?;

        if diffs.is_empty() {
            println!("No differences for '{}'.", ctx.host);
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
