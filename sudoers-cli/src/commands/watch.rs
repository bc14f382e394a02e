//! `pp-sudoers watch`: run the intent consumer in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use sudoers_daemon::{start_blocking, DaemonOptions};

use super::context::{GlobalArgs, RunContext};

/// Arguments for `pp-sudoers watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {}

impl WatchArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let ctx = RunContext::load(global)?;
        let host = ctx.host.clone();
        start_blocking(DaemonOptions {
            config: ctx.config,
            host: ctx.host,
        })
        .with_context(|| format!("watcher for host '{host}' stopped"))
    }
}
