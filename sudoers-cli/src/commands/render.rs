//! `pp-sudoers render <app> [principal...]`

use anyhow::{Context, Result};
use clap::Args;

/// Arguments for `pp-sudoers render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Application (run-as user) the grant is for.
    pub app: String,

    /// Users or `%groups` allowed to act as the application.
    pub principals: Vec<String>,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let content = sudoers_renderer::render(&self.app, &self.principals)
            .with_context(|| format!("failed to render grant for '{}'", self.app))?;
        println!("{content}");
        Ok(())
    }
}
