//! Options shared by every subcommand: configuration file, overrides and
//! host identity.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Args;

use sudoers_core::{config, FileStore, SudoersConfig};

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Managed sudoers directory (overrides the configuration file).
    #[arg(long, global = true, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Intent store root (overrides the configuration file).
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Host identity used to select intent; defaults to `hostname`.
    #[arg(long, global = true, value_name = "NAME")]
    pub host: Option<String>,
}

/// Resolved configuration plus the host it applies to.
pub struct RunContext {
    pub config: SudoersConfig,
    pub host: String,
}

impl RunContext {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        let host = match global.host.as_deref() {
            Some(host) => host.to_string(),
            None => detect_hostname().context(
                "could not determine this host's name; pass --host to set it explicitly",
            )?,
        };
        if host.trim().is_empty() {
            bail!("host name must not be empty");
        }
        log::debug!(
            "host {host}, managing {} from store {}",
            config.path.display(),
            config.store.display()
        );
        Ok(Self { config, host })
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.config.store)
    }
}

pub fn load_config(global: &GlobalArgs) -> Result<SudoersConfig> {
    let mut config = match global.config.as_deref() {
        Some(path) => config::load_at(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SudoersConfig::default(),
    };
    if let Some(path) = &global.path {
        config.path = path.clone();
    }
    if let Some(store) = &global.store {
        config.store = store.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn detect_hostname() -> Result<String> {
    let output = Command::new("hostname")
        .output()
        .context("failed to execute `hostname`")?;
    if !output.status.success() {
        bail!("`hostname` exited with {}", output.status);
    }
    let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hostname.is_empty() {
        bail!("`hostname` printed nothing");
    }
    Ok(hostname)
}
