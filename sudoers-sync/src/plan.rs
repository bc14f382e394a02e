//! Read-only status of the managed directory against a desired state.
//!
//! Nothing is validated or written; this is what `pp-sudoers status` shows.
//!
//! Per-grant status precedence:
//! 1. `Invalid` (application name cannot be a file name)
//! 2. `Missing` (no managed file yet)
//! 3. `Outdated` (on-disk bytes differ from the rendered grant)
//! 4. `Current`

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;

use sudoers_core::{AppName, SudoersConfig};
use sudoers_renderer::Renderer;

use crate::error::{io_err, SyncError};
use crate::installer::TMP_PREFIX;
use crate::pipeline::DesiredPlan;
use crate::reconcile::{has_prefix, list_managed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantStatus {
    Current,
    Missing,
    Outdated,
    Invalid { reason: String },
}

impl GrantStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GrantStatus::Current => "current",
            GrantStatus::Missing => "missing",
            GrantStatus::Outdated => "outdated",
            GrantStatus::Invalid { .. } => "invalid",
        }
    }

    pub fn needs_sync(&self) -> bool {
        matches!(self, GrantStatus::Missing | GrantStatus::Outdated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPlan {
    pub app: AppName,
    pub path: PathBuf,
    pub status: GrantStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub grants: Vec<GrantPlan>,
    /// Kept because their ownership lookup failed.
    pub retained: Vec<AppName>,
    /// Managed names a pass would delete.
    pub stale: Vec<String>,
    /// Entries in the directory outside the managed namespace.
    pub unmanaged: usize,
}

impl Plan {
    pub fn is_converged(&self) -> bool {
        self.stale.is_empty() && self.grants.iter().all(|g| g.status == GrantStatus::Current)
    }
}

/// Compare every desired grant and the managed namespace with disk.
pub fn plan(
    config: &SudoersConfig,
    renderer: &Renderer,
    desired: &DesiredPlan,
) -> Result<Plan, SyncError> {
    let actual = list_managed(&config.path, &config.prefix)?;
    let mut out = Plan {
        retained: desired.retained.iter().cloned().collect(),
        unmanaged: count_unmanaged(config)?,
        ..Plan::default()
    };

    for grant in &desired.grants {
        let path = config.managed_path(&grant.app.managed_file_name(&config.prefix));
        let status = match grant.app.validate() {
            Err(err) => GrantStatus::Invalid {
                reason: err.to_string(),
            },
            Ok(()) => {
                let rendered = renderer.render_grant(grant)?;
                match std::fs::read(&path) {
                    Ok(current) if current == rendered.as_bytes() => GrantStatus::Current,
                    Ok(_) => GrantStatus::Outdated,
                    Err(err) if err.kind() == ErrorKind::NotFound => GrantStatus::Missing,
                    Err(err) => return Err(io_err(&path, err)),
                }
            }
        };
        out.grants.push(GrantPlan {
            app: grant.app.clone(),
            path,
            status,
        });
    }

    let expected = expected_names(config, desired);
    out.stale = actual
        .difference(&expected)
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    Ok(out)
}

/// Managed names a pass over `desired` keeps.
pub fn expected_names(config: &SudoersConfig, desired: &DesiredPlan) -> BTreeSet<OsString> {
    desired
        .grants
        .iter()
        .map(|g| &g.app)
        .chain(desired.retained.iter())
        .filter(|app| app.validate().is_ok())
        .map(|app| OsString::from(app.managed_file_name(&config.prefix)))
        .collect()
}

fn count_unmanaged(config: &SudoersConfig) -> Result<usize, SyncError> {
    let entries = std::fs::read_dir(&config.path).map_err(|source| SyncError::ListDir {
        path: config.path.clone(),
        source,
    })?;
    Ok(entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            !has_prefix(&name, &config.prefix) && !has_prefix(&name, TMP_PREFIX)
        })
        .count())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sudoers_core::DesiredGrant;
    use tempfile::TempDir;

    use super::*;

    fn desired(grants: Vec<DesiredGrant>) -> DesiredPlan {
        DesiredPlan {
            grants,
            retained: BTreeSet::new(),
        }
    }

    #[test]
    fn classifies_each_grant() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pp-current"), "alice ALL = (current) ALL").unwrap();
        fs::write(tmp.path().join("pp-outdated"), "bob ALL = (outdated) ALL").unwrap();
        fs::write(tmp.path().join("pp-stale"), "carol ALL = (stale) ALL").unwrap();
        fs::write(tmp.path().join("README"), "unmanaged").unwrap();

        let config = SudoersConfig::for_path(tmp.path());
        let renderer = Renderer::new().unwrap();
        let result = plan(
            &config,
            &renderer,
            &desired(vec![
                DesiredGrant::new("current", ["alice"]),
                DesiredGrant::new("outdated", ["alice"]),
                DesiredGrant::new("missing", ["alice"]),
                DesiredGrant::new("a/b", ["alice"]),
            ]),
        )
        .unwrap();

        let labels: Vec<_> = result.grants.iter().map(|g| g.status.label()).collect();
        assert_eq!(labels, vec!["current", "outdated", "missing", "invalid"]);
        assert_eq!(result.stale, vec!["pp-stale".to_string()]);
        assert_eq!(result.unmanaged, 1);
        assert!(!result.is_converged());
    }

    #[test]
    fn plan_does_not_write() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pp-stale"), "x").unwrap();
        let config = SudoersConfig::for_path(tmp.path());
        let renderer = Renderer::new().unwrap();

        plan(&config, &renderer, &desired(vec![DesiredGrant::new("new", ["a"])])).unwrap();

        assert!(tmp.path().join("pp-stale").exists());
        assert!(!tmp.path().join("pp-new").exists());
    }

    #[test]
    fn retained_apps_are_not_stale() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pp-billing"), "x").unwrap();
        let config = SudoersConfig::for_path(tmp.path());
        let renderer = Renderer::new().unwrap();
        let desired = DesiredPlan {
            grants: vec![],
            retained: BTreeSet::from([AppName::from("billing")]),
        };

        let result = plan(&config, &renderer, &desired).unwrap();
        assert!(result.stale.is_empty());
        assert!(result.is_converged());
    }
}
