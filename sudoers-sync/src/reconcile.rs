//! One reconciliation pass over the managed directory.
//!
//! 1. List the directory and collect every prefixed name (`actual`). A
//!    listing failure aborts the pass before anything is touched.
//! 2. Render and install each desired grant, collecting its file name into
//!    `expected` whether or not the install succeeded.
//! 3. Delete `actual − expected`.
//!
//! Per-application failures are reported and never abort the pass.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sudoers_core::{AppName, DesiredGrant, SudoersConfig};
use sudoers_renderer::Renderer;

use crate::error::SyncError;
use crate::installer::{InstallResult, Installer, TMP_PREFIX};
use crate::report::{PassEvent, Reporter};
use crate::validator::Validator;

// ---------------------------------------------------------------------------
// Pass report
// ---------------------------------------------------------------------------

/// Outcome of one pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub installed: Vec<String>,
    pub unchanged: Vec<String>,
    /// Applications whose grant could not be installed or updated.
    pub failed: Vec<String>,
    /// Managed file names removed as stale.
    pub deleted: Vec<String>,
    pub delete_failed: Vec<String>,
}

impl PassReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.delete_failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Everything a pass needs besides the desired state.
pub struct Reconciler<'a> {
    config: &'a SudoersConfig,
    renderer: &'a Renderer,
    validator: &'a dyn Validator,
    reporter: &'a dyn Reporter,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a SudoersConfig,
        renderer: &'a Renderer,
        validator: &'a dyn Validator,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            renderer,
            validator,
            reporter,
        }
    }

    pub fn reconcile(&self, desired: &[DesiredGrant]) -> Result<PassReport, SyncError> {
        self.reconcile_retaining(desired, &BTreeSet::new())
    }

    /// Like [`Reconciler::reconcile`], but the managed files of `retained`
    /// applications are never deleted even though they are not desired.
    pub fn reconcile_retaining(
        &self,
        desired: &[DesiredGrant],
        retained: &BTreeSet<AppName>,
    ) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let mut report = PassReport {
            started_at: Utc::now(),
            ..PassReport::default()
        };

        let actual = list_managed(&self.config.path, &self.config.prefix)?;

        let installer = Installer::new(self.validator, self.config.scratch_dir(), self.config.mode);
        let mut expected: BTreeSet<OsString> = retained
            .iter()
            .filter(|app| app.validate().is_ok())
            .map(|app| OsString::from(app.managed_file_name(&self.config.prefix)))
            .collect();
        let mut seen = BTreeSet::new();

        for grant in desired {
            if !seen.insert(&grant.app) {
                self.reporter.report(&PassEvent::DuplicateApp {
                    app: grant.app.clone(),
                });
            }
            if let Err(err) = grant.app.validate() {
                self.reporter.report(&PassEvent::invalid_app(&grant.app, &err));
                report.failed.push(grant.app.0.clone());
                continue;
            }

            let file_name = grant.app.managed_file_name(&self.config.prefix);
            expected.insert(OsString::from(&file_name));
            self.install_grant(&installer, grant, &file_name, &mut report);
        }

        for name in actual.difference(&expected) {
            let path = self.config.path.join(name);
            let display_name = name.to_string_lossy().into_owned();
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    self.reporter.report(&PassEvent::Deleted { path });
                    report.deleted.push(display_name);
                }
                Err(err) => {
                    self.reporter.report(&PassEvent::DeleteFailed {
                        path,
                        error: err.to_string(),
                    });
                    report.delete_failed.push(display_name);
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis();
        Ok(report)
    }

    fn install_grant(
        &self,
        installer: &Installer<'_>,
        grant: &DesiredGrant,
        file_name: &str,
        report: &mut PassReport,
    ) {
        let app = &grant.app;
        let target = self.config.managed_path(file_name);

        let outcome = self
            .renderer
            .render_grant(grant)
            .map_err(SyncError::from)
            .and_then(|content| installer.install(&target, content.as_bytes()));

        match outcome {
            Ok(InstallResult::Installed { path }) => {
                self.reporter.report(&PassEvent::Installed {
                    app: app.clone(),
                    path,
                });
                report.installed.push(app.0.clone());
            }
            Ok(InstallResult::Unchanged { path }) => {
                self.reporter.report(&PassEvent::Unchanged {
                    app: app.clone(),
                    path,
                });
                report.unchanged.push(app.0.clone());
            }
            Err(SyncError::Validation { path, failure }) => {
                self.reporter.report(&PassEvent::ValidationFailed {
                    app: app.clone(),
                    path,
                    failure,
                });
                report.failed.push(app.0.clone());
            }
            Err(err) => {
                self.reporter.report(&PassEvent::InstallFailed {
                    app: app.clone(),
                    error: err.to_string(),
                });
                report.failed.push(app.0.clone());
            }
        }
    }
}

/// Run one pass with freshly built collaborators.
pub fn reconcile(
    config: &SudoersConfig,
    desired: &[DesiredGrant],
    validator: &dyn Validator,
    reporter: &dyn Reporter,
) -> Result<PassReport, SyncError> {
    let renderer = Renderer::new()?;
    Reconciler::new(config, &renderer, validator, reporter).reconcile(desired)
}

/// Names in `dir` carrying `prefix`, compared byte for byte so names that
/// are not valid UTF-8 are still managed. Staged installer candidates never
/// are.
pub fn list_managed(dir: &Path, prefix: &str) -> Result<BTreeSet<OsString>, SyncError> {
    let list_err = |source: std::io::Error| SyncError::ListDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let name = entry.map_err(list_err)?.file_name();
        if has_prefix(&name, prefix) && !has_prefix(&name, TMP_PREFIX) {
            names.insert(name);
        }
    }
    Ok(names)
}

#[cfg(unix)]
pub(crate) fn has_prefix(name: &OsStr, prefix: &str) -> bool {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().starts_with(prefix.as_bytes())
}

#[cfg(not(unix))]
pub(crate) fn has_prefix(name: &OsStr, prefix: &str) -> bool {
    name.to_string_lossy().starts_with(prefix)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
