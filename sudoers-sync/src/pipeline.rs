//! Shared pass entrypoint used by the CLI and the daemon.
//!
//! Builds the desired state for a host from intent plus ownership, then
//! hands it to the [`Reconciler`].

use std::collections::BTreeSet;

use sudoers_core::{AppIntent, AppName, DesiredGrant, DesiredState, FileStore, StoreError, SudoersConfig};
use sudoers_renderer::Renderer;

use crate::reconcile::{PassReport, Reconciler};
use crate::report::{PassEvent, Reporter};
use crate::validator::Validator;
use crate::SyncError;

/// Maps an application to the principals allowed to act as it.
pub trait OwnershipSource {
    fn owners(&self, app: &AppName) -> Result<Vec<String>, StoreError>;
}

impl OwnershipSource for FileStore {
    fn owners(&self, app: &AppName) -> Result<Vec<String>, StoreError> {
        self.load_owners(app).map(|ownership| ownership.users)
    }
}

/// Desired state plus the applications whose lookup failed this pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredPlan {
    pub grants: DesiredState,
    /// Present in intent but without ownership data; their existing files
    /// are kept untouched.
    pub retained: BTreeSet<AppName>,
}

/// Query ownership once per application. Lookup failures are reported and
/// the application is retained rather than dropped.
///
/// Names that fail [`AppName::validate`] are never looked up. They pass
/// through with no principals so the reconciler reports them as
/// [`PassEvent::InvalidApp`] and counts them as failed.
pub fn build_desired_state(
    apps: &[AppIntent],
    owners: &dyn OwnershipSource,
    reporter: &dyn Reporter,
) -> DesiredPlan {
    let mut plan = DesiredPlan::default();
    for app in apps {
        if app.name.validate().is_err() {
            plan.grants.push(DesiredGrant {
                app: app.name.clone(),
                principals: Vec::new(),
            });
            continue;
        }
        match owners.owners(&app.name) {
            Ok(principals) => plan.grants.push(DesiredGrant {
                app: app.name.clone(),
                principals,
            }),
            Err(err) => {
                reporter.report(&PassEvent::OwnershipUnavailable {
                    app: app.name.clone(),
                    error: err.to_string(),
                });
                plan.retained.insert(app.name.clone());
            }
        }
    }
    plan
}

/// Load this host's intent and resolve ownership for every application.
pub fn desired_for_host(
    store: &FileStore,
    host: &str,
    reporter: &dyn Reporter,
) -> Result<DesiredPlan, SyncError> {
    let node = store.load_node(host)?;
    Ok(build_desired_state(&node.apps, store, reporter))
}

/// Run one full pass for `host`.
///
/// Failing to load the host's intent aborts the pass; everything after that
/// is isolated per application.
pub fn run_pass(
    config: &SudoersConfig,
    store: &FileStore,
    host: &str,
    validator: &dyn Validator,
    reporter: &dyn Reporter,
) -> Result<PassReport, SyncError> {
    let renderer = Renderer::new()?;
    let plan = desired_for_host(store, host, reporter)?;
    Reconciler::new(config, &renderer, validator, reporter)
        .reconcile_retaining(&plan.grants, &plan.retained)
}
