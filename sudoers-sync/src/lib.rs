//! # sudoers-sync
//!
//! Validate-before-write installer and the reconciliation pass.
//!
//! Call [`reconcile`] (or build a [`Reconciler`]) with a desired state to
//! bring the managed directory in line, or [`pipeline::run_pass`] to load the
//! desired state for a host from the intent store first.

pub mod diff;
pub mod error;
pub mod installer;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod report;
pub mod validator;

pub use error::SyncError;
pub use installer::{InstallResult, Installer};
pub use pipeline::{run_pass, DesiredPlan, OwnershipSource};
pub use reconcile::{reconcile, PassReport, Reconciler};
pub use report::{LogReporter, MemoryReporter, PassEvent, Reporter};
pub use validator::{CommandValidator, ValidationFailure, Validator};
