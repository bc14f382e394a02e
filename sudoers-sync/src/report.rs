//! Pass reporting.
//!
//! Every outcome of a pass is emitted as a [`PassEvent`] through a
//! [`Reporter`] handed to the reconciler, so an operator can audit a pass from
//! its output alone and tests can assert on individual events.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;

use sudoers_core::{AppName, StoreError};

use crate::validator::ValidationFailure;

/// A single auditable outcome within a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassEvent {
    /// New or changed content was renamed into place.
    Installed { app: AppName, path: PathBuf },
    /// On-disk content already matched; nothing was written.
    Unchanged { app: AppName, path: PathBuf },
    /// The checker rejected the candidate; the target was left untouched.
    ValidationFailed {
        app: AppName,
        path: PathBuf,
        failure: ValidationFailure,
    },
    /// Rendering or I/O failed for this application.
    InstallFailed { app: AppName, error: String },
    /// The application name cannot be used as a file name.
    InvalidApp { app: AppName, reason: String },
    /// Ownership lookup failed; the existing grant is kept as is.
    OwnershipUnavailable { app: AppName, error: String },
    /// The application appears more than once in the desired state.
    DuplicateApp { app: AppName },
    Deleted { path: PathBuf },
    DeleteFailed { path: PathBuf, error: String },
}

impl PassEvent {
    /// Event for an application whose name failed [`AppName::validate`].
    pub fn invalid_app(app: &AppName, err: &StoreError) -> Self {
        let reason = match err {
            StoreError::InvalidAppName { reason, .. } => (*reason).to_string(),
            other => other.to_string(),
        };
        PassEvent::InvalidApp {
            app: app.clone(),
            reason,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            PassEvent::Installed { .. }
            | PassEvent::Unchanged { .. }
            | PassEvent::Deleted { .. } => Level::Info,
            PassEvent::OwnershipUnavailable { .. } | PassEvent::DuplicateApp { .. } => {
                Level::Warn
            }
            PassEvent::ValidationFailed { .. }
            | PassEvent::InstallFailed { .. }
            | PassEvent::InvalidApp { .. }
            | PassEvent::DeleteFailed { .. } => Level::Error,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.level() == Level::Error
    }
}

impl fmt::Display for PassEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassEvent::Installed { app, path } => {
                write!(f, "{app}: wrote new sudoers to {}", path.display())
            }
            PassEvent::Unchanged { app, .. } => write!(f, "{app}: no change to sudoers"),
            PassEvent::ValidationFailed { app, failure, .. } => {
                write!(f, "{app}: could not validate sudoers: {}", failure.reason)
            }
            PassEvent::InstallFailed { app, error } => {
                write!(f, "{app}: error writing sudoers: {error}")
            }
            PassEvent::InvalidApp { app, reason } => {
                write!(f, "{app}: invalid application name: {reason}")
            }
            PassEvent::OwnershipUnavailable { app, error } => {
                write!(f, "{app}: could not fetch ownership data: {error}")
            }
            PassEvent::DuplicateApp { app } => {
                write!(f, "{app}: listed more than once, last entry wins")
            }
            PassEvent::Deleted { path } => {
                write!(f, "{}: removed stale sudoers", path.display())
            }
            PassEvent::DeleteFailed { path, error } => {
                write!(f, "{}: could not remove stale sudoers: {error}", path.display())
            }
        }
    }
}

/// Sink for pass events.
pub trait Reporter {
    fn report(&self, event: &PassEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &PassEvent) {
        tracing::log!(event.level(), "{event}");
        if let PassEvent::ValidationFailed { app, failure, .. } = event {
            let output = failure.output.trim_end();
            if !output.is_empty() {
                tracing::error!("{app}: {output}");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<PassEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PassEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Rendered event lines, in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn output(&self) -> String {
        self.messages().join("\n")
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &PassEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans each event out to two reporters.
pub struct Tee<'a, A: Reporter + ?Sized, B: Reporter + ?Sized>(pub &'a A, pub &'a B);

impl<A: Reporter + ?Sized, B: Reporter + ?Sized> Reporter for Tee<'_, A, B> {
    fn report(&self, event: &PassEvent) {
        self.0.report(event);
        self.1.report(event);
    }
}
