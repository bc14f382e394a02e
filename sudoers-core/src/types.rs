//! Domain types for pp-sudoers.
//!
//! Everything here is transient: a desired state is rebuilt from intent on
//! every pass and only the managed directory itself is persistent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed application name, used verbatim as a file name suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(pub String);

impl AppName {
    /// Reject names that cannot be joined safely onto the managed directory.
    pub fn validate(&self) -> Result<(), StoreError> {
        let reason = if self.0.is_empty() {
            Some("name is empty")
        } else if self.0 == "." || self.0 == ".." {
            Some("name is a relative path component")
        } else if self.0.contains('/') {
            Some("name contains a path separator")
        } else if self.0.contains('\0') {
            Some("name contains a NUL byte")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StoreError::InvalidAppName {
                name: self.0.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Managed file name for this application under `prefix`.
    pub fn managed_file_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// One application and the principals allowed to act as it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredGrant {
    pub app: AppName,
    /// Users or `%groups`, in the order they should be rendered.
    #[serde(default)]
    pub principals: Vec<String>,
}

impl DesiredGrant {
    pub fn new<I, S>(app: impl Into<AppName>, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            app: app.into(),
            principals: principals.into_iter().map(Into::into).collect(),
        }
    }
}

/// The complete desired grant list for one pass.
pub type DesiredState = Vec<DesiredGrant>;

// ---------------------------------------------------------------------------
// Intent and ownership documents
// ---------------------------------------------------------------------------

/// An application scheduled on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIntent {
    pub name: AppName,
}

/// Per-host intent: the applications that should be present on this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IntentNode {
    #[serde(default)]
    pub apps: Vec<AppIntent>,
}

impl IntentNode {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AppName>,
    {
        Self {
            apps: names
                .into_iter()
                .map(|name| AppIntent { name: name.into() })
                .collect(),
        }
    }
}

/// Ownership record for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ownership {
    #[serde(default)]
    pub users: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
