//! YAML-backed intent and ownership store.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   nodes/
//!     <host>.yaml   (apps scheduled on the host)
//!   apps/
//!     <app>.yaml    (ownership: users allowed to act as the app)
//! ```
//!
//! Saves use the same `.tmp` sibling + rename pattern everywhere so a watcher
//! never observes a half-written document.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{io_err, StoreError};
use crate::types::{AppName, IntentNode, Ownership};

pub const NODES_DIR: &str = "nodes";
pub const APPS_DIR: &str = "apps";

/// Intent and ownership documents rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Path helpers: pure, no I/O
    // -----------------------------------------------------------------------

    pub fn nodes_dir(&self) -> PathBuf {
        self.root.join(NODES_DIR)
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    /// `<root>/nodes/<host>.yaml`
    pub fn node_path(&self, host: &str) -> PathBuf {
        self.nodes_dir().join(format!("{host}.yaml"))
    }

    /// `<root>/apps/<app>.yaml`
    pub fn owners_path(&self, app: &AppName) -> PathBuf {
        self.apps_dir().join(format!("{}.yaml", app.0))
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Load the intent for `host`.
    ///
    /// Returns [`StoreError::NodeNotFound`] when the host has no document.
    /// An absent document is never read as "no apps", which would tear down
    /// every grant on the host.
    pub fn load_node(&self, host: &str) -> Result<IntentNode, StoreError> {
        let path = self.node_path(host);
        if !path.exists() {
            return Err(StoreError::NodeNotFound {
                host: host.to_string(),
                path,
            });
        }
        read_yaml(&path)
    }

    /// Load the ownership record for `app`.
    pub fn load_owners(&self, app: &AppName) -> Result<Ownership, StoreError> {
        app.validate()?;
        let path = self.owners_path(app);
        if !path.exists() {
            return Err(StoreError::OwnersNotFound {
                app: app.0.clone(),
                path,
            });
        }
        read_yaml(&path)
    }

    // -----------------------------------------------------------------------
    // Save (atomic)
    // -----------------------------------------------------------------------

    pub fn save_node(&self, host: &str, node: &IntentNode) -> Result<(), StoreError> {
        write_yaml(&self.node_path(host), node)
    }

    pub fn save_owners(&self, app: &AppName, owners: &Ownership) -> Result<(), StoreError> {
        app.validate()?;
        write_yaml(&self.owners_path(app), owners)
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let yaml = serde_yaml::to_string(value)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
