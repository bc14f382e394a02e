use std::path::{Path, PathBuf};
use std::time::Duration;

use sudoers_core::FileStore;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Set to `json` for one JSON object per log line.
pub const LOG_FORMAT_ENV: &str = "PP_SUDOERS_LOG_FORMAT";

/// Store files whose change can alter this host's desired state.
#[derive(Debug, Clone)]
pub struct WatchedPaths {
    node: PathBuf,
    apps_dir: PathBuf,
}

impl WatchedPaths {
    pub fn new(store: &FileStore, host: &str) -> Self {
        Self {
            node: store.node_path(host),
            apps_dir: store.apps_dir(),
        }
    }

    /// The host's node document, or any ownership document.
    pub fn is_relevant(&self, path: &Path) -> bool {
        if path == self.node {
            return true;
        }
        path.parent() == Some(self.apps_dir.as_path()) && is_yaml(path)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false)
}
