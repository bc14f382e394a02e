//! Runtime configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a working production configuration:
//!
//! ```yaml
//! path: /etc/sudoers.d
//! prefix: pp-
//! mode: 0o440          # or 288
//! store: /var/lib/pp-sudoers
//! scratch_dir: ~       # defaults to `path`
//! validator:
//!   program: visudo
//!   args: [-cf]
//!   timeout_secs: 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PATH: &str = "/etc/sudoers.d";
pub const DEFAULT_PREFIX: &str = "pp-";
pub const DEFAULT_MODE: u32 = 0o440;
pub const DEFAULT_STORE: &str = "/var/lib/pp-sudoers";

/// Configuration for a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SudoersConfig {
    /// Managed directory (`sudoers.d`).
    pub path: PathBuf,
    /// Namespace prefix carried by every managed file.
    pub prefix: String,
    /// Permission bits applied to installed files.
    pub mode: u32,
    /// Where candidate files are staged before validation. `None` stages
    /// next to the target so the final rename stays on one filesystem.
    pub scratch_dir: Option<PathBuf>,
    /// Root of the YAML intent and ownership store.
    pub store: PathBuf,
    pub validator: ValidatorConfig,
}

impl Default for SudoersConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            prefix: DEFAULT_PREFIX.to_string(),
            mode: DEFAULT_MODE,
            scratch_dir: None,
            store: PathBuf::from(DEFAULT_STORE),
            validator: ValidatorConfig::default(),
        }
    }
}

impl SudoersConfig {
    /// Configuration managing `path` with every other field defaulted.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Directory used to stage candidate files.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch_dir.as_deref().unwrap_or(&self.path)
    }

    /// Full path of the managed file for `file_name`.
    pub fn managed_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.validator.program.is_empty() {
            return Err(ConfigError::EmptyValidator);
        }
        Ok(())
    }
}

/// External syntax checker invocation: `<program> <args...> <candidate>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            program: "visudo".to_string(),
            args: vec!["-cf".to_string()],
            timeout_secs: 30,
        }
    }
}

impl ValidatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load and validate a YAML config file.
pub fn load_at(path: &Path) -> Result<SudoersConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SudoersConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
