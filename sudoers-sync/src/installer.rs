//! Validate-then-rename installer.
//!
//! ## `install` protocol
//!
//! 1. Write the candidate to a fresh hidden temp file in the scratch
//!    directory, apply the mode, close it.
//! 2. Run the validator against the temp path. Rejection stops here.
//! 3. Byte-compare against the current target. Identical → `Unchanged`,
//!    the target is not written and keeps its mtime and inode.
//! 4. Rename the temp file onto the target (atomic on POSIX).
//!
//! The temp file is owned by a [`TempPath`], so every early return removes
//! it. Only the final rename consumes it.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

use crate::error::{io_err, SyncError};
use crate::validator::Validator;

/// Name prefix of staged candidates. It never matches a managed prefix and
/// contains a `.`, so sudo skips any leftover after a crash.
pub const TMP_PREFIX: &str = ".pp-sudoers.";

// ---------------------------------------------------------------------------
// Install result
// ---------------------------------------------------------------------------

/// Outcome of an individual install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    /// The target was created or replaced.
    Installed { path: PathBuf },
    /// The target already held exactly this content.
    Unchanged { path: PathBuf },
}

impl InstallResult {
    pub fn path(&self) -> &Path {
        match self {
            InstallResult::Installed { path } | InstallResult::Unchanged { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Installer
// ---------------------------------------------------------------------------

/// Installs candidate content behind a [`Validator`].
pub struct Installer<'a> {
    validator: &'a dyn Validator,
    scratch_dir: PathBuf,
    mode: u32,
}

impl<'a> Installer<'a> {
    pub fn new(validator: &'a dyn Validator, scratch_dir: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            validator,
            scratch_dir: scratch_dir.into(),
            mode,
        }
    }

    /// Validate `content` and atomically place it at `target` if it differs.
    pub fn install(&self, target: &Path, content: &[u8]) -> Result<InstallResult, SyncError> {
        let candidate = self.stage(content)?;

        if let Err(failure) = self.validator.validate(&candidate) {
            return Err(SyncError::Validation {
                path: target.to_path_buf(),
                failure,
            });
        }

        if same_content(&candidate, target)? {
            tracing::debug!("unchanged: {}", target.display());
            return Ok(InstallResult::Unchanged {
                path: target.to_path_buf(),
            });
        }

        candidate
            .persist(target)
            .map_err(|e| io_err(target, e.error))?;

        tracing::debug!("installed: {}", target.display());
        Ok(InstallResult::Installed {
            path: target.to_path_buf(),
        })
    }

    /// Write `content` to a closed temp file carrying the final mode.
    fn stage(&self, content: &[u8]) -> Result<TempPath, SyncError> {
        let mut tmp = Builder::new()
            .prefix(TMP_PREFIX)
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| io_err(&self.scratch_dir, e))?;
        tmp.write_all(content).map_err(|e| io_err(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| io_err(tmp.path(), e))?;
        set_mode(tmp.as_file(), self.mode).map_err(|e| io_err(tmp.path(), e))?;
        Ok(tmp.into_temp_path())
    }
}

/// Byte equality of two files. A missing `target` is never equal.
fn same_content(candidate: &Path, target: &Path) -> Result<bool, SyncError> {
    let current = match std::fs::read(target) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(io_err(target, err)),
    };
    let staged = std::fs::read(candidate).map_err(|e| io_err(candidate, e))?;
    Ok(current == staged)
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationFailure;
    use std::fs;
    use std::time::{Duration, SystemTime};

    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    struct AcceptAll;

    impl Validator for AcceptAll {
        fn validate(&self, _path: &Path) -> Result<(), ValidationFailure> {
            Ok(())
        }
    }

    struct RejectAll;

    impl Validator for RejectAll {
        fn validate(&self, _path: &Path) -> Result<(), ValidationFailure> {
            Err(ValidationFailure::new("exit status: 1", "syntax error"))
        }
    }

    /// Asserts the candidate exists, is complete, and sits in scratch.
    struct Inspecting {
        expected: &'static str,
    }

    impl Validator for Inspecting {
        fn validate(&self, path: &Path) -> Result<(), ValidationFailure> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(TMP_PREFIX), "unexpected temp name {name}");
            assert_eq!(fs::read_to_string(path).unwrap(), self.expected);
            Ok(())
        }
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(TMP_PREFIX))
            .collect()
    }

    #[test]
    fn first_install_returns_installed() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        let installer = Installer::new(&AcceptAll, tmp.path(), 0o440);

        let result = installer.install(&target, b"xavier ALL = (testapp) ALL").unwrap();
        assert!(matches!(result, InstallResult::Installed { .. }));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "xavier ALL = (testapp) ALL"
        );
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn installed_file_carries_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        Installer::new(&AcceptAll, tmp.path(), 0o440)
            .install(&target, b"content")
            .unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o440);
    }

    #[test]
    fn validator_sees_complete_candidate() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        let validator = Inspecting {
            expected: "don ALL = (testapp) ALL",
        };
        Installer::new(&validator, tmp.path(), 0o440)
            .install(&target, b"don ALL = (testapp) ALL")
            .unwrap();
    }

    #[test]
    fn rejected_content_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        let err = Installer::new(&RejectAll, tmp.path(), 0o440)
            .install(&target, b"$%$%$((%$ ALL = (testapp) ALL")
            .expect_err("rejected");
        match err {
            SyncError::Validation { path, failure } => {
                assert_eq!(path, target);
                assert_eq!(failure.output, "syntax error");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(!target.exists());
        assert!(leftovers(tmp.path()).is_empty(), "temp file must be removed");
    }

    #[test]
    fn rejected_content_leaves_existing_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        fs::write(&target, "xavier ALL = (testapp) ALL").unwrap();

        Installer::new(&RejectAll, tmp.path(), 0o440)
            .install(&target, b"broken")
            .expect_err("rejected");
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "xavier ALL = (testapp) ALL"
        );
    }

    #[test]
    fn identical_content_is_unchanged_and_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        fs::write(&target, "xavier ALL = (testapp) ALL").unwrap();
        let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
        set_file_mtime(&target, old).unwrap();
        let before = fs::metadata(&target).unwrap().modified().unwrap();

        let result = Installer::new(&AcceptAll, tmp.path(), 0o440)
            .install(&target, b"xavier ALL = (testapp) ALL")
            .unwrap();

        assert!(matches!(result, InstallResult::Unchanged { .. }));
        let after = fs::metadata(&target).unwrap().modified().unwrap();
        assert_eq!(after, before, "mtime changed; file was rewritten");
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    fn changed_content_replaces_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        fs::write(&target, "don ALL = (testapp) ALL").unwrap();

        let result = Installer::new(&AcceptAll, tmp.path(), 0o440)
            .install(&target, b"xavier ALL = (testapp) ALL")
            .unwrap();

        assert!(matches!(result, InstallResult::Installed { .. }));
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "xavier ALL = (testapp) ALL"
        );
    }

    #[test]
    fn separate_scratch_dir_is_used() {
        let managed = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let target = managed.path().join("pp-testapp");

        Installer::new(&AcceptAll, scratch.path(), 0o440)
            .install(&target, b"content")
            .unwrap();

        assert!(target.exists());
        assert!(leftovers(scratch.path()).is_empty());
        assert!(leftovers(managed.path()).is_empty());
    }

    #[test]
    fn missing_scratch_dir_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("pp-testapp");
        let err = Installer::new(&AcceptAll, tmp.path().join("absent"), 0o440)
            .install(&target, b"content")
            .expect_err("no scratch dir");
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!target.exists());
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        let target = readonly_dir.join("pp-testapp");
        fs::write(&target, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root ignores directory permissions; nothing to observe.
        let probe = readonly_dir.join(".probe");
        let writable = fs::write(&probe, "x").is_ok();
        let _ = fs::remove_file(&probe);

        let scratch = TempDir::new().unwrap();
        let result = Installer::new(&AcceptAll, scratch.path(), 0o440).install(&target, b"new content");

        if !writable {
            assert!(matches!(result, Err(SyncError::Io { .. })));
            assert_eq!(fs::read_to_string(&target).unwrap(), "original");
        }
        assert!(leftovers(scratch.path()).is_empty(), "temp file should be cleaned up");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();
    }
}
