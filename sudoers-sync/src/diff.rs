//! Unified diff of what a pass would change, for `pp-sudoers diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use sudoers_core::SudoersConfig;
use sudoers_renderer::Renderer;

use crate::error::{io_err, SyncError};
use crate::pipeline::DesiredPlan;
use crate::plan::expected_names;
use crate::reconcile::list_managed;

/// A single pending file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Render every desired grant and compare it to disk. Stale managed files
/// appear as full deletions. No files are written and nothing is validated.
pub fn diff(
    config: &SudoersConfig,
    renderer: &Renderer,
    desired: &DesiredPlan,
) -> Result<Vec<GrantDiff>, SyncError> {
    let actual = list_managed(&config.path, &config.prefix)?;
    let mut diffs = Vec::new();

    for grant in &desired.grants {
        if grant.app.validate().is_err() {
            continue;
        }
        let name = grant.app.managed_file_name(&config.prefix);
        let path = config.managed_path(&name);
        let rendered = renderer.render_grant(grant)?;
        let existing = read_existing_or_empty(&path)?;
        if existing == rendered {
            continue;
        }
        diffs.push(unified(&name, path, &existing, &rendered));
    }

    let expected = expected_names(config, desired);
    for name in actual.difference(&expected) {
        let path = config.path.join(name);
        let existing = read_existing_or_empty(&path)?;
        diffs.push(unified(&name.to_string_lossy(), path, &existing, ""));
    }

    Ok(diffs)
}

fn unified(name: &str, path: PathBuf, old: &str, new: &str) -> GrantDiff {
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    let unified_diff = TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    GrantDiff { path, unified_diff }
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
