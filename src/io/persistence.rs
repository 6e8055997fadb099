//! Atomic persistence: renders every dirty unit and writes it to disk.
//!
//! Writes are all-or-nothing per batch: each rendered unit lands in a
//! temporary sibling first, and no original file is replaced until every
//! temporary has been written successfully. A failure part-way deletes the
//! temporaries and leaves the tree on disk exactly as it was.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::config::FlyttaConfig;
use crate::core::errors::{FlyttaError, Result};
use crate::syntax::render::Renderer;
use crate::workspace::snapshot::Workspace;

/// Suffix of the temporary sibling written before the rename.
const TMP_SUFFIX: &str = ".flytta-tmp";

/// Writes workspaces to disk.
#[derive(Debug)]
pub struct Persister<'a> {
    config: &'a FlyttaConfig,
    renderer: Renderer,
}

impl<'a> Persister<'a> {
    /// Create a persister with the session configuration.
    pub fn new(config: &'a FlyttaConfig) -> Self {
        Self {
            config,
            renderer: Renderer::new(),
        }
    }

    /// Render every dirty unit under `root` and replace the files atomically.
    /// Clears the workspace's dirty set and returns the paths written, in
    /// unit order.
    pub fn persist(&self, workspace: &mut Workspace, root: &Path) -> Result<Vec<PathBuf>> {
        let dirty: Vec<PathBuf> = workspace.dirty_units().map(Path::to_path_buf).collect();
        if dirty.is_empty() {
            debug!("nothing to persist");
            return Ok(Vec::new());
        }

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(dirty.len());
        for unit_path in &dirty {
            let unit = workspace.unit(unit_path).ok_or_else(|| {
                FlyttaError::internal(format!(
                    "dirty unit '{}' is not in the workspace",
                    unit_path.display()
                ))
            })?;
            let target = root.join(unit_path);
            let tmp = tmp_sibling(&target);

            if let Err(error) = self.stage(unit, &target, &tmp) {
                self.discard(&staged);
                let _ = fs::remove_file(&tmp);
                return Err(error);
            }
            staged.push((tmp, target));
        }

        // Point of no return: every temporary exists, start swapping.
        for (tmp, target) in &staged {
            fs::rename(tmp, target).map_err(|source| {
                FlyttaError::target_unwritable(target.display().to_string(), source)
            })?;
        }

        workspace.clear_dirty();
        info!(files = staged.len(), root = %root.display(), "workspace persisted");
        Ok(dirty.iter().map(|p| root.join(p)).collect())
    }

    fn stage(
        &self,
        unit: &crate::syntax::tree::SourceUnit,
        target: &Path,
        tmp: &Path,
    ) -> Result<()> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if !self.config.persistence.create_missing_dirs {
                    return Err(FlyttaError::validation(format!(
                        "directory '{}' does not exist and create_missing_dirs is off",
                        parent.display()
                    )));
                }
                fs::create_dir_all(parent).map_err(|source| {
                    FlyttaError::target_unwritable(parent.display().to_string(), source)
                })?;
            }
        }

        let text = self.renderer.render_unit(unit);
        fs::write(tmp, text).map_err(|source| {
            FlyttaError::target_unwritable(target.display().to_string(), source)
        })?;
        debug!(path = %target.display(), "unit staged");
        Ok(())
    }

    fn discard(&self, staged: &[(PathBuf, PathBuf)]) {
        for (tmp, target) in staged {
            if fs::remove_file(tmp).is_err() {
                warn!(path = %target.display(), "stale temporary left behind");
            }
        }
    }
}

fn tmp_sibling(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    target.with_file_name(name)
}
