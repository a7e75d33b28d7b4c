//! The run's scoped temporary workspace.
//!
//! ## Why a dedicated type over a bare `TempDir`?
//!
//! Every stage writes its per-page artifacts here, and the directory must
//! disappear on *every* exit path — success, tool failure, invariant
//! violation, panic. Wrapping `tempfile::TempDir` gives us that for free
//! (removal on drop) while adding the one policy the digitisation setup
//! needs: prefer a configured scratch root (typically a large volume
//! mounted for exactly this purpose) and fall back to the system default
//! when that root is absent or read-only.

use crate::error::ShrinkError;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// A unique temporary directory owned by one pipeline run.
///
/// Removed recursively when dropped; [`Workspace::close`] removes it
/// eagerly and surfaces the I/O result for callers that want to log it.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create the run's workspace.
    ///
    /// Tries `preferred_root` first when given; any failure there (missing
    /// directory, no write permission) silently falls back to the system
    /// temp directory. Only when no location at all is writable does the
    /// run die, with [`ShrinkError::WorkspaceUnavailable`].
    pub fn acquire(preferred_root: Option<&Path>) -> Result<Self, ShrinkError> {
        if let Some(root) = preferred_root {
            match TempDir::with_prefix_in("scanpress-", root) {
                Ok(dir) => {
                    debug!("Workspace: {}", dir.path().display());
                    return Ok(Self { dir });
                }
                Err(e) => {
                    warn!(
                        "Preferred tmp root '{}' unusable ({}); falling back to system temp",
                        root.display(),
                        e
                    );
                }
            }
        }

        let dir = TempDir::with_prefix("scanpress-").map_err(|e| {
            ShrinkError::WorkspaceUnavailable {
                root: std::env::temp_dir(),
                source: e,
            }
        })?;
        debug!("Workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace now, reporting any I/O failure.
    ///
    /// Dropping a `Workspace` also removes it but swallows errors; the
    /// orchestrator calls `close` so a half-removed workspace at least
    /// leaves a log line.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn acquire_and_drop_removes_directory() {
        let path: PathBuf;
        {
            let ws = Workspace::acquire(None).unwrap();
            path = ws.path().to_path_buf();
            assert!(path.is_dir());
            std::fs::write(path.join("scratch.txt"), b"x").unwrap();
        }
        assert!(!path.exists(), "workspace should be removed on drop");
    }

    #[test]
    fn close_reports_success() {
        let ws = Workspace::acquire(None).unwrap();
        let path = ws.path().to_path_buf();
        ws.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn preferred_root_is_used_when_writable() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(Some(root.path())).unwrap();
        assert!(ws.path().starts_with(root.path()));
    }

    #[test]
    fn missing_preferred_root_falls_back() {
        let ws = Workspace::acquire(Some(Path::new("/no/such/scratch/root"))).unwrap();
        assert!(ws.path().is_dir());
    }
}
