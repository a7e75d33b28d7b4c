//! Reassembly: ordered concatenation and atomic publication.
//!
//! The final document is built entirely inside the workspace and only
//! then moved to its user-visible path. Nothing at the output location is
//! ever half-written: a reader either sees the previous state or the
//! complete new document. `rename` gives that atomicity on the same
//! filesystem; when the workspace lives on a different volume than the
//! output (the usual case with a dedicated scratch mount), the fallback
//! copies to a sibling temp file first and renames that, which is atomic
//! again.

use crate::error::ShrinkError;
use crate::toolkit::PageToolkit;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Concatenate `parts` (already in page order) and publish the result at
/// `final_path`.
pub async fn assemble_document(
    toolkit: &Arc<dyn PageToolkit>,
    parts: &[PathBuf],
    workspace: &Path,
    final_path: &Path,
) -> Result<(), ShrinkError> {
    let staging = workspace.join(format!(
        "assembled_{}",
        final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("out.pdf")
    ));

    debug!(
        "Concatenating {} pages into {}",
        parts.len(),
        staging.display()
    );
    toolkit.concatenate(parts, &staging).await?;

    publish(&staging, final_path).await?;
    info!("Wrote {}", final_path.display());
    Ok(())
}

/// Move `staging` to `final_path` atomically.
async fn publish(staging: &Path, final_path: &Path) -> Result<(), ShrinkError> {
    if let Some(parent) = final_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ShrinkError::OutputWriteFailed {
                    path: final_path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    match tokio::fs::rename(staging, final_path).await {
        Ok(()) => Ok(()),
        Err(_) => {
            // Cross-device: stage a sibling of the destination, then rename
            // within the destination's filesystem.
            let sibling = final_path.with_extension("pdf.part");
            tokio::fs::copy(staging, &sibling).await.map_err(|e| {
                ShrinkError::OutputWriteFailed {
                    path: final_path.to_path_buf(),
                    source: e,
                }
            })?;
            tokio::fs::rename(&sibling, final_path).await.map_err(|e| {
                ShrinkError::OutputWriteFailed {
                    path: final_path.to_path_buf(),
                    source: e,
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("assembled_out_hi.pdf");
        let final_path = dir.path().join("out_hi.pdf");
        tokio::fs::write(&staging, b"%PDF content").await.unwrap();

        publish(&staging, &final_path).await.unwrap();

        assert!(!staging.exists());
        assert_eq!(tokio::fs::read(&final_path).await.unwrap(), b"%PDF content");
    }

    #[tokio::test]
    async fn publish_creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("assembled.pdf");
        let final_path = dir.path().join("deep/nested/out_lo.pdf");
        tokio::fs::write(&staging, b"%PDF x").await.unwrap();

        publish(&staging, &final_path).await.unwrap();
        assert!(final_path.exists());
    }
}
