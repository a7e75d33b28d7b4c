//! Text recognition and the auxiliary reuse cache.
//!
//! Recognition turns a normalized raster into the page's text-layer
//! artifact: a single-page PDF whose raster is the image and whose text is
//! invisible but searchable. It is by far the slowest stage — minutes per
//! hundred pages — which is why a previously computed artifact in the
//! auxiliary directory is reused whenever one is valid and overwrite is
//! not forced.
//!
//! ## Cache semantics
//!
//! The cache is keyed by `(page index, profile suffix)` — exactly the
//! artifact file name — and has no invalidation beyond the overwrite flag.
//! Reuse never changes output content: a hit is byte-copied into the
//! workspace and flows through reassembly like a fresh artifact. Fresh
//! artifacts are copied back out, so a re-run after a crash resumes where
//! the last one stopped. Cache I/O failures only cost the optimisation,
//! never the run.

use crate::config::{Profile, RunConfig};
use crate::error::ShrinkError;
use crate::pipeline::split::Page;
use crate::toolkit::{PageToolkit, RecognizeOpts};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A page's finished text-layer artifact.
#[derive(Debug, Clone)]
pub struct TextLayer {
    /// The page's 1-based sequence index.
    pub index: usize,
    /// Single-page PDF with raster + invisible text.
    pub artifact: PathBuf,
    /// True when the artifact came from the auxiliary cache.
    pub reused: bool,
}

/// Produce the text-layer artifact for one normalized page raster.
///
/// Order of preference:
/// 1. a valid cached artifact (unless `overwrite` is set),
/// 2. fresh recognition,
/// 3. in lenient mode only: an image-only page when recognition fails.
pub async fn recognize_page(
    toolkit: &Arc<dyn PageToolkit>,
    page: &Page,
    raster: &Path,
    profile: &Profile,
    config: &RunConfig,
    workspace: &Path,
) -> Result<TextLayer, ShrinkError> {
    let name = format!("{}.pdf", page.artifact_stem(&profile.suffix));
    let dest = workspace.join(&name);

    if !config.overwrite {
        if let Some(cached) = config.aux_dir.as_ref().map(|d| d.join(&name)) {
            if is_valid_artifact(&cached) {
                debug!(
                    "Page {} '{}': reusing cached text layer {}",
                    page.index,
                    profile.suffix,
                    cached.display()
                );
                tokio::fs::copy(&cached, &dest).await.map_err(|e| {
                    ShrinkError::Internal(format!(
                        "copying cached artifact '{}': {e}",
                        cached.display()
                    ))
                })?;
                return Ok(TextLayer {
                    index: page.index,
                    artifact: dest,
                    reused: true,
                });
            }
        }
    }

    let opts = RecognizeOpts {
        quiet: !config.verbose_tools,
    };
    match toolkit.recognize(raster, &dest, &opts).await {
        Ok(()) => {
            // Only genuine recognitions are cached; an image-only fallback
            // page must not shadow a future successful OCR of the same page.
            write_back(config, &dest, &name).await;
        }
        Err(e) if !config.strict_recognition => {
            // Lenient mode: keep the page, lose its text.
            let e = e.for_page(page.index);
            warn!(
                "Page {} '{}': recognition failed ({}); carrying image-only page",
                page.index, profile.suffix, e
            );
            toolkit
                .wrap_image(raster, &dest, profile.dpi)
                .await
                .map_err(|e| e.for_page(page.index))?;
        }
        Err(e) => return Err(e.for_page(page.index)),
    }

    Ok(TextLayer {
        index: page.index,
        artifact: dest,
        reused: false,
    })
}

/// Copy a fresh artifact into the auxiliary directory for future runs.
///
/// Best-effort: the cache is an optimisation, so failures are logged and
/// swallowed.
async fn write_back(config: &RunConfig, artifact: &Path, name: &str) {
    let Some(aux_dir) = config.aux_dir.as_deref() else {
        return;
    };
    if let Err(e) = tokio::fs::create_dir_all(aux_dir).await {
        warn!("Cannot create aux dir '{}': {}", aux_dir.display(), e);
        return;
    }
    let target = aux_dir.join(name);
    if let Err(e) = tokio::fs::copy(artifact, &target).await {
        warn!("Cannot cache text layer to '{}': {}", target.display(), e);
    } else {
        debug!("Cached text layer: {}", target.display());
    }
}

/// A cached artifact is usable when it exists, is non-empty, and starts
/// with the PDF magic. Anything else (truncated copy from a killed run,
/// stray file) is ignored and recognition runs normally.
pub fn is_valid_artifact(path: &Path) -> bool {
    use std::io::Read;
    let Ok(mut f) = std::fs::File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    matches!(f.read_exact(&mut magic), Ok(())) && &magic == b"%PDF"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_artifact_needs_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("0001_hi.pdf");
        std::fs::write(&good, b"%PDF-1.4 pretend").unwrap();
        assert!(is_valid_artifact(&good));

        let empty = dir.path().join("0002_hi.pdf");
        std::fs::write(&empty, b"").unwrap();
        assert!(!is_valid_artifact(&empty));

        let junk = dir.path().join("0003_hi.pdf");
        std::fs::write(&junk, b"hello").unwrap();
        assert!(!is_valid_artifact(&junk));

        assert!(!is_valid_artifact(&dir.path().join("absent.pdf")));
    }
}
