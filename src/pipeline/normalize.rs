//! Raster normalisation: one resized/padded/re-encoded image per page per
//! profile, ready for recognition and embedding.
//!
//! The two policies mirror the two digitisation situations this tool is
//! used in. Heterogeneous scans (mixed paper stocks, crooked crops) get
//! *fit-to-page*: every page lands on the same virtual sheet at the
//! profile's DPI, padded white and centered, so the final document turns
//! pages without the viewport jumping. Already-uniform documents that are
//! merely too large get *quality reduction*: a plain re-encode that keeps
//! the native geometry.

use crate::config::{NormalizePolicy, Profile, RunConfig};
use crate::error::ShrinkError;
use crate::pipeline::split::Page;
use crate::toolkit::{NormalizeOp, PageToolkit};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolve the run's policy and the profile into a concrete operation.
pub fn plan_for(profile: &Profile, config: &RunConfig) -> NormalizeOp {
    match config.policy {
        NormalizePolicy::FitToPage => {
            let (width, height) = profile.pixel_dimensions(config.paper_size_in);
            NormalizeOp::FitToPage {
                width,
                height,
                dpi: profile.dpi,
            }
        }
        NormalizePolicy::QualityReduction { quality } => NormalizeOp::Reencode {
            quality,
            dpi: profile.dpi,
        },
    }
}

/// Normalise one page's raster for one profile.
///
/// Writes `{index}_{suffix}.jpg` into the workspace and returns its path.
/// Failure is failure — a silently skipped page would surface later as a
/// page-count violation anyway, so the raw error with its page index is
/// worth more.
pub async fn normalize_page(
    toolkit: &Arc<dyn PageToolkit>,
    page: &Page,
    profile: &Profile,
    config: &RunConfig,
    workspace: &Path,
) -> Result<PathBuf, ShrinkError> {
    let op = plan_for(profile, config);
    let dest = workspace.join(format!("{}.jpg", page.artifact_stem(&profile.suffix)));

    debug!(
        "Normalizing page {} for profile '{}' ({:?})",
        page.index, profile.suffix, op
    );

    toolkit
        .normalize(&page.raster, &dest, &op)
        .await
        .map_err(|e| e.for_page(page.index))?;

    Ok(dest)
}
