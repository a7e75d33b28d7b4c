//! The pipeline orchestrator: the top-level `run` entry point.
//!
//! ## Shape of a run
//!
//! A run is one pass over one source document:
//!
//! 1. classify + validate the source, refuse output paths that collide
//!    with it, and acquire the scoped workspace;
//! 2. split the source into ordered pages (fatal on failure — there is no
//!    salvaging a partial split);
//! 3. for each requested profile, in order: normalise and recognise every
//!    page under a bounded worker pool, verify the page-count invariant,
//!    concatenate in page order, and atomically publish the document;
//! 4. release the workspace and report a [`RunOutput`] carrying one
//!    [`ProfileResult`] per profile.
//!
//! Profiles are deliberately independent: a tool crash while building the
//! low-resolution document must not cost the archival document that was
//! already minutes of OCR in the making. The aggregate status still
//! reports failure when any profile aborted — use
//! [`RunOutput::into_result`] for all-or-nothing semantics.

use crate::config::{Profile, RunConfig};
use crate::error::{ProfileError, ShrinkError};
use crate::output::{ProfileResult, RunOutput, RunStats};
use crate::pipeline::recognize::TextLayer;
use crate::pipeline::split::Page;
use crate::pipeline::{assemble, normalize, recognize, source, split, workspace::Workspace};
use crate::toolkit::{PageToolkit, SystemToolkit};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-page outcome inside one profile's worker pool.
enum PageOutcome {
    Done(TextLayer),
    Failed(ShrinkError),
    /// Not started: a sibling page had already failed.
    Skipped,
}

/// Process a source document into one searchable PDF per profile.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `source_str`  — path to a PDF file or a directory of page images
/// * `output_base` — base path for outputs; each profile writes
///   `{output_base}_{suffix}.pdf`
/// * `config`      — run configuration
///
/// # Returns
/// `Ok(RunOutput)` whenever the run got as far as per-profile processing,
/// even if some (or all) profiles aborted — check
/// [`ProfileResult::error`], or call [`RunOutput::into_result`].
///
/// # Errors
/// Returns `Err(ShrinkError)` only for failures that prevent any output:
/// missing/invalid source, no workspace, missing tools, a failed split.
pub async fn run(
    source_str: impl AsRef<str>,
    output_base: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<RunOutput, ShrinkError> {
    let total_start = Instant::now();
    let source_str = source_str.as_ref();
    let output_base = output_base.as_ref();
    info!("Starting run: {} -> {}_*.pdf", source_str, output_base.display());

    // ── Step 1: Resolve source and output paths ──────────────────────────
    let source = source::resolve_source(source_str)?;

    let mut targets: Vec<(Profile, PathBuf)> = Vec::with_capacity(config.profiles.len());
    for profile in &config.profiles {
        let path = output_path_for(output_base, &profile.suffix);
        if collides(&path, source.path()) {
            return Err(ShrinkError::OutputCollidesWithSource { path });
        }
        targets.push((profile.clone(), path));
    }

    // ── Step 2: Resolve the toolkit ──────────────────────────────────────
    let toolkit: Arc<dyn PageToolkit> = match &config.toolkit {
        Some(t) => Arc::clone(t),
        None => Arc::new(SystemToolkit::discover().await?),
    };

    // ── Step 3: Acquire the workspace ────────────────────────────────────
    // Dropped (and removed) on every exit path below, including errors.
    let ws = Workspace::acquire(config.preferred_tmp_root.as_deref())?;

    // ── Step 4: Split into ordered pages ─────────────────────────────────
    let split_start = Instant::now();
    let pages = split::split_pages(&toolkit, &source, ws.path(), config.max_pages).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(pages.len(), targets.len());
    }

    // ── Step 5: Per-profile pipelines ────────────────────────────────────
    let mut results: Vec<ProfileResult> = Vec::with_capacity(targets.len());
    for (profile, final_path) in &targets {
        let result =
            process_profile(&toolkit, &pages, profile, final_path, config, ws.path()).await;
        if let Some(ref cb) = config.progress_callback {
            cb.on_profile_complete(&profile.suffix, result.succeeded());
        }
        results.push(result);
    }

    // ── Step 6: Aggregate ────────────────────────────────────────────────
    let stats = RunStats {
        source_pages: pages.len(),
        profiles_attempted: results.len(),
        profiles_succeeded: results.iter().filter(|r| r.succeeded()).count(),
        recognized_pages: results.iter().map(|r| r.recognized_pages).sum(),
        reused_pages: results.iter().map(|r| r.reused_pages).sum(),
        split_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} profiles, {} pages, {}ms total",
        stats.profiles_succeeded, stats.profiles_attempted, stats.source_pages, stats.total_duration_ms
    );

    if let Err(e) = ws.close() {
        warn!("Workspace cleanup failed: {}", e);
    }

    Ok(RunOutput {
        profiles: results,
        stats,
    })
}

/// Run one profile's Normalize → Recognize → Assemble pipeline.
///
/// Never returns an error: failures are filed in the returned
/// [`ProfileResult`] so sibling profiles keep running.
async fn process_profile(
    toolkit: &Arc<dyn PageToolkit>,
    pages: &[Page],
    profile: &Profile,
    final_path: &Path,
    config: &RunConfig,
    workspace: &Path,
) -> ProfileResult {
    let start = Instant::now();
    let total = pages.len();
    info!("Profile '{}': processing {} pages", profile.suffix, total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_profile_start(&profile.suffix, total);
    }

    // One page failing means the document cannot be completed; stop
    // starting new pages but let in-flight siblings finish.
    let abort = Arc::new(AtomicBool::new(false));

    let outcomes: Vec<PageOutcome> = stream::iter(pages.iter().map(|page| {
        let toolkit = Arc::clone(toolkit);
        let abort = Arc::clone(&abort);
        let config = config.clone();
        let profile = profile.clone();
        let workspace = workspace.to_path_buf();
        async move {
            if abort.load(Ordering::SeqCst) {
                return PageOutcome::Skipped;
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(&profile.suffix, page.index, total);
            }

            let result = async {
                let raster =
                    normalize::normalize_page(&toolkit, page, &profile, &config, &workspace)
                        .await?;
                recognize::recognize_page(&toolkit, page, &raster, &profile, &config, &workspace)
                    .await
            }
            .await;

            match result {
                Ok(layer) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_complete(&profile.suffix, page.index, total, layer.reused);
                    }
                    PageOutcome::Done(layer)
                }
                Err(e) => {
                    abort.store(true, Ordering::SeqCst);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_error(&profile.suffix, page.index, total, &e.to_string());
                    }
                    PageOutcome::Failed(e)
                }
            }
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    let mut layers: Vec<TextLayer> = Vec::with_capacity(total);
    let mut first_error: Option<ShrinkError> = None;
    let mut skipped = 0usize;
    for outcome in outcomes {
        match outcome {
            PageOutcome::Done(layer) => layers.push(layer),
            PageOutcome::Failed(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            PageOutcome::Skipped => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(
            "Profile '{}': {} pages never started after the first failure",
            profile.suffix, skipped
        );
    }

    let recognized = layers.iter().filter(|l| !l.reused).count();
    let reused = layers.iter().filter(|l| l.reused).count();

    if let Some(e) = first_error {
        warn!("Profile '{}' aborted: {}", profile.suffix, e);
        return aborted_result(profile, recognized, reused, start, e);
    }

    // ── Invariant: every page has a text layer before assembly ───────────
    if let Err(e) = verify_page_count(profile, pages, &layers) {
        warn!("Profile '{}' aborted: {}", profile.suffix, e);
        return aborted_result(profile, recognized, reused, start, e);
    }

    // Workers complete out of order; the document must not.
    layers.sort_by_key(|l| l.index);
    let parts: Vec<PathBuf> = layers.iter().map(|l| l.artifact.clone()).collect();

    if let Err(e) = assemble::assemble_document(toolkit, &parts, workspace, final_path).await {
        warn!("Profile '{}' aborted: {}", profile.suffix, e);
        return aborted_result(profile, recognized, reused, start, e);
    }

    ProfileResult {
        profile: profile.clone(),
        output_path: Some(final_path.to_path_buf()),
        pages: layers.len(),
        recognized_pages: recognized,
        reused_pages: reused,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    }
}

/// The count check guarding reassembly: every source page must have a
/// text-layer artifact actually present on disk.
///
/// Checking the file system rather than the in-memory list catches
/// engines that exit zero without writing their declared output.
fn verify_page_count(
    profile: &Profile,
    pages: &[Page],
    layers: &[TextLayer],
) -> Result<(), ShrinkError> {
    let present = layers.iter().filter(|l| l.artifact.is_file()).count();
    if present != pages.len() {
        return Err(ShrinkError::PageCountMismatch {
            suffix: profile.suffix.clone(),
            pages: pages.len(),
            text_layers: present,
        });
    }
    Ok(())
}

fn aborted_result(
    profile: &Profile,
    recognized: usize,
    reused: usize,
    start: Instant,
    error: ShrinkError,
) -> ProfileResult {
    ProfileResult {
        profile: profile.clone(),
        output_path: None,
        pages: 0,
        recognized_pages: recognized,
        reused_pages: reused,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(ProfileError::from_stage(&profile.suffix, error)),
    }
}

/// `{output_base}_{suffix}.pdf`, next to wherever `output_base` points.
pub fn output_path_for(output_base: &Path, suffix: &str) -> PathBuf {
    match output_base.file_name().and_then(|n| n.to_str()) {
        Some(name) => output_base.with_file_name(format!("{name}_{suffix}.pdf")),
        None => output_base.join(format!("{suffix}.pdf")),
    }
}

/// An output path collides when it names the source document itself.
fn collides(output: &Path, source: &Path) -> bool {
    if output == source {
        return true;
    }
    match (std::fs::canonicalize(output), std::fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_combines_base_and_suffix() {
        assert_eq!(
            output_path_for(Path::new("out/book"), "hi"),
            Path::new("out/book_hi.pdf")
        );
        assert_eq!(
            output_path_for(Path::new("book"), "lo"),
            Path::new("book_lo.pdf")
        );
    }

    #[test]
    fn collision_on_identical_paths() {
        assert!(collides(Path::new("a/doc.pdf"), Path::new("a/doc.pdf")));
        assert!(!collides(Path::new("a/doc_hi.pdf"), Path::new("a/doc.pdf")));
    }

    #[test]
    fn collision_through_canonicalization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc_hi.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let dotted = dir.path().join(".").join("doc_hi.pdf");
        assert!(collides(&dotted, &path));
    }

    #[test]
    fn verify_page_count_flags_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let profile = Profile::new("hi", 300);
        let pages: Vec<Page> = (1..=2)
            .map(|i| Page {
                index: i,
                raster: dir.path().join(format!("{i}.jpg")),
            })
            .collect();

        let present = dir.path().join("0001_hi.pdf");
        std::fs::write(&present, b"%PDF").unwrap();
        let layers = vec![
            TextLayer {
                index: 1,
                artifact: present,
                reused: false,
            },
            TextLayer {
                index: 2,
                artifact: dir.path().join("0002_hi.pdf"), // never written
                reused: false,
            },
        ];

        let err = verify_page_count(&profile, &pages, &layers).unwrap_err();
        assert!(matches!(
            err,
            ShrinkError::PageCountMismatch {
                pages: 2,
                text_layers: 1,
                ..
            }
        ));
    }
}
