//! External capabilities: page extraction, raster normalisation, text
//! recognition, and document concatenation.
//!
//! ## Why a trait?
//!
//! Every heavy operation in the pipeline is delegated to an external
//! engine whose only observable contract is "exit zero and leave the
//! declared output file behind". Modelling the four capabilities as one
//! object-safe trait keeps the orchestrator ignorant of *how* a page gets
//! resized or recognised, so an engine can be swapped for an in-process
//! library (or a test fake) without touching any pipeline code.
//!
//! The default implementation, [`SystemToolkit`], shells out to the
//! standard digitisation chain: `pdfimages` (poppler), ImageMagick
//! (`magick`, or `convert` on version 6 installs), `tesseract`, and
//! `pdftk`. Subprocesses run under tokio with captured stderr so a failed
//! invocation can be reproduced by hand from the log line alone.

use crate::error::ShrinkError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// How a page raster is transformed, fully resolved from the run's policy
/// and the profile being produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOp {
    /// Resize to fit `width` × `height`, pad with a white background to
    /// exactly those dimensions (center gravity), tag `dpi` metadata.
    FitToPage { width: u32, height: u32, dpi: u32 },
    /// Re-encode at the given JPEG quality, native aspect ratio preserved,
    /// tag `dpi` metadata.
    Reencode { quality: u8, dpi: u32 },
}

/// Options for a recognition call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizeOpts {
    /// Suppress the engine's own diagnostics.
    pub quiet: bool,
}

/// The four external capabilities the pipeline is built on, plus the
/// image-only fallback used by lenient recognition.
///
/// Implementations must be cheap to share (`Arc`) and callable from
/// concurrent page workers. Every method either succeeds having written
/// its declared output, or fails; partial output is the caller's problem
/// to detect (the pre-assembly invariant check does exactly that).
#[async_trait]
pub trait PageToolkit: Send + Sync {
    /// Extract one raster per page of `source` into `out_dir`.
    ///
    /// Returns the extracted files in page order.
    async fn extract_pages(
        &self,
        source: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ShrinkError>;

    /// Transform `raster` according to `op`, writing the result to `dest`.
    async fn normalize(
        &self,
        raster: &Path,
        dest: &Path,
        op: &NormalizeOp,
    ) -> Result<(), ShrinkError>;

    /// Recognise the text on `raster`, writing a single-page PDF with an
    /// invisible text layer to `dest`.
    async fn recognize(
        &self,
        raster: &Path,
        dest: &Path,
        opts: &RecognizeOpts,
    ) -> Result<(), ShrinkError>;

    /// Wrap `raster` into a single-page PDF with no text layer.
    ///
    /// The lenient-recognition fallback: keeps the page present (and the
    /// page-count invariant intact) when the recognition engine fails.
    async fn wrap_image(&self, raster: &Path, dest: &Path, dpi: u32) -> Result<(), ShrinkError>;

    /// Concatenate `parts` in the given order into a single PDF at `dest`.
    async fn concatenate(&self, parts: &[PathBuf], dest: &Path) -> Result<(), ShrinkError>;
}

// ── System implementation ────────────────────────────────────────────────

/// PATH-discovered external tools.
#[derive(Debug, Clone)]
pub struct SystemToolkit {
    /// `magick` on ImageMagick 7+, `convert` on 6.
    magick_bin: &'static str,
}

impl SystemToolkit {
    /// Probe PATH for every required tool.
    ///
    /// Fails with [`ShrinkError::ToolMissing`] (and an install hint) on the
    /// first tool that cannot be spawned, so a run reports its missing
    /// dependency before any work starts rather than three stages in.
    pub async fn discover() -> Result<Self, ShrinkError> {
        let magick_bin = if probe("magick", "-version").await {
            "magick"
        } else if probe("convert", "-version").await {
            "convert"
        } else {
            return Err(ShrinkError::ToolMissing {
                tool: "magick".into(),
                hint: "Install ImageMagick (Debian: apt install imagemagick).".into(),
            });
        };
        debug!("Using ImageMagick binary: {}", magick_bin);

        if !probe("pdfimages", "-v").await {
            return Err(ShrinkError::ToolMissing {
                tool: "pdfimages".into(),
                hint: "Install poppler (Debian: apt install poppler-utils).".into(),
            });
        }
        if !probe("tesseract", "--version").await {
            return Err(ShrinkError::ToolMissing {
                tool: "tesseract".into(),
                hint: "Install tesseract (Debian: apt install tesseract-ocr).".into(),
            });
        }
        if !probe("pdftk", "--version").await {
            return Err(ShrinkError::ToolMissing {
                tool: "pdftk".into(),
                hint: "Install pdftk (Debian: apt install pdftk-java).".into(),
            });
        }

        Ok(Self { magick_bin })
    }
}

#[async_trait]
impl PageToolkit for SystemToolkit {
    async fn extract_pages(
        &self,
        source: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ShrinkError> {
        let mut cmd = Command::new("pdfimages");
        cmd.arg("-j").arg(source).arg(out_dir.join("page"));
        run_tool("pdfimages", cmd).await?;

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(out_dir)
            .await
            .map_err(|e| ShrinkError::Internal(format!("reading extraction dir: {e}")))?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ShrinkError::Internal(format!("reading extraction dir: {e}")))?
        {
            if entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false)
            {
                entries.push(entry.path());
            }
        }
        // pdfimages zero-pads its own output names, so a name sort is a
        // page-order sort; the caller still attaches explicit indices.
        entries.sort();
        Ok(entries)
    }

    async fn normalize(
        &self,
        raster: &Path,
        dest: &Path,
        op: &NormalizeOp,
    ) -> Result<(), ShrinkError> {
        let mut cmd = Command::new(self.magick_bin);
        cmd.arg(raster);
        match *op {
            NormalizeOp::FitToPage { width, height, dpi } => {
                let geometry = format!("{width}x{height}");
                cmd.arg("-resize")
                    .arg(&geometry)
                    .arg("-background")
                    .arg("white")
                    .arg("-gravity")
                    .arg("center")
                    .arg("-extent")
                    .arg(&geometry)
                    .arg("-units")
                    .arg("PixelsPerInch")
                    .arg("-density")
                    .arg(dpi.to_string());
            }
            NormalizeOp::Reencode { quality, dpi } => {
                cmd.arg("-quality")
                    .arg(quality.to_string())
                    .arg("-units")
                    .arg("PixelsPerInch")
                    .arg("-density")
                    .arg(dpi.to_string());
            }
        }
        cmd.arg(dest);
        run_tool(self.magick_bin, cmd).await
    }

    async fn recognize(
        &self,
        raster: &Path,
        dest: &Path,
        opts: &RecognizeOpts,
    ) -> Result<(), ShrinkError> {
        // tesseract takes an output *base* and appends ".pdf" itself.
        let base = dest.with_extension("");
        let mut cmd = Command::new("tesseract");
        cmd.arg(raster)
            .arg(&base)
            .arg("-c")
            .arg("tessedit_do_invert=0");
        if opts.quiet {
            cmd.arg("quiet");
        }
        cmd.arg("pdf");
        run_tool("tesseract", cmd).await
    }

    async fn wrap_image(&self, raster: &Path, dest: &Path, dpi: u32) -> Result<(), ShrinkError> {
        let mut cmd = Command::new(self.magick_bin);
        cmd.arg(raster)
            .arg("-units")
            .arg("PixelsPerInch")
            .arg("-density")
            .arg(dpi.to_string())
            .arg(dest);
        run_tool(self.magick_bin, cmd).await
    }

    async fn concatenate(&self, parts: &[PathBuf], dest: &Path) -> Result<(), ShrinkError> {
        let mut cmd = Command::new("pdftk");
        for part in parts {
            cmd.arg(part);
        }
        cmd.arg("cat").arg("output").arg(dest);
        run_tool("pdftk", cmd).await
    }
}

// ── Subprocess plumbing ──────────────────────────────────────────────────

/// True when `bin` can be spawned at all.
///
/// The exit status of the version flag is deliberately ignored — some of
/// these tools exit non-zero from `-v` — only "command not found" counts
/// as absent.
async fn probe(bin: &str, version_flag: &str) -> bool {
    Command::new(bin)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}

/// Run one external tool to completion.
///
/// Success is exit status zero; anything else becomes
/// [`ShrinkError::ToolFailed`] carrying the tail of the tool's stderr.
/// The full argv is logged at debug level so any failure can be re-run by
/// hand.
async fn run_tool(tool: &str, mut cmd: Command) -> Result<(), ShrinkError> {
    debug!("Running command: {:?}", cmd.as_std());

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ShrinkError::ToolMissing {
                    tool: tool.to_string(),
                    hint: format!("'{tool}' disappeared from PATH mid-run."),
                }
            } else {
                ShrinkError::ToolFailed {
                    tool: tool.to_string(),
                    page: None,
                    detail: format!("failed to spawn: {e}"),
                }
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        warn!("{} exited {}: {}", tool, output.status, stderr);
        return Err(ShrinkError::ToolFailed {
            tool: tool.to_string(),
            page: None,
            detail: format!("{}: {}", output.status, truncate(stderr, 500)),
        });
    }
    Ok(())
}

/// Keep error payloads readable; stderr from a crashing engine can run to
/// kilobytes of stack trace.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\u{2026}", &s[..end])
    }
}

impl ShrinkError {
    /// Attach a page index to a tool failure.
    ///
    /// Toolkit methods don't know which page they are working on; the
    /// per-page pipeline stages do, and stamp it here on the way out.
    pub(crate) fn for_page(self, page: usize) -> Self {
        match self {
            ShrinkError::ToolFailed { tool, detail, .. } => ShrinkError::ToolFailed {
                tool,
                page: Some(page),
                detail,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_string_untouched() {
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn truncate_long_string_has_ellipsis() {
        let t = truncate(&"x".repeat(600), 500);
        assert!(t.ends_with('\u{2026}'));
        assert!(t.len() < 600);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(300); // 2 bytes each
        let t = truncate(&s, 501);
        assert!(t.chars().all(|c| c == 'é' || c == '\u{2026}'));
    }

    #[test]
    fn for_page_stamps_tool_failures_only() {
        let e = ShrinkError::ToolFailed {
            tool: "magick".into(),
            page: None,
            detail: "x".into(),
        }
        .for_page(3);
        assert!(matches!(e, ShrinkError::ToolFailed { page: Some(3), .. }));

        let e = ShrinkError::Internal("x".into()).for_page(3);
        assert!(matches!(e, ShrinkError::Internal(_)));
    }
}
