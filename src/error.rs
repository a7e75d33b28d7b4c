//! Error types for the scanpress library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ShrinkError`] — **Fatal**: the run cannot proceed at all (missing
//!   source, no writable workspace, the page splitter failed). Returned as
//!   `Err(ShrinkError)` from the top-level [`crate::run::run`] function.
//!
//! * [`ProfileError`] — **Profile-scoped**: one output profile failed
//!   (a tool crashed on a page, the page-count invariant was violated) but
//!   the other profiles still produced their documents. Stored inside
//!   [`crate::output::ProfileResult`] so callers can inspect partial
//!   success rather than losing every output to one bad resolution.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first profile failure, log and keep the surviving documents, or collect
//! all failures for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scanpress library.
///
/// Profile-level failures use [`ProfileError`] and are stored in
/// [`crate::output::ProfileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ShrinkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source file or directory was not found at the given path.
    #[error("Source not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    SourceUnreadable { path: PathBuf },

    /// The source file exists and was read, but is not a PDF.
    #[error("Source is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A source directory was given but contains no page images.
    #[error("No page images found in directory '{path}'\nExpected .tif/.png/.jpg page scans.")]
    EmptyImageDir { path: PathBuf },

    /// An output document path resolves to the source file itself.
    #[error("Output '{path}' would overwrite the source document.\nChoose a different output base name.")]
    OutputCollidesWithSource { path: PathBuf },

    // ── Resource errors ───────────────────────────────────────────────────
    /// No writable location for the run's temporary workspace.
    #[error("Cannot create a temporary workspace under '{root}': {source}")]
    WorkspaceUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// A required external tool is not installed or not on PATH.
    #[error("Required tool '{tool}' was not found on PATH.\n{hint}")]
    ToolMissing { tool: String, hint: String },

    /// An external tool exited non-zero or could not be spawned.
    ///
    /// `page` is `Some` for per-page invocations so the failing command can
    /// be reproduced by hand; splitting and concatenation report `None`.
    #[error("{tool} failed{}: {detail}", .page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    ToolFailed {
        tool: String,
        page: Option<usize>,
        detail: String,
    },

    // ── Invariant violations ──────────────────────────────────────────────
    /// Splitting the source produced zero pages.
    #[error("Source '{path}' produced no pages")]
    NoPages { path: PathBuf },

    /// Fewer text layers than source pages reached reassembly.
    #[error("Profile '{suffix}': {pages} pages but {text_layers} text layers.\nRefusing to assemble a document with missing pages.")]
    PageCountMismatch {
        suffix: String,
        pages: usize,
        text_layers: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not move or write a final output document.
    #[error("Failed to write output document '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Aggregate ─────────────────────────────────────────────────────────
    /// Some profiles produced documents but at least one aborted.
    ///
    /// Returned by [`crate::output::RunOutput::into_result`] when the caller
    /// wants to treat any profile failure as an error.
    #[error("{failed}/{total} output profiles aborted")]
    PartialFailure { failed: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure scoped to a single output profile.
///
/// Stored in [`crate::output::ProfileResult`] when a profile aborts.
/// The run continues with the remaining profiles; the aggregate status
/// reports failure if any profile carries one of these.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ProfileError {
    /// An external tool failed while processing a page of this profile.
    #[error("profile '{suffix}': {tool} failed on page {page}: {detail}")]
    Tool {
        suffix: String,
        tool: String,
        page: usize,
        detail: String,
    },

    /// The page-count invariant was violated before reassembly.
    #[error("profile '{suffix}': {pages} pages but {text_layers} text layers")]
    PageCountMismatch {
        suffix: String,
        pages: usize,
        text_layers: usize,
    },

    /// Concatenation or the final atomic move failed.
    #[error("profile '{suffix}': assembly failed: {detail}")]
    Assembly { suffix: String, detail: String },
}

impl ProfileError {
    /// Demote a fatal pipeline error into a profile-scoped record.
    ///
    /// The orchestrator runs each profile's stages with the full
    /// [`ShrinkError`] machinery, then files the failure under its profile
    /// so sibling profiles keep going.
    pub(crate) fn from_stage(suffix: &str, err: ShrinkError) -> Self {
        match err {
            ShrinkError::ToolFailed { tool, page, detail } => ProfileError::Tool {
                suffix: suffix.to_string(),
                tool,
                page: page.unwrap_or(0),
                detail,
            },
            ShrinkError::PageCountMismatch {
                pages, text_layers, ..
            } => ProfileError::PageCountMismatch {
                suffix: suffix.to_string(),
                pages,
                text_layers,
            },
            ShrinkError::OutputWriteFailed { path, source } => ProfileError::Assembly {
                suffix: suffix.to_string(),
                detail: format!("writing '{}': {source}", path.display()),
            },
            other => ProfileError::Assembly {
                suffix: suffix.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = ShrinkError::PartialFailure {
            failed: 1,
            total: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/2"), "got: {msg}");
    }

    #[test]
    fn tool_failed_display_with_page() {
        let e = ShrinkError::ToolFailed {
            tool: "tesseract".into(),
            page: Some(7),
            detail: "exit status 1".into(),
        };
        assert!(e.to_string().contains("tesseract"));
        assert!(e.to_string().contains("page 7"));
    }

    #[test]
    fn tool_failed_display_without_page() {
        let e = ShrinkError::ToolFailed {
            tool: "pdfimages".into(),
            page: None,
            detail: "exit status 2".into(),
        };
        assert!(!e.to_string().contains("page"));
    }

    #[test]
    fn mismatch_display() {
        let e = ShrinkError::PageCountMismatch {
            suffix: "hi".into(),
            pages: 4,
            text_layers: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("4 pages"));
        assert!(msg.contains("3 text layers"));
    }

    #[test]
    fn profile_error_from_tool_failure() {
        let e = ProfileError::from_stage(
            "lo",
            ShrinkError::ToolFailed {
                tool: "magick".into(),
                page: Some(2),
                detail: "killed".into(),
            },
        );
        match e {
            ProfileError::Tool { suffix, page, .. } => {
                assert_eq!(suffix, "lo");
                assert_eq!(page, 2);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
