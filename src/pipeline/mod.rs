//! Pipeline stages for shrink/OCR runs.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the OCR engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ split ──▶ normalize ──▶ recognize ──▶ assemble
//! (PDF/dir)  (rasters)  (resize/pad)  (text layer)  (ordered concat)
//! ```
//!
//! 1. [`source`]    — classify the user-supplied path as a PDF or a page
//!    image directory and validate it
//! 2. [`workspace`] — the run's scoped temporary directory; removed on
//!    every exit path
//! 3. [`split`]     — one raster per page, in source order, with an
//!    explicit 1-based index on each page
//! 4. [`normalize`] — per page per profile: resize/pad/re-encode to the
//!    profile's target dimensions and DPI
//! 5. [`recognize`] — per normalized raster: a single-page PDF with an
//!    invisible text layer; consults the auxiliary reuse cache first
//! 6. [`assemble`]  — concatenate in index order, then atomically publish
//!    the final document

pub mod assemble;
pub mod normalize;
pub mod recognize;
pub mod source;
pub mod split;
pub mod workspace;
