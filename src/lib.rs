//! # scanpress
//!
//! Turn scanned documents into compact, searchable PDFs.
//!
//! ## Why this crate?
//!
//! Digitisation rigs produce PDFs that are huge and dumb: hundreds of
//! megabytes of raw scan raster with no text layer, so nothing in them can
//! be searched, copied, or indexed. scanpress drives the standard
//! digitisation chain — page extraction, raster normalisation, OCR, and
//! reassembly — to produce one or more right-sized documents whose pages
//! carry an invisible, positioned text layer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source PDF / scan directory
//!  │
//!  ├─ 1. Split      one raster per page, in source order
//!  ├─ 2. Normalize  resize + pad (or re-encode) per output profile
//!  ├─ 3. Recognize  OCR per page → single-page PDF with text layer
//!  │                 (reused from the aux cache when already computed)
//!  └─ 4. Assemble   ordered concatenation, atomic move into place
//! ```
//!
//! Steps 2–3 run per requested [`Profile`] — typically an archival `hi`
//! (300 DPI) and a web `lo` (150 DPI) — with pages processed concurrently
//! under a bounded worker pool. Profiles fail independently: one aborted
//! resolution never discards another's finished document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanpress::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::default(); // hi=300dpi + lo=150dpi
//!     let output = run("scan.pdf", "out/book", &config).await?;
//!     for p in &output.profiles {
//!         match &p.output_path {
//!             Some(path) => println!("{} -> {}", p.profile, path.display()),
//!             None => eprintln!("{} aborted: {:?}", p.profile, p.error),
//!         }
//!     }
//!     output.into_result()?; // error out if any profile aborted
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! The heavy lifting is delegated to the conventional digitisation chain,
//! found on PATH at run start:
//!
//! | Tool | Capability |
//! |------|-----------|
//! | `pdfimages` (poppler) | extract page rasters from the source PDF |
//! | `magick` / `convert` (ImageMagick 7 / 6) | resize, pad, re-encode |
//! | `tesseract` | recognise text, emit per-page searchable PDF |
//! | `pdftk` | concatenate per-page PDFs in order |
//!
//! Any engine can be replaced by implementing [`PageToolkit`] and passing
//! it through [`RunConfigBuilder::toolkit`] — the test suite runs the
//! whole pipeline against an in-memory fake this way.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scanpress` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! scanpress = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod toolkit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NormalizePolicy, Profile, RunConfig, RunConfigBuilder, DEFAULT_PAPER_SIZE_IN};
pub use error::{ProfileError, ShrinkError};
pub use output::{ProfileResult, RunOutput, RunStats};
pub use progress::{NoopRunCallback, RunCallback, RunProgressCallback};
pub use run::run;
pub use toolkit::{NormalizeOp, PageToolkit, RecognizeOpts, SystemToolkit};
