//! Configuration types for a shrink/OCR run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across workers, serialise the interesting parts for
//! logging, and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ShrinkError;
use crate::progress::RunCallback;
use crate::toolkit::PageToolkit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// US Letter, in inches. The virtual page every fit-to-page raster is
/// normalised onto unless the caller configures another paper size.
pub const DEFAULT_PAPER_SIZE_IN: (f64, f64) = (8.5, 11.0);

/// A named output configuration: one final document is produced per profile.
///
/// The raster dimensions of a profile's pages are derived from the run's
/// physical paper size multiplied by the profile's DPI, so a 300 DPI
/// profile on US Letter yields 2550 × 3300 px pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Output file suffix; the document is written to
    /// `{output_base}_{suffix}.pdf`. Also keyed into per-page artifact
    /// names, so it must be unique within a run.
    pub suffix: String,
    /// Target resolution in dots per inch.
    pub dpi: u32,
}

impl Profile {
    pub fn new(suffix: impl Into<String>, dpi: u32) -> Self {
        Self {
            suffix: suffix.into(),
            dpi,
        }
    }

    /// Pixel dimensions of this profile's virtual page on the given paper.
    pub fn pixel_dimensions(&self, paper_size_in: (f64, f64)) -> (u32, u32) {
        let (w, h) = paper_size_in;
        (
            (w * self.dpi as f64).round() as u32,
            (h * self.dpi as f64).round() as u32,
        )
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} dpi)", self.suffix, self.dpi)
    }
}

/// How each page raster is normalised before recognition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizePolicy {
    /// Scale to the configured paper size at the profile's DPI, padding with
    /// a white background (center gravity) when the scan's aspect ratio
    /// differs. Normalises heterogeneous scan sizes to a uniform virtual
    /// page. (default)
    FitToPage,
    /// Re-encode at reduced JPEG quality without altering the native aspect
    /// ratio. Pure size reduction for documents whose pages are already
    /// uniform.
    QualityReduction {
        /// JPEG quality, 1–100.
        quality: u8,
    },
}

impl Default for NormalizePolicy {
    fn default() -> Self {
        NormalizePolicy::FitToPage
    }
}

/// Configuration for one shrink/OCR run.
///
/// Built via [`RunConfig::builder()`] or using [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use scanpress::{Profile, RunConfig};
///
/// let config = RunConfig::builder()
///     .profiles(vec![Profile::new("hi", 300), Profile::new("lo", 150)])
///     .concurrency(2)
///     .overwrite(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Output profiles; one document is produced per entry. Default:
    /// `hi` at 300 DPI and `lo` at 150 DPI.
    ///
    /// Two resolutions cover the common digitisation split: an archival
    /// copy sharp enough to reread small print, and a web copy small
    /// enough to serve inline.
    pub profiles: Vec<Profile>,

    /// Physical paper size in inches used by the fit-to-page policy.
    /// Default: US Letter (8.5 × 11).
    pub paper_size_in: (f64, f64),

    /// Normalisation policy applied to every page raster. Default:
    /// [`NormalizePolicy::FitToPage`].
    pub policy: NormalizePolicy,

    /// Number of pages processed concurrently within a profile. Default: 4.
    ///
    /// Every page spawns external resize and OCR processes, which are
    /// CPU-bound; unbounded spawning exhausts memory and file handles long
    /// before it saturates the disk. Four workers keeps a typical
    /// four-core scanner station busy without thrashing.
    pub concurrency: usize,

    /// Re-run recognition even when the auxiliary directory already holds
    /// a text layer for a page. Default: false.
    pub overwrite: bool,

    /// Process at most this many pages from the source. `None` = all.
    pub max_pages: Option<usize>,

    /// Auxiliary directory of reusable per-page text layers.
    ///
    /// Read before each recognition; written back after each fresh one.
    /// Purely an optimisation — outputs are identical with or without it.
    pub aux_dir: Option<PathBuf>,

    /// Abort a profile when recognition fails on a page. Default: true.
    ///
    /// When false, a failed page is carried as an image-only page with no
    /// searchable text rather than sinking the whole document.
    pub strict_recognition: bool,

    /// Let external tools print their own diagnostics. Default: false
    /// (tools run quiet; scanpress logs the invocations itself).
    pub verbose_tools: bool,

    /// Preferred root for the run's temporary workspace. Used when it
    /// exists and is writable, otherwise the system default applies.
    pub preferred_tmp_root: Option<PathBuf>,

    /// Pre-constructed toolkit. Takes precedence over the PATH-discovered
    /// system tools; the seam test suites and embedded engines plug into.
    pub toolkit: Option<Arc<dyn PageToolkit>>,

    /// Observer for per-page and per-profile progress events.
    pub progress_callback: Option<RunCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profiles: vec![Profile::new("hi", 300), Profile::new("lo", 150)],
            paper_size_in: DEFAULT_PAPER_SIZE_IN,
            policy: NormalizePolicy::default(),
            concurrency: 4,
            overwrite: false,
            max_pages: None,
            aux_dir: None,
            strict_recognition: true,
            verbose_tools: false,
            preferred_tmp_root: None,
            toolkit: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("profiles", &self.profiles)
            .field("paper_size_in", &self.paper_size_in)
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .field("overwrite", &self.overwrite)
            .field("max_pages", &self.max_pages)
            .field("aux_dir", &self.aux_dir)
            .field("strict_recognition", &self.strict_recognition)
            .field("verbose_tools", &self.verbose_tools)
            .field("preferred_tmp_root", &self.preferred_tmp_root)
            .field("toolkit", &self.toolkit.as_ref().map(|_| "<dyn PageToolkit>"))
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.config.profiles = profiles;
        self
    }

    pub fn paper_size_in(mut self, width: f64, height: f64) -> Self {
        self.config.paper_size_in = (width, height);
        self
    }

    pub fn policy(mut self, policy: NormalizePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn aux_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.aux_dir = Some(dir.into());
        self
    }

    pub fn strict_recognition(mut self, v: bool) -> Self {
        self.config.strict_recognition = v;
        self
    }

    pub fn verbose_tools(mut self, v: bool) -> Self {
        self.config.verbose_tools = v;
        self
    }

    pub fn preferred_tmp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.preferred_tmp_root = Some(root.into());
        self
    }

    pub fn toolkit(mut self, toolkit: Arc<dyn PageToolkit>) -> Self {
        self.config.toolkit = Some(toolkit);
        self
    }

    pub fn progress_callback(mut self, cb: RunCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, ShrinkError> {
        let c = &self.config;
        if c.profiles.is_empty() {
            return Err(ShrinkError::InvalidConfig(
                "At least one output profile is required".into(),
            ));
        }
        for p in &c.profiles {
            if p.suffix.is_empty() {
                return Err(ShrinkError::InvalidConfig(
                    "Profile suffix must not be empty".into(),
                ));
            }
            if p.suffix.contains(std::path::is_separator) {
                return Err(ShrinkError::InvalidConfig(format!(
                    "Profile suffix '{}' must not contain path separators",
                    p.suffix
                )));
            }
            if p.dpi < 50 || p.dpi > 1200 {
                return Err(ShrinkError::InvalidConfig(format!(
                    "Profile '{}': DPI must be 50–1200, got {}",
                    p.suffix, p.dpi
                )));
            }
        }
        let mut suffixes: Vec<&str> = c.profiles.iter().map(|p| p.suffix.as_str()).collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        if suffixes.len() != c.profiles.len() {
            return Err(ShrinkError::InvalidConfig(
                "Profile suffixes must be unique".into(),
            ));
        }
        if c.paper_size_in.0 <= 0.0 || c.paper_size_in.1 <= 0.0 {
            return Err(ShrinkError::InvalidConfig(format!(
                "Paper size must be positive, got {:?}",
                c.paper_size_in
            )));
        }
        if let NormalizePolicy::QualityReduction { quality } = c.policy {
            if quality == 0 || quality > 100 {
                return Err(ShrinkError::InvalidConfig(format!(
                    "JPEG quality must be 1–100, got {quality}"
                )));
            }
        }
        if c.max_pages == Some(0) {
            return Err(ShrinkError::InvalidConfig(
                "max_pages must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profiles_are_hi_lo() {
        let config = RunConfig::default();
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[0], Profile::new("hi", 300));
        assert_eq!(config.profiles[1], Profile::new("lo", 150));
    }

    #[test]
    fn pixel_dimensions_letter() {
        let hi = Profile::new("hi", 300);
        assert_eq!(hi.pixel_dimensions(DEFAULT_PAPER_SIZE_IN), (2550, 3300));
        let lo = Profile::new("lo", 150);
        assert_eq!(lo.pixel_dimensions(DEFAULT_PAPER_SIZE_IN), (1275, 1650));
    }

    #[test]
    fn builder_rejects_empty_profiles() {
        let err = RunConfig::builder().profiles(vec![]).build().unwrap_err();
        assert!(matches!(err, ShrinkError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_duplicate_suffixes() {
        let err = RunConfig::builder()
            .profiles(vec![Profile::new("web", 150), Profile::new("web", 300)])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        let err = RunConfig::builder()
            .profiles(vec![Profile::new("thumb", 10)])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("DPI"));
    }

    #[test]
    fn builder_rejects_zero_quality() {
        let err = RunConfig::builder()
            .policy(NormalizePolicy::QualityReduction { quality: 0 })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn builder_clamps_concurrency() {
        let config = RunConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn builder_rejects_separator_in_suffix() {
        let err = RunConfig::builder()
            .profiles(vec![Profile::new("a/b", 150)])
            .build()
            .unwrap_err();
        assert!(matches!(err, ShrinkError::InvalidConfig(_)));
    }
}
