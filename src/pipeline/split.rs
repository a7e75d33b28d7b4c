//! Page splitting: one raster per page, in source order.
//!
//! ## Why an explicit index?
//!
//! Page order could be recovered by sorting artifact file names — the
//! zero-padded naming convention makes lexicographic and numeric order
//! coincide — but recovering order from names breaks silently the day a
//! document outgrows the padding width. Every [`Page`] therefore carries
//! its 1-based sequence index as a field, and every later stage orders by
//! that field; the padded names exist only for human inspection of the
//! workspace.

use crate::error::ShrinkError;
use crate::pipeline::source::Source;
use crate::toolkit::PageToolkit;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File extensions accepted as page scans when the source is a directory.
const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "jp2", "pbm", "pgm", "ppm"];

/// One ordered page of the source document.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based sequence index; the total order preserved through every
    /// stage and into the final document.
    pub index: usize,
    /// The page's source raster.
    pub raster: PathBuf,
}

impl Page {
    /// The zero-padded artifact stem for this page, e.g. `0007_hi`.
    ///
    /// Width 4 keeps name order equal to page order for any document under
    /// ten thousand pages; beyond that the explicit index still holds.
    pub fn artifact_stem(&self, suffix: &str) -> String {
        format!("{:04}_{}", self.index, suffix)
    }
}

/// Split the source into its ordered pages.
///
/// PDF sources go through the extraction capability into
/// `workspace/pages/`; directory sources are enumerated in sorted name
/// order in place. Either way the result is non-empty or the run dies —
/// a partial or empty split is never salvageable.
pub async fn split_pages(
    toolkit: &Arc<dyn PageToolkit>,
    source: &Source,
    workspace: &Path,
    max_pages: Option<usize>,
) -> Result<Vec<Page>, ShrinkError> {
    let rasters = match source {
        Source::Pdf(pdf) => {
            let pages_dir = workspace.join("pages");
            tokio::fs::create_dir_all(&pages_dir)
                .await
                .map_err(|e| ShrinkError::Internal(format!("creating pages dir: {e}")))?;
            toolkit.extract_pages(pdf, &pages_dir).await?
        }
        Source::ImageDir(dir) => list_page_images(dir)?,
    };

    if rasters.is_empty() {
        return match source {
            Source::Pdf(p) => Err(ShrinkError::NoPages { path: p.clone() }),
            Source::ImageDir(p) => Err(ShrinkError::EmptyImageDir { path: p.clone() }),
        };
    }

    let mut pages: Vec<Page> = rasters
        .into_iter()
        .enumerate()
        .map(|(i, raster)| Page {
            index: i + 1,
            raster,
        })
        .collect();

    if let Some(limit) = max_pages {
        if pages.len() > limit {
            debug!("Limiting {} pages to the first {}", pages.len(), limit);
            pages.truncate(limit);
        }
    }

    info!("Source split into {} pages", pages.len());
    Ok(pages)
}

/// Page images of a directory source, sorted by file name.
fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, ShrinkError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ShrinkError::SourceUnreadable {
            path: dir.to_path_buf(),
        },
        _ => ShrinkError::SourceNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_raster_extension(p))
        .collect();
    images.sort();
    Ok(images)
}

fn has_raster_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            RASTER_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_stem_is_zero_padded() {
        let page = Page {
            index: 7,
            raster: PathBuf::from("x.jpg"),
        };
        assert_eq!(page.artifact_stem("hi"), "0007_hi");

        let page = Page {
            index: 123,
            raster: PathBuf::from("x.jpg"),
        };
        assert_eq!(page.artifact_stem("lo"), "0123_lo");
    }

    #[test]
    fn raster_extension_filter() {
        assert!(has_raster_extension(Path::new("p/001_d.tif")));
        assert!(has_raster_extension(Path::new("p/scan.JPG")));
        assert!(!has_raster_extension(Path::new("p/notes.txt")));
        assert!(!has_raster_extension(Path::new("p/no_extension")));
    }

    #[test]
    fn directory_listing_is_name_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0003.tif", "0001.tif", "0002.tif", "README.md"] {
            std::fs::write(dir.path().join(name), b"img").unwrap();
        }

        let images = list_page_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["0001.tif", "0002.tif", "0003.tif"]);
    }
}
