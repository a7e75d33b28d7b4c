//! Source classification: a scanned document arrives either as a PDF
//! container or as a directory of per-page scan images.
//!
//! Validation happens up front — a bad source must fail before the
//! workspace is created or any tool runs, with nothing written. For PDF
//! sources the `%PDF` magic is checked so callers get a meaningful error
//! rather than a cryptic extraction failure three stages later.

use crate::error::ShrinkError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated source document.
#[derive(Debug, Clone)]
pub enum Source {
    /// A PDF container; pages are extracted by the split capability.
    Pdf(PathBuf),
    /// A directory of raw page images, one file per page, page order =
    /// sorted file-name order.
    ImageDir(PathBuf),
}

impl Source {
    /// The underlying path regardless of source kind.
    pub fn path(&self) -> &Path {
        match self {
            Source::Pdf(p) => p,
            Source::ImageDir(p) => p,
        }
    }
}

/// Classify and validate the user-supplied source path.
pub fn resolve_source(path_str: &str) -> Result<Source, ShrinkError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ShrinkError::SourceNotFound { path });
    }

    if path.is_dir() {
        debug!("Resolved source as image directory: {}", path.display());
        return Ok(Source::ImageDir(path));
    }

    // Check read permission by attempting to open, and verify PDF magic.
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ShrinkError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ShrinkError::SourceUnreadable { path });
        }
        Err(_) => {
            return Err(ShrinkError::SourceNotFound { path });
        }
    }

    debug!("Resolved source as PDF: {}", path.display());
    Ok(Source::Pdf(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_is_not_found() {
        let err = resolve_source("/no/such/file.pdf").unwrap_err();
        assert!(matches!(err, ShrinkError::SourceNotFound { .. }));
    }

    #[test]
    fn directory_resolves_to_image_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = resolve_source(dir.path().to_str().unwrap()).unwrap();
        assert!(matches!(src, Source::ImageDir(_)));
    }

    #[test]
    fn pdf_magic_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"not a pdf at all").unwrap();

        let err = resolve_source(path.to_str().unwrap()).unwrap_err();
        match err {
            ShrinkError::NotAPdf { magic, .. } => assert_eq!(&magic, b"not "),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn valid_pdf_magic_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.pdf");
        std::fs::write(&path, b"%PDF-1.4\n...").unwrap();

        let src = resolve_source(path.to_str().unwrap()).unwrap();
        assert!(matches!(src, Source::Pdf(_)));
    }
}
