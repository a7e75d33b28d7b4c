//! Result types returned by a shrink/OCR run.
//!
//! A run never loses information about partial success: every requested
//! profile gets a [`ProfileResult`] whether it produced a document or
//! aborted, and [`RunOutput::into_result`] converts the aggregate into a
//! hard error for callers that want all-or-nothing semantics (the CLI
//! does, so its exit status reflects any aborted profile).

use crate::config::Profile;
use crate::error::{ProfileError, ShrinkError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one output profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResult {
    /// The profile this result belongs to.
    pub profile: Profile,
    /// Final document path. `None` when the profile aborted.
    pub output_path: Option<PathBuf>,
    /// Pages assembled into the document.
    pub pages: usize,
    /// Pages whose text layer was freshly recognised.
    pub recognized_pages: usize,
    /// Pages whose text layer came from the auxiliary reuse directory.
    pub reused_pages: usize,
    /// Wall-clock time spent on this profile.
    pub duration_ms: u64,
    /// The failure that aborted this profile, if any.
    pub error: Option<ProfileError>,
}

impl ProfileResult {
    /// True when the profile produced its document.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.output_path.is_some()
    }
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages the splitter produced from the source.
    pub source_pages: usize,
    /// Profiles requested.
    pub profiles_attempted: usize,
    /// Profiles that produced a document.
    pub profiles_succeeded: usize,
    /// Fresh recognitions across all profiles.
    pub recognized_pages: usize,
    /// Cache hits across all profiles.
    pub reused_pages: usize,
    /// Time spent splitting the source.
    pub split_duration_ms: u64,
    /// Total wall-clock time for the run.
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// One entry per requested profile, in request order.
    pub profiles: Vec<ProfileResult>,
    /// Aggregate statistics.
    pub stats: RunStats,
}

impl RunOutput {
    /// Collapse the aggregate into a single result.
    ///
    /// Returns `Err(ShrinkError::PartialFailure)` if any profile aborted,
    /// even when others produced documents — the run's exit status must
    /// not hide a missing output.
    pub fn into_result(self) -> Result<RunOutput, ShrinkError> {
        let failed = self.profiles.iter().filter(|p| !p.succeeded()).count();
        if failed > 0 {
            return Err(ShrinkError::PartialFailure {
                failed,
                total: self.profiles.len(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_result(suffix: &str) -> ProfileResult {
        ProfileResult {
            profile: Profile::new(suffix, 300),
            output_path: Some(PathBuf::from(format!("/tmp/out_{suffix}.pdf"))),
            pages: 2,
            recognized_pages: 2,
            reused_pages: 0,
            duration_ms: 10,
            error: None,
        }
    }

    #[test]
    fn into_result_ok_when_all_profiles_succeed() {
        let out = RunOutput {
            profiles: vec![ok_result("hi"), ok_result("lo")],
            stats: RunStats::default(),
        };
        assert!(out.into_result().is_ok());
    }

    #[test]
    fn into_result_fails_on_any_aborted_profile() {
        let mut bad = ok_result("lo");
        bad.output_path = None;
        bad.error = Some(ProfileError::Assembly {
            suffix: "lo".into(),
            detail: "boom".into(),
        });
        let out = RunOutput {
            profiles: vec![ok_result("hi"), bad],
            stats: RunStats::default(),
        };
        match out.into_result() {
            Err(ShrinkError::PartialFailure { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }
}
