//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through pages and profiles.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a job queue record, or a
//! log file without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so it works
//! correctly when pages are processed concurrently.

use std::sync::Arc;

/// Called by the pipeline as it processes pages and profiles.
///
/// Implementations must be `Send + Sync` (pages within a profile are
/// processed concurrently). All methods have default no-op implementations
/// so callers only override what they care about.
///
/// # Thread safety
///
/// `on_page_start`, `on_page_complete`, and `on_page_error` may be called
/// concurrently from different tasks. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after splitting, before any page work begins.
    fn on_run_start(&self, total_pages: usize, profiles: usize) {
        let _ = (total_pages, profiles);
    }

    /// Called when a profile's page processing begins.
    fn on_profile_start(&self, suffix: &str, total_pages: usize) {
        let _ = (suffix, total_pages);
    }

    /// Called just before a page's normalise/recognise chain starts.
    fn on_page_start(&self, suffix: &str, page: usize, total_pages: usize) {
        let _ = (suffix, page, total_pages);
    }

    /// Called when a page's text-layer artifact is ready.
    ///
    /// `reused` is true when the artifact came from the auxiliary cache
    /// rather than a fresh recognition.
    fn on_page_complete(&self, suffix: &str, page: usize, total_pages: usize, reused: bool) {
        let _ = (suffix, page, total_pages, reused);
    }

    /// Called when a page fails.
    fn on_page_error(&self, suffix: &str, page: usize, total_pages: usize, error: &str) {
        let _ = (suffix, page, total_pages, error);
    }

    /// Called once per profile after its document was written (or the
    /// profile aborted).
    fn on_profile_complete(&self, suffix: &str, succeeded: bool) {
        let _ = (suffix, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopRunCallback;

impl RunProgressCallback for NoopRunCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type RunCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        page_starts: AtomicUsize,
        page_completes: AtomicUsize,
        reuses: AtomicUsize,
        page_errors: AtomicUsize,
        profile_completes: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_page_start(&self, _suffix: &str, _page: usize, _total: usize) {
            self.page_starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _suffix: &str, _page: usize, _total: usize, reused: bool) {
            self.page_completes.fetch_add(1, Ordering::SeqCst);
            if reused {
                self.reuses.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_page_error(&self, _suffix: &str, _page: usize, _total: usize, _error: &str) {
            self.page_errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_profile_complete(&self, _suffix: &str, _succeeded: bool) {
            self.profile_completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopRunCallback;
        cb.on_run_start(5, 2);
        cb.on_profile_start("hi", 5);
        cb.on_page_start("hi", 1, 5);
        cb.on_page_complete("hi", 1, 5, false);
        cb.on_page_error("hi", 2, 5, "some error");
        cb.on_profile_complete("hi", true);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            page_starts: AtomicUsize::new(0),
            page_completes: AtomicUsize::new(0),
            reuses: AtomicUsize::new(0),
            page_errors: AtomicUsize::new(0),
            profile_completes: AtomicUsize::new(0),
        };

        tracker.on_page_start("hi", 1, 3);
        tracker.on_page_complete("hi", 1, 3, true);
        tracker.on_page_start("hi", 2, 3);
        tracker.on_page_complete("hi", 2, 3, false);
        tracker.on_page_start("hi", 3, 3);
        tracker.on_page_error("hi", 3, 3, "tesseract crashed");
        tracker.on_profile_complete("hi", false);

        assert_eq!(tracker.page_starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.page_completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.reuses.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.page_errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.profile_completes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn RunProgressCallback> = Arc::new(NoopRunCallback);
        cb.on_run_start(10, 2);
        cb.on_page_start("lo", 1, 10);
        cb.on_page_complete("lo", 1, 10, false);
    }
}
