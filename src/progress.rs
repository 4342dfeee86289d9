//! Progress-callback trait for per-page and per-translation events.
//!
//! Pass an [`Arc<dyn ConversionProgressCallback>`] through
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! the pipeline in real time, page by page and translation by translation.
//!
//! A trait object is the least-invasive integration point here: the host
//! application can forward events to a channel, a WebSocket, or a terminal
//! progress bar without the library knowing which. The trait is `Send +
//! Sync` because page and translation events fire from concurrent tasks.

use std::sync::Arc;

/// Called by the conversion pipeline as it processes pages and translations.
///
/// Implementations must be `Send + Sync` (work items are processed
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
///
/// # Thread safety
///
/// Events for different pages and translation requests may arrive from
/// different threads at once; guard any shared mutable state with a `Mutex`
/// or atomics.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any page is sent to the model.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the vision request is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page was extracted and parsed.
    ///
    /// `rows` is the number of well-formed table rows the page yielded.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, rows: usize) {
        let _ = (page_num, total_pages, rows);
    }

    /// Called when a page fails after all retries are exhausted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: String) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once before the translation fan-out with the number of unique
    /// requests that will be issued (after cache deduplication).
    fn on_translation_start(&self, total_requests: usize) {
        let _ = total_requests;
    }

    /// Called after each translation request finishes, successfully or not.
    fn on_translation_progress(&self, done: usize, total_requests: usize) {
        let _ = (done, total_requests);
    }

    /// Called once after all pages and translations have been attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// No-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Alias for the callback handle stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        pages: AtomicUsize,
        translations: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page: usize, _total: usize, _rows: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_error(&self, _page: usize, _total: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_translation_progress(&self, _done: usize, _total: usize) {
            self.translations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 7);
        cb.on_page_error(2, 2, "boom".to_string());
        cb.on_translation_start(10);
        cb.on_translation_progress(1, 10);
        cb.on_conversion_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            pages: AtomicUsize::new(0),
            translations: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };
        cb.on_page_complete(1, 2, 5);
        cb.on_page_error(2, 2, "timeout".to_string());
        cb.on_translation_progress(1, 4);
        cb.on_translation_progress(2, 4);
        assert_eq!(cb.pages.load(Ordering::SeqCst), 1);
        assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
        assert_eq!(cb.translations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_is_send() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ConversionProgressCallback>();
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(1);
    }
}
