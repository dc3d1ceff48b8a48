//! Loading-state notifications around asynchronous client actions.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// Receives `(true, Some(message))` when an action starts and
/// `(false, None)` when it ends.
pub trait LoadingObserver: Send + Sync {
    fn on_loading(&self, is_loading: bool, message: Option<&str>);
}

impl<F> LoadingObserver for F
where
    F: Fn(bool, Option<&str>) + Send + Sync,
{
    fn on_loading(&self, is_loading: bool, message: Option<&str>) {
        self(is_loading, message)
    }
}

#[derive(Default)]
pub struct Loading {
    observer: RwLock<Option<Arc<dyn LoadingObserver>>>,
}

impl Loading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: impl LoadingObserver + 'static) -> Self {
        let loading = Self::new();
        loading.set_observer(observer);
        loading
    }

    pub fn set_observer(&self, observer: impl LoadingObserver + 'static) {
        *self.observer.write() = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    fn current(&self) -> Option<Arc<dyn LoadingObserver>> {
        self.observer.read().clone()
    }

    /// Signal loading now; the returned scope signals the end when dropped.
    pub fn begin(&self, message: &str) -> LoadingScope {
        let observer = self.current();
        if let Some(observer) = &observer {
            observer.on_loading(true, Some(message));
        }
        LoadingScope { observer }
    }

    pub async fn track<F: Future>(&self, message: &str, fut: F) -> F::Output {
        let _scope = self.begin(message);
        fut.await
    }
}

// The observer captured at begin() gets the matching end signal,
// even if it was replaced in the meantime.
pub struct LoadingScope {
    observer: Option<Arc<dyn LoadingObserver>>,
}

impl Drop for LoadingScope {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.on_loading(false, None);
        }
    }
}
