//! Page scroll suspension while modals are open
//!
//! The lock is reference counted: every open modal holds a [`ScrollGuard`],
//! and page scrolling comes back only when the last guard is dropped.

use parking_lot::Mutex;
use std::sync::Arc;

/// Host hook that actually toggles page scrolling
pub trait ScrollHost: Send {
    fn set_page_scroll(&mut self, enabled: bool);
}

/// Host that does nothing; for headless use
#[derive(Debug, Default)]
pub struct NoopScrollHost;

impl ScrollHost for NoopScrollHost {
    fn set_page_scroll(&mut self, _enabled: bool) {}
}

struct Inner {
    holders: usize,
    host: Box<dyn ScrollHost>,
}

#[derive(Clone)]
pub struct ScrollLock {
    inner: Arc<Mutex<Inner>>,
}

impl ScrollLock {
    pub fn new(host: impl ScrollHost + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                holders: 0,
                host: Box::new(host),
            })),
        }
    }

    pub fn headless() -> Self {
        Self::new(NoopScrollHost)
    }

    /// Suspend page scrolling until the returned guard is dropped
    pub fn acquire(&self) -> ScrollGuard {
        let mut inner = self.inner.lock();
        inner.holders += 1;
        if inner.holders == 1 {
            inner.host.set_page_scroll(false);
            tracing::debug!("Page scroll suspended");
        }
        ScrollGuard {
            lock: Arc::clone(&self.inner),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.lock().holders > 0
    }
}

/// Held for as long as page scroll must stay suspended
pub struct ScrollGuard {
    lock: Arc<Mutex<Inner>>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        let mut inner = self.lock.lock();
        inner.holders = inner.holders.saturating_sub(1);
        if inner.holders == 0 {
            inner.host.set_page_scroll(true);
            tracing::debug!("Page scroll restored");
        }
    }
}

impl std::fmt::Debug for ScrollGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every toggle the lock makes
    #[derive(Clone, Default)]
    pub(crate) struct RecordingHost(pub Arc<Mutex<Vec<bool>>>);

    impl ScrollHost for RecordingHost {
        fn set_page_scroll(&mut self, enabled: bool) {
            self.0.lock().push(enabled);
        }
    }

    #[test]
    fn test_nested_guards_release_once() {
        let host = RecordingHost::default();
        let lock = ScrollLock::new(host.clone());

        let gate = lock.acquire();
        let lightbox = lock.acquire();
        assert!(lock.is_suspended());

        drop(gate);
        assert!(lock.is_suspended());
        drop(lightbox);
        assert!(!lock.is_suspended());

        assert_eq!(*host.0.lock(), vec![false, true]);
    }

    #[test]
    fn test_guard_released_on_error_path() {
        let host = RecordingHost::default();
        let lock = ScrollLock::new(host.clone());

        let result: Result<(), &str> = (|| {
            let _guard = lock.acquire();
            Err("render failed")
        })();

        assert!(result.is_err());
        assert!(!lock.is_suspended());
        assert_eq!(*host.0.lock(), vec![false, true]);
    }
}
