use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked once a positional move has settled.
pub type MoveCallback = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle tying one issued move to its (at most one) completion.
///
/// Clones share state. The `armed` flag is the single claim point: whoever
/// swaps it to false owns the completion and nobody else can report it.
/// The callback can be dropped independently of the claim, which is how
/// "cancel the notification but let the motion bookkeeping land" works.
#[derive(Clone)]
pub struct CompletionToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    armed: AtomicBool,
    callback: Mutex<Option<MoveCallback>>,
}

impl CompletionToken {
    #[must_use]
    pub fn new(callback: Option<MoveCallback>) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                armed: AtomicBool::new(true),
                callback: Mutex::new(callback),
            }),
        }
    }

    /// Claim the completion. Returns true exactly once across all clones.
    pub fn disarm(&self) -> bool {
        self.inner.armed.swap(false, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.lock_callback().is_some()
    }

    /// Drop the callback but leave the token armed: the completion will
    /// still be claimed (and bookkeeping applied) silently.
    pub fn cancel_callback(&self) {
        self.lock_callback().take();
    }

    /// Kill the token outright: nobody may claim it and nothing will run.
    pub fn revoke(&self) {
        self.disarm();
        self.cancel_callback();
    }

    pub fn take_callback(&self) -> Option<MoveCallback> {
        self.lock_callback().take()
    }

    /// Claim and invoke. The callback runs outside the internal lock.
    pub fn fire(&self) {
        if self.disarm() {
            if let Some(cb) = self.take_callback() {
                cb();
            }
        }
    }

    fn lock_callback(&self) -> std::sync::MutexGuard<'_, Option<MoveCallback>> {
        self.inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionToken")
            .field("armed", &self.is_armed())
            .field("has_callback", &self.has_callback())
            .finish()
    }
}
