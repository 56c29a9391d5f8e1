//! Bounded waits with an exactly-once completion.
//!
//! [`arm`] wraps a completion function and starts a timer. Whichever of
//! [`Guard::complete`] and the timer comes first runs the completion; the
//! other becomes a logged no-op. The completion receives `Some(value)` from
//! the real result and `None` from the timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

type Completion<T> = Box<dyn FnOnce(Option<T>) + Send>;

/// Shared bookkeeping for watchdogs of one composition.
///
/// Tracks how many watchdogs are armed and not yet resolved.
#[derive(Debug, Clone, Default)]
pub struct WatchdogContext {
    outstanding: Arc<AtomicUsize>,
}

impl WatchdogContext {
    /// Creates a new context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of watchdogs that have neither completed nor timed out.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

struct Inner<T> {
    label: String,
    started: Instant,
    completion: Mutex<Option<Completion<T>>>,
    context: WatchdogContext,
}

impl<T> Inner<T> {
    fn take(&self) -> Option<Completion<T>> {
        let taken = self
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            self.context.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
        taken
    }

    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

/// Guarded completion returned by [`arm`].
pub struct Guard<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Guard<T> {
    /// Delivers the real result, unless the timeout already fired.
    pub fn complete(self, value: T) {
        let inner = &self.inner;
        if let Some(completion) = inner.take() {
            tracing::debug!("{} completed in {}ms", inner.label, inner.elapsed_ms());
            completion(Some(value));
        } else {
            tracing::warn!(
                "{} took too long, result arrived after {}ms",
                inner.label,
                inner.elapsed_ms()
            );
        }
    }

    /// Returns true if neither path has run yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Arms a watchdog around `completion`.
///
/// Must be called within a tokio runtime; the timer runs as its own task.
pub fn arm<T, F>(
    context: &WatchdogContext,
    label: impl Into<String>,
    timeout: Duration,
    completion: F,
) -> Guard<T>
where
    T: Send + 'static,
    F: FnOnce(Option<T>) + Send + 'static,
{
    let inner = Arc::new(Inner {
        label: label.into(),
        started: Instant::now(),
        completion: Mutex::new(Some(Box::new(completion) as Completion<T>)),
        context: context.clone(),
    });

    let outstanding = context.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::trace!("{} armed, {} outstanding", inner.label, outstanding);

    let timer = Arc::clone(&inner);
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(completion) = timer.take() {
            tracing::warn!(
                "{} timed out after {}ms, {} still outstanding",
                timer.label,
                timer.elapsed_ms(),
                timer.context.outstanding()
            );
            completion(None);
        } else {
            tracing::trace!("{} kicked after completion", timer.label);
        }
    });

    Guard { inner }
}
