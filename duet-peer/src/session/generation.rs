use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Номер текущего экземпляра соединения, общий для актора и `Session`.
///
/// Любая работа, начатая для экземпляра `g`, применяет свой результат только
/// если `current() == g` после await.
#[derive(Debug, Default)]
pub(crate) struct Generation {
    current: AtomicU64,
    cancel: Notify,
}

impl Generation {
    pub(crate) fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Starts a new generation and returns it.
    pub(crate) fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidates the current generation and wakes in-flight work.
    pub(crate) fn invalidate(&self) {
        self.advance();
        self.cancel.notify_waiters();
    }

    pub(crate) fn cancelled(&self) -> tokio::sync::futures::Notified<'_> {
        self.cancel.notified()
    }
}
