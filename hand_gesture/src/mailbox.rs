//! Single-slot latest-value mailbox.
//!
//! The sensor thread publishes at its own cadence; the frame loop takes
//! whatever is newest without blocking.  Unread values are overwritten, so
//! the consumer never works through a backlog of stale hands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Shared<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer half.
#[derive(Debug)]
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer half.
#[derive(Debug)]
pub struct Slot<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected publisher / slot pair.
pub fn mailbox<T>() -> (Publisher<T>, Slot<T>) {
    let shared = Arc::new(Shared { slot: Mutex::new(None) });
    (Publisher { shared: Arc::clone(&shared) }, Slot { shared })
}

impl<T> Publisher<T> {
    /// Replace the slot contents.  Returns the value nobody read.
    pub fn publish(&self, value: T) -> Option<T> {
        self.shared.lock().replace(value)
    }

    /// True once the consumer half is gone.
    pub fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}

impl<T> Slot<T> {
    /// Take the newest value, if one arrived since the last call.
    pub fn take_latest(&self) -> Option<T> {
        self.shared.lock().take()
    }

    /// True once the producer half is gone.
    pub fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}
