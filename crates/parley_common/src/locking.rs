//! Lock helpers
//!
//! A panic while holding one of the engine's locks must not take the chat
//! down with it; the data behind the lock is plain bookkeeping, so a
//! poisoned guard is recovered and used as-is.

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("recovering poisoned lock");
            poisoned.into_inner()
        }
    }
}
