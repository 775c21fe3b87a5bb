//! Mutex poisoning recovery
//!
//! Mutex-protected state in this crate is plain data whose invariants hold
//! after every individual write, so a lock poisoned by a panicking thread
//! is recovered instead of propagating the panic.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Locks a mutex, recovering the inner value if it was poisoned
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mutex was poisoned, recovering inner value");
            poisoned.into_inner()
        }
    }
}

/// Read-locks an `RwLock`, recovering from poisoning
pub(crate) fn read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("RwLock was poisoned, recovering inner value");
            poisoned.into_inner()
        }
    }
}

/// Write-locks an `RwLock`, recovering from poisoning
pub(crate) fn write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("RwLock was poisoned, recovering inner value");
            poisoned.into_inner()
        }
    }
}
