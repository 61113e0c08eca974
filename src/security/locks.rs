// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Poison-tolerant lock acquisition.
//!
//! A panic while a session slot is locked must not take every later request
//! for that user down with it. These helpers log the poisoning at error level
//! and hand back the guard anyway; the gateway then re-validates the slot
//! contents on the next request like any other state.
//!
//! ```
//! use std::sync::RwLock;
//! use agentguard::security::locks::{resilient_read, resilient_write};
//!
//! let lock = RwLock::new(42);
//! *resilient_write(&lock) = 100;
//! assert_eq!(*resilient_read(&lock), 100);
//! ```

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "agentguard::locks",
                event = "LOCK_POISONED_READ",
                "RwLock was poisoned during read acquisition. Recovering data."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning if necessary.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "agentguard::locks",
                event = "LOCK_POISONED_WRITE",
                "RwLock was poisoned during write acquisition. Recovering data."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a mutex, recovering from poisoning if necessary.
///
/// Used for per-session slots, where one request at a time owns the slot.
#[inline]
pub fn resilient_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "agentguard::locks",
                event = "LOCK_POISONED_MUTEX",
                "Mutex was poisoned while a request held it. Recovering data."
            );
            poisoned.into_inner()
        }
    }
}
