// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session records and the session-keyed store.
//!
//! Each session id maps to its own [`SessionSlot`] behind its own mutex. The
//! map lock is held only long enough to find or insert the slot; the slot
//! lock is held for the whole guard → rate-limit sequence of one request, so
//! requests on the same session are serialized while different sessions
//! proceed independently.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

use super::locks::{resilient_lock, resilient_read, resilient_write};

/// Lifecycle state of a session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No session has been created yet (or it was logged out)
    Uninitialized,
    /// A session exists and accepts requests
    Active,
    /// The last session timed out; the next request starts a new one
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "UNINITIALIZED"),
            SessionState::Active => write!(f, "ACTIVE"),
            SessionState::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// One user's interaction lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// When the session was created
    pub created_at: Instant,
    /// Last admitted or rejected request
    pub last_activity_at: Instant,
    /// Requests counted in the current rate-limit window
    pub request_count: u32,
    /// Start of the current rate-limit window, if one has begun
    pub window_start: Option<Instant>,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            created_at: now,
            last_activity_at: now,
            request_count: 0,
            window_start: None,
        }
    }
}

/// Per-id state cell. `Expired` and `Evicted` hold no session data: expiry
/// clears every field, rate-limit counters included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionSlot {
    #[default]
    Uninitialized,
    Active(Session),
    /// Expiry was reported; the next request starts a new session
    Expired,
    /// Timed out while idle and cleared by a sweep. The next request is
    /// told the session expired.
    Evicted { evicted_at: Instant },
}

impl SessionSlot {
    pub fn state(&self) -> SessionState {
        match self {
            SessionSlot::Uninitialized => SessionState::Uninitialized,
            SessionSlot::Active(_) => SessionState::Active,
            SessionSlot::Expired | SessionSlot::Evicted { .. } => SessionState::Expired,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionSlot::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match self {
            SessionSlot::Active(session) => Some(session),
            _ => None,
        }
    }
}

type SharedSlot = Arc<Mutex<SessionSlot>>;

/// Outcome of [`SessionStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Active sessions found idle past the timeout and cleared
    pub evicted: usize,
    /// Empty slots dropped from the store
    pub removed: usize,
}

/// In-memory, session-keyed store. Nothing is persisted.
#[derive(Debug, Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, SharedSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for `session_id`, creating an uninitialized one if the id
    /// has never been seen.
    fn slot(&self, session_id: &str) -> SharedSlot {
        if let Some(slot) = resilient_read(&self.slots).get(session_id) {
            return Arc::clone(slot);
        }

        let mut slots = resilient_write(&self.slots);
        Arc::clone(slots.entry(session_id.to_string()).or_default())
    }

    /// Run `f` with exclusive access to the session's slot.
    pub fn with_slot<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionSlot) -> R) -> R {
        let slot = self.slot(session_id);
        let mut guard = resilient_lock(&slot);
        f(&mut *guard)
    }

    /// Snapshot of a slot's contents without creating it.
    pub fn snapshot(&self, session_id: &str) -> SessionSlot {
        let slot = resilient_read(&self.slots).get(session_id).cloned();
        match slot {
            Some(slot) => resilient_lock(&slot).clone(),
            None => SessionSlot::Uninitialized,
        }
    }

    /// Reclaim abandoned sessions.
    ///
    /// An `Active` session idle longer than `timeout` is cleared to
    /// `Evicted`, so its next request still sees the expiry. `Evicted`
    /// markers older than `timeout` are dropped, as are slots that hold no
    /// session. Slots held by an in-flight request are left alone.
    pub fn purge_expired(&self, now: Instant, timeout: Duration) -> SweepStats {
        let mut slots = resilient_write(&self.slots);
        let before = slots.len();
        let mut evicted = 0;

        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let mut guard = match slot.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return true,
            };
            let since = match &*guard {
                SessionSlot::Active(session) => session.last_activity_at,
                SessionSlot::Evicted { evicted_at } => {
                    return now.saturating_duration_since(*evicted_at) <= timeout;
                }
                SessionSlot::Uninitialized | SessionSlot::Expired => return false,
            };
            if now.saturating_duration_since(since) > timeout {
                *guard = SessionSlot::Evicted { evicted_at: now };
                evicted += 1;
            }
            true
        });

        let stats = SweepStats {
            evicted,
            removed: before - slots.len(),
        };
        if stats.evicted > 0 || stats.removed > 0 {
            tracing::debug!(
                target: "agentguard::session",
                evicted = stats.evicted,
                removed = stats.removed,
                remaining = slots.len(),
                "Swept session slots"
            );
        }
        stats
    }

    /// Number of slots currently tracked, in any state.
    pub fn len(&self) -> usize {
        resilient_read(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a session id for hosts that have none of their own.
pub fn generate_session_id() -> String {
    let counter = SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    let timestamp = Utc::now().timestamp_millis();
    let random: u32 = rand::random();

    format!("sess_{}_{}_{:08x}", timestamp, counter, random)
}

// ============================================================================
// TESTS
// ============================================================================
