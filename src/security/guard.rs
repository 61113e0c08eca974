// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session expiry enforcement.
//!
//! An idle session is not refreshed, it is destroyed: the slot is cleared
//! to [`SessionSlot::Expired`], the caller gets
//! [`GateError::SessionExpired`], and the next request starts over with a
//! brand new session and empty rate-limit counters.

use std::time::{Duration, Instant};

use super::session::{Session, SessionSlot};
use crate::errors::GateError;

/// Default inactivity timeout: 30 minutes.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Enforces session inactivity timeout.
#[derive(Debug, Clone, Copy)]
pub struct SessionGuard {
    session_timeout: Duration,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionGuard {
    pub fn new(session_timeout: Duration) -> Self {
        Self { session_timeout }
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Create, refresh or expire the session in `slot`.
    ///
    /// - No session: create one at `now` and succeed.
    /// - Evicted by a sweep: report [`GateError::SessionExpired`] once.
    /// - Idle for longer than the timeout: clear the slot and fail with
    ///   [`GateError::SessionExpired`].
    /// - Otherwise: refresh `last_activity_at` and succeed.
    pub fn ensure_active(&self, slot: &mut SessionSlot, now: Instant) -> Result<(), GateError> {
        let session = match slot {
            SessionSlot::Active(session) => session,
            SessionSlot::Evicted { .. } => {
                *slot = SessionSlot::Expired;
                tracing::info!(target: "agentguard::session", "Evicted session timed out");
                return Err(GateError::SessionExpired);
            }
            SessionSlot::Uninitialized | SessionSlot::Expired => {
                *slot = SessionSlot::Active(Session::new(now));
                tracing::info!(target: "agentguard::session", "SESSION_CREATED");
                return Ok(());
            }
        };

        let idle = now.checked_duration_since(session.last_activity_at).ok_or_else(|| {
            GateError::internal("session last_activity_at is later than the current time")
        })?;

        if idle > self.session_timeout {
            let lifetime = now.saturating_duration_since(session.created_at);
            *slot = SessionSlot::Expired;
            tracing::info!(
                target: "agentguard::session",
                idle_secs = idle.as_secs(),
                session_duration_secs = lifetime.as_secs(),
                "Session timed out"
            );
            return Err(GateError::SessionExpired);
        }

        session.last_activity_at = now;
        Ok(())
    }

    /// Explicit logout: clear every field so the next request starts fresh.
    pub fn end_session(&self, slot: &mut SessionSlot) {
        if slot.session().is_some() {
            tracing::info!(target: "agentguard::session", "SESSION_TERMINATED");
        }
        *slot = SessionSlot::Uninitialized;
    }
}

// ============================================================================
// TESTS
// ============================================================================
