// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Security gateway: the single admission point for user messages.
//!
//! ```text
//! admit(session_id, raw, now)
//!   │
//!   ├─ SessionGuard::ensure_active   ── SessionExpired / Internal
//!   ├─ RateLimiter::admit            ── RateLimitExceeded / Internal
//!   └─ sanitize                      ── InvalidInput
//!   │
//!   └─ Ok(sanitized message)
//! ```
//!
//! Guard and rate limiter run under the session's slot lock, in that order.
//! The first failure short-circuits. Every rejection is written through the
//! [`SecureLogger`] (PII-masked) before it is returned.

use std::sync::Arc;
use std::time::Instant;

use super::guard::SessionGuard;
use super::rate_limit::RateLimiter;
use super::sanitizer::{sanitize, sanitize_bytes};
use super::session::{SessionState, SessionStore, SweepStats};
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::errors::GateError;
use crate::logging::{LogLevel, SecureLogger};

pub struct SecurityGateway<C: Clock = SystemClock> {
    store: Arc<SessionStore>,
    guard: SessionGuard,
    limiter: RateLimiter,
    logger: SecureLogger,
    clock: C,
}

impl SecurityGateway<SystemClock> {
    /// Gateway reading the system clock, with an empty store and a
    /// tracing-only logger.
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl Default for SecurityGateway<SystemClock> {
    fn default() -> Self {
        Self::new(&GatewayConfig::default())
    }
}

impl<C: Clock> SecurityGateway<C> {
    pub fn with_clock(config: &GatewayConfig, clock: C) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            guard: SessionGuard::new(config.session_timeout()),
            limiter: RateLimiter::new(config.rate_limit_window(), config.max_requests),
            logger: SecureLogger::default(),
            clock,
        }
    }

    pub fn with_logger(mut self, logger: SecureLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Share a session store with other gateways (e.g. one per worker).
    pub fn with_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn logger(&self) -> &SecureLogger {
        &self.logger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Admit a message for `session_id` at `now`.
    ///
    /// Returns the sanitized message, or the first check that rejected it.
    /// A `now` earlier than the session's recorded activity is an internal
    /// error; use [`admit_now`](Self::admit_now) when several threads may
    /// share a session.
    pub fn admit(
        &self,
        session_id: &str,
        raw_message: &str,
        now: Instant,
    ) -> Result<String, GateError> {
        self.admit_with(session_id, raw_message, || now, || sanitize(raw_message))
    }

    /// [`admit`](Self::admit) at the gateway clock's current time.
    ///
    /// The clock is read while the session's slot is locked, so concurrent
    /// requests on one session always observe non-decreasing times.
    pub fn admit_now(&self, session_id: &str, raw_message: &str) -> Result<String, GateError> {
        self.admit_with(session_id, raw_message, || self.clock.now(), || sanitize(raw_message))
    }

    /// Admit raw bytes. Anything that is not UTF-8 text is `InvalidInput`.
    pub fn admit_bytes(
        &self,
        session_id: &str,
        raw_message: &[u8],
        now: Instant,
    ) -> Result<String, GateError> {
        let preview = String::from_utf8_lossy(raw_message);
        self.admit_with(session_id, &preview, || now, || sanitize_bytes(raw_message))
    }

    /// Explicit logout. The next request for `session_id` starts a new
    /// session.
    pub fn logout(&self, session_id: &str) {
        self.store.with_slot(session_id, |slot| self.guard.end_session(slot));
        self.logger.info(&format!("Session logged out: session={}", session_id));
    }

    pub fn session_state(&self, session_id: &str) -> SessionState {
        self.store.snapshot(session_id).state()
    }

    /// Sweep the store at the gateway clock's current time. Sessions idle
    /// past the session timeout are evicted and empty slots are dropped.
    pub fn purge_expired(&self) -> SweepStats {
        self.purge_expired_at(self.clock.now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> SweepStats {
        self.store.purge_expired(now, self.guard.session_timeout())
    }

    fn admit_with(
        &self,
        session_id: &str,
        raw_preview: &str,
        now: impl FnOnce() -> Instant,
        sanitize: impl FnOnce() -> Option<String>,
    ) -> Result<String, GateError> {
        let result = self
            .check_session(session_id, now)
            .and_then(|()| sanitize().ok_or(GateError::InvalidInput));

        match &result {
            Ok(_) => tracing::debug!(
                target: "agentguard::gateway",
                session = %session_id,
                "Message admitted"
            ),
            Err(e) => self.record_rejection(session_id, raw_preview, e),
        }
        result
    }

    fn check_session(
        &self,
        session_id: &str,
        now: impl FnOnce() -> Instant,
    ) -> Result<(), GateError> {
        self.store.with_slot(session_id, |slot| {
            let now = now();
            self.guard.ensure_active(slot, now)?;
            let session = slot
                .session_mut()
                .ok_or_else(|| GateError::internal("session slot empty after guard check"))?;
            self.limiter.admit(session, now)
        })
    }

    fn record_rejection(&self, session_id: &str, raw_preview: &str, error: &GateError) {
        let (level, message) = match error {
            GateError::SessionExpired => (
                LogLevel::Info,
                format!("Session timed out: session={}", session_id),
            ),
            GateError::RateLimitExceeded { retry_after_secs } => (
                LogLevel::Warning,
                format!(
                    "Rate limit exceeded: session={} retry_after={}s",
                    session_id, retry_after_secs
                ),
            ),
            GateError::InvalidInput => (
                LogLevel::Warning,
                format!("Rejected input: session={} input={}", session_id, raw_preview),
            ),
            GateError::Internal { reference } => (
                LogLevel::Critical,
                format!("Internal failure: session={} reference={}", session_id, reference),
            ),
        };
        self.logger.log_secure(level, &message);
    }
}

// ============================================================================
// TESTS
// ============================================================================
