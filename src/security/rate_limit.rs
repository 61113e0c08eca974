// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed-window request limiting per session.
//!
//! The window opens with the first request and lasts `window`. A request
//! arriving exactly `window` after it opened still counts against it; only a
//! strictly later request opens a new one.

use std::time::{Duration, Instant};

use super::session::Session;
use crate::errors::GateError;

/// Default rate-limit window: 1 minute.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Default maximum requests per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Caps how many requests a session may make per window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count this request against the session's window.
    ///
    /// A rejected request is not counted.
    pub fn admit(&self, session: &mut Session, now: Instant) -> Result<(), GateError> {
        let Some(window_start) = session.window_start else {
            self.open_window(session, now);
            return Ok(());
        };

        let elapsed = now.checked_duration_since(window_start).ok_or_else(|| {
            GateError::internal("rate-limit window_start is later than the current time")
        })?;

        if elapsed > self.window {
            self.open_window(session, now);
            return Ok(());
        }

        if session.request_count >= self.max_requests {
            let retry_after = self.window - elapsed;
            tracing::warn!(
                target: "agentguard::rate_limit",
                request_count = session.request_count,
                max_requests = self.max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            return Err(GateError::RateLimitExceeded {
                retry_after_secs: ceil_secs(retry_after),
            });
        }

        session.request_count += 1;
        Ok(())
    }

    fn open_window(&self, session: &mut Session, now: Instant) {
        session.window_start = Some(now);
        session.request_count = 1;
    }
}

/// Whole seconds, rounded up.
fn ceil_secs(d: Duration) -> u64 {
    if d.subsec_nanos() > 0 {
        d.as_secs() + 1
    } else {
        d.as_secs()
    }
}

// ============================================================================
// TESTS
// ============================================================================
