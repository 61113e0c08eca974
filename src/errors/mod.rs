// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gate rejection types.
//!
//! Every way a message can fail to pass the gateway is a [`GateError`]
//! variant. Three of them are ordinary, user-facing conditions the caller is
//! expected to render and move on from:
//!
//! - [`GateError::SessionExpired`]: recovered by simply sending again, which
//!   starts a fresh session
//! - [`GateError::RateLimitExceeded`]: recovered once the window elapses
//! - [`GateError::InvalidInput`]: recovered by rephrasing
//!
//! [`GateError::Internal`] is reserved for malformed state. It never carries
//! internal detail to the user, only a reference code that matches the
//! critical log line written when it was created.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::security::pii::mask_pii;

// =============================================================================
// ERROR REFERENCE CODE GENERATION
// =============================================================================

/// Generate a unique error reference code.
/// Format: ERR-YYYYMMDD-XXXXXX (e.g., ERR-20240115-A3F8K2)
pub fn generate_reference_code() -> String {
    let date = Utc::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789".chars().collect();
    let random: String = (0..6)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect();
    format!("ERR-{}-{}", date, random)
}

// =============================================================================
// GATE ERRORS
// =============================================================================

/// Reason a message was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GateError {
    /// The session was idle longer than the configured timeout and has been
    /// cleared.
    #[error("session expired")]
    SessionExpired,

    /// Too many requests in the current rate-limit window.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// The message tripped the sanitizer heuristics.
    #[error("invalid input")]
    InvalidInput,

    /// Unexpected internal failure. Details are in the log under `reference`.
    #[error("internal error (reference {reference})")]
    Internal { reference: String },
}

impl GateError {
    /// Build an [`GateError::Internal`], logging the (masked) detail at
    /// critical severity under a fresh reference code.
    pub fn internal(detail: &str) -> Self {
        let reference = generate_reference_code();
        tracing::error!(
            target: "agentguard::errors",
            critical = true,
            reference = %reference,
            internal_error = %mask_pii(detail),
            "Internal gateway failure"
        );
        Self::Internal { reference }
    }

    /// Stable machine-readable reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            GateError::SessionExpired => "session_expired",
            GateError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            GateError::InvalidInput => "invalid_input",
            GateError::Internal { .. } => "internal_error",
        }
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            GateError::SessionExpired => String::from(
                "Your session has expired. Send your message again to start a new session.",
            ),
            GateError::RateLimitExceeded { retry_after_secs } => format!(
                "Rate limit exceeded. Please wait {} seconds before trying again.",
                retry_after_secs
            ),
            GateError::InvalidInput => String::from(
                "Your message contains disallowed content. Please rephrase and try again.",
            ),
            GateError::Internal { reference } => {
                format!("An internal error occurred. Reference: {}", reference)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
