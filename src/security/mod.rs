// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session security layer.
//!
//! Every inbound user message passes through [`SecurityGateway::admit`],
//! which applies, in order:
//!
//! - **Session guard**: expires sessions idle longer than 30 minutes
//! - **Rate limiter**: at most 100 requests per 60-second window
//! - **Sanitizer**: strips `< > " '` and rejects SQL verbs
//!
//! Rejections are logged through the PII masker before they reach any sink.
//!
//! ## Usage
//!
//! ```
//! use agentguard::config::GatewayConfig;
//! use agentguard::security::SecurityGateway;
//! use agentguard::GateError;
//!
//! let gateway = SecurityGateway::new(&GatewayConfig::default());
//!
//! assert_eq!(gateway.admit_now("s1", "Hello <b>world</b>").unwrap(), "Hello bworld/b");
//! assert_eq!(gateway.admit_now("s1", "What is DROP TABLE?"), Err(GateError::InvalidInput));
//! ```

pub mod gateway;
pub mod guard;
pub mod locks;
pub mod pii;
pub mod rate_limit;
pub mod sanitizer;
pub mod session;

pub use gateway::SecurityGateway;
pub use guard::{SessionGuard, DEFAULT_SESSION_TIMEOUT};
pub use locks::{resilient_lock, resilient_read, resilient_write};
pub use pii::{contains_pii, mask_pii, REDACTED};
pub use rate_limit::{RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW};
pub use sanitizer::{sanitize, sanitize_bytes, STRIPPED_CHARS, SUSPICIOUS_KEYWORDS};
pub use session::{
    generate_session_id, Session, SessionSlot, SessionState, SessionStore, SweepStats,
};
