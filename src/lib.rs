// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! agentguard - session-security gateway for interactive LLM assistants
//!
//! Sits between a chat front-end and the agent pipeline. Each message is
//! checked against the user's session before anything is forwarded:
//!
//! **Session guard** -> **Rate limiter** -> **Sanitizer** -> pipeline
//!
//! # Core Modules
//!
//! - [`security`] - Session store, guard, rate limiter, sanitizer, PII masker, gateway
//! - [`app`] - Assistant loop wiring the gateway to an agent pipeline
//! - [`logging`] - PII-masked log sinks and tracing setup
//! - [`config`] - Gateway configuration (`~/.agentguard/config.json`)
//! - [`clock`] - Injectable time sources
//! - [`errors`] - Gate rejection types

pub mod app;
pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod security;

pub use app::{AgentPipeline, AppError, AssistantApp, EchoPipeline};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{load_config, save_config, GatewayConfig};
pub use errors::{generate_reference_code, GateError};
pub use logging::{init_tracing, FileSink, LogLevel, LogSink, SecureLogger, TracingSink};
pub use security::{
    mask_pii, sanitize, sanitize_bytes, RateLimiter, SecurityGateway, Session, SessionGuard,
    SessionSlot, SessionState, SessionStore, SweepStats,
};
