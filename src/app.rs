// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Assistant front-end loop.
//!
//! [`AssistantApp`] is the glue between the host UI and the agent pipeline:
//! it gates each message through the [`SecurityGateway`], requires a selected
//! use case, hands the sanitized message to the [`AgentPipeline`] and records
//! the outcome through the masked logger. Building and running the agent
//! graph itself is the pipeline's business.

use std::time::Instant;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::errors::GateError;
use crate::security::SecurityGateway;

/// External agent/model pipeline.
pub trait AgentPipeline {
    /// Run the pipeline for `use_case` on an already-sanitized message.
    fn run(&self, use_case: &str, message: &str) -> anyhow::Result<String>;
}

/// Pipeline that returns the message unchanged. Used by the CLI to show what
/// would be forwarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoPipeline;

impl AgentPipeline for EchoPipeline {
    fn run(&self, _use_case: &str, message: &str) -> anyhow::Result<String> {
        Ok(message.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rejected(#[from] GateError),

    #[error("no use case selected")]
    MissingUseCase,

    #[error("pipeline failed: {0}")]
    Pipeline(String),
}

impl AppError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Rejected(e) => e.user_message(),
            AppError::MissingUseCase => "Error: No use case selected".to_string(),
            AppError::Pipeline(_) => "Error: Processing failed. Please try again.".to_string(),
        }
    }
}

pub struct AssistantApp<P: AgentPipeline, C: Clock = SystemClock> {
    gateway: SecurityGateway<C>,
    pipeline: P,
}

impl<P: AgentPipeline, C: Clock> AssistantApp<P, C> {
    pub fn new(gateway: SecurityGateway<C>, pipeline: P) -> Self {
        Self { gateway, pipeline }
    }

    pub fn gateway(&self) -> &SecurityGateway<C> {
        &self.gateway
    }

    /// Handle one user message at the gateway clock's current time.
    pub fn handle_message(
        &self,
        session_id: &str,
        use_case: Option<&str>,
        message: &str,
    ) -> Result<String, AppError> {
        let sanitized = self.gateway.admit_now(session_id, message)?;
        self.dispatch(use_case, &sanitized)
    }

    pub fn handle_message_at(
        &self,
        session_id: &str,
        use_case: Option<&str>,
        message: &str,
        now: Instant,
    ) -> Result<String, AppError> {
        let sanitized = self.gateway.admit(session_id, message, now)?;
        self.dispatch(use_case, &sanitized)
    }

    fn dispatch(&self, use_case: Option<&str>, sanitized: &str) -> Result<String, AppError> {
        let logger = self.gateway.logger();

        let use_case = match use_case.map(str::trim).filter(|u| !u.is_empty()) {
            Some(use_case) => use_case,
            None => {
                logger.error("No use case selected");
                return Err(AppError::MissingUseCase);
            }
        };

        match self.pipeline.run(use_case, sanitized) {
            Ok(response) => {
                logger.info(&format!("Successfully processed message: {}", sanitized));
                Ok(response)
            }
            Err(e) => {
                let detail = format!("{:#}", e);
                logger.error(&format!("Pipeline failed: {}", detail));
                Err(AppError::Pipeline(detail))
            }
        }
    }
}
