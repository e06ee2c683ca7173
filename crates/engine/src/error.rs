// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler and client

use freshen_core::{ConfigError, OperationError, RequirementError};
use thiserror::Error;

/// Errors from scheduling and sending requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("operation {operation} failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: OperationError,
    },
    #[error("invalid requirement: {0}")]
    Requirement(#[from] RequirementError),
}

/// Errors surfaced by the client façade
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid requirement: {0}")]
    Requirement(#[from] RequirementError),
}
