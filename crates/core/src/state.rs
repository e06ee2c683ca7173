// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cached resource state
//!
//! State changes only through two events: a request being sent and a
//! response being received.

use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;

/// Payload carried by write-style operations
pub type Payload = serde_json::Map<String, Value>;

/// Result reported for one key
pub type FetchOutcome = Result<Value, ResourceError>;

/// Cached state by key
pub type StateMap = HashMap<ResourceKey, ResourceState>;

/// Structured per-key failure, stored in state and shown to consumers
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceError {
    /// The transport reported an error for this key
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The operation as a whole failed and the failure was spread to its keys
    #[error("operation {operation} failed: {message}")]
    Operation { operation: String, message: String },
    /// The operation answered but left this key out
    #[error("no result returned for key")]
    MissingResult,
    /// Every allowed send timed out
    #[error("timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl ResourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        ResourceError::Transport {
            message: message.into(),
        }
    }
}

/// What the client knows about one key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    pub last_requested: Option<Instant>,
    pub last_received: Option<Instant>,
    pub data: Option<Value>,
    pub error: Option<ResourceError>,
}

impl ResourceState {
    /// A request for this key went out
    pub fn record_requested(&mut self, at: Instant) {
        self.last_requested = Some(at);
    }

    /// A response for this key came back
    ///
    /// Successful data clears a previous error; an error keeps the last good
    /// data so consumers can keep showing it.
    pub fn record_received(&mut self, outcome: &FetchOutcome, at: Instant) {
        self.last_received = Some(at);
        match outcome {
            Ok(data) => {
                self.data = Some(data.clone());
                self.error = None;
            }
            Err(error) => {
                self.error = Some(error.clone());
            }
        }
    }

    pub fn is_in_flight(&self) -> bool {
        crate::clock::is_earlier(self.last_received, self.last_requested)
    }
}
