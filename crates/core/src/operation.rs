// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named fetch operations
//!
//! An operation receives a sorted batch of keys plus the combined payload of
//! the records in the batch and answers either with one map of outcomes or
//! with one future per key.

use crate::key::ResourceKey;
use crate::state::{FetchOutcome, Payload};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure of an operation call as a whole
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Answer to one operation call
pub enum OperationResponse {
    /// Every outcome arrives at once
    Combined(HashMap<ResourceKey, FetchOutcome>),
    /// Each key resolves on its own
    PerKey(HashMap<ResourceKey, BoxFuture<'static, FetchOutcome>>),
}

impl OperationResponse {
    pub fn combined(outcomes: impl IntoIterator<Item = (ResourceKey, FetchOutcome)>) -> Self {
        OperationResponse::Combined(outcomes.into_iter().collect())
    }
}

impl fmt::Debug for OperationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationResponse::Combined(outcomes) => {
                f.debug_tuple("Combined").field(outcomes).finish()
            }
            OperationResponse::PerKey(futures) => {
                let keys: Vec<_> = futures.keys().collect();
                f.debug_tuple("PerKey").field(&keys).finish()
            }
        }
    }
}

/// Transport-facing function behind an operation name
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// `payload` maps each key's canonical string to that key's payload and
    /// is `None` when no record in the batch carries one.
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError>;
}

#[async_trait]
impl<O: Operation + ?Sized> Operation for Arc<O> {
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError> {
        (**self).call(keys, payload).await
    }
}

/// Operations available to a scheduler, by name
#[derive(Clone, Default)]
pub struct OperationTable {
    operations: BTreeMap<String, Arc<dyn Operation>>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, operation: impl Operation) -> Self {
        self.register(name, operation);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, operation: impl Operation) {
        self.operations.insert(name.into(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
