// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key isolation of whole-call failures

use async_trait::async_trait;
use freshen_core::{
    Operation, OperationError, OperationResponse, Payload, ResourceError, ResourceKey,
};

/// Turns a failed call into one [`ResourceError::Operation`] per key
///
/// Without this wrapper a failed call rejects the whole batch and its records
/// wait for the timeout path. Wrapped, every key settles right away with the
/// error stored in its state.
#[derive(Clone)]
pub struct IsolatedOperation<O> {
    name: String,
    inner: O,
}

impl<O> IsolatedOperation<O> {
    pub fn new(name: impl Into<String>, inner: O) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

#[async_trait]
impl<O: Operation> Operation for IsolatedOperation<O> {
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError> {
        match self.inner.call(keys.clone(), payload).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(operation = %self.name, error = %e, keys = keys.len(), "isolating failed call");
                let message = e.to_string();
                Ok(OperationResponse::combined(keys.into_iter().map(|key| {
                    let error = ResourceError::Operation {
                        operation: self.name.clone(),
                        message: message.clone(),
                    };
                    (key, Err(error))
                })))
            }
        }
    }
}

#[cfg(test)]
#[path = "isolated_tests.rs"]
mod tests;
