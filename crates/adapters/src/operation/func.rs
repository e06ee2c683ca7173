// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation backed by a closure

use async_trait::async_trait;
use freshen_core::{Operation, OperationError, OperationResponse, Payload, ResourceKey};
use std::future::Future;

/// Adapts an async closure into an [`Operation`]
#[derive(Clone)]
pub struct FnOperation<F> {
    f: F,
}

impl<F, Fut> FnOperation<F>
where
    F: Fn(Vec<ResourceKey>, Option<Payload>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OperationResponse, OperationError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn(Vec<ResourceKey>, Option<Payload>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OperationResponse, OperationError>> + Send + 'static,
{
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError> {
        (self.f)(keys, payload).await
    }
}
