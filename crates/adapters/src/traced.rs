// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced wrappers for consistent observability

use async_trait::async_trait;
use freshen_core::{
    Inspector, InspectorEvent, Operation, OperationError, OperationResponse, Payload,
    ResourceKey, TracedEvent,
};
use tracing::Instrument;

/// Wrapper that adds tracing to any Operation
#[derive(Clone)]
pub struct TracedOperation<O> {
    name: String,
    inner: O,
}

impl<O> TracedOperation<O> {
    pub fn new(name: impl Into<String>, inner: O) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

#[async_trait]
impl<O: Operation> Operation for TracedOperation<O> {
    async fn call(
        &self,
        keys: Vec<ResourceKey>,
        payload: Option<Payload>,
    ) -> Result<OperationResponse, OperationError> {
        let span = tracing::info_span!("operation.call", operation = %self.name, keys = keys.len());

        async move {
            tracing::info!(
                first_key = ?keys.first(),
                has_payload = payload.is_some(),
                "calling"
            );

            let start = std::time::Instant::now();
            let result = self.inner.call(keys, payload).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(OperationResponse::Combined(outcomes)) => tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    ok = outcomes.values().filter(|o| o.is_ok()).count(),
                    failed = outcomes.values().filter(|o| o.is_err()).count(),
                    "answered"
                ),
                Ok(OperationResponse::PerKey(futures)) => tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    pending = futures.len(),
                    "answered per key"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "call failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Inspector that writes scheduler activity to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingInspector;

impl TracingInspector {
    pub fn new() -> Self {
        Self
    }
}

impl Inspector for TracingInspector {
    fn observe(&self, event: &InspectorEvent) {
        let name = event.name();
        let fields = event.fields();
        match event {
            InspectorEvent::BatchRejected { .. }
            | InspectorEvent::RecordFailed { .. }
            | InspectorEvent::ResendsExhausted { .. } => {
                tracing::warn!(event = name, ?fields, "scheduler")
            }
            InspectorEvent::TimerArmed { .. } => tracing::trace!(event = name, ?fields, "scheduler"),
            _ => tracing::debug!(event = name, ?fields, "scheduler"),
        }
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
