// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request scheduler
//!
//! Owns every [`RequestRecord`] and the one armed timer. Each tick cleans up
//! finished records, sends ready ones grouped by operation, resends timed-out
//! ones and re-arms the timer for the next interesting instant.
//!
//! Sending is split in two: record bookkeeping (`mark_sent`,
//! `data_requested`) happens synchronously when the send method is called,
//! and the returned future only awaits the operation calls and settles their
//! results. The record lock is never held across an await or a listener call.

use crate::batch::{group_batches, Batch, BatchEntry};
use crate::error::SchedulerError;
use freshen_core::{
    Clock, DataEvents, FetchOutcome, Inspector, InspectorEvent, OperationResponse,
    OperationTable, Payload, RecordId, RecordStatus, RequestRecord, Requirement, ResourceError,
    ResourceKey, ResourceState, SchedulerConfig, Timer,
};
use futures::future::{join, join_all, BoxFuture};
use futures::FutureExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

/// Scheduler dependencies
pub struct SchedulerDeps<C, T> {
    pub clock: C,
    pub timer: T,
    pub config: SchedulerConfig,
    pub operations: OperationTable,
    pub events: Arc<dyn DataEvents>,
    pub inspector: Arc<dyn Inspector>,
}

/// Point-in-time view of one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub id: RecordId,
    pub key: ResourceKey,
    pub operation: String,
    pub status: RecordStatus,
    pub attempts: u32,
    pub fire_at: Option<Instant>,
    pub has_payload: bool,
}

impl RecordSnapshot {
    fn of(record: &RequestRecord, now: Instant) -> Self {
        Self {
            id: record.id,
            key: record.key.clone(),
            operation: record.operation.clone(),
            status: record.status(now),
            attempts: record.attempts(),
            fire_at: record.fire_at(),
            has_payload: record.payload().is_some(),
        }
    }
}

type Pair = (ResourceKey, String);

#[derive(Default)]
struct Records {
    next_id: u64,
    by_id: BTreeMap<RecordId, RequestRecord>,
}

impl Records {
    fn allocate(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId(self.next_id)
    }

    fn pending(&self, key: &ResourceKey, operation: &str, now: Instant) -> Option<(RecordId, RecordStatus)> {
        self.by_id.values().find_map(|record| {
            let status = record.status(now);
            (record.key == *key && record.operation == operation && status.is_pending())
                .then_some((record.id, status))
        })
    }

    fn outstanding_pairs(&self, now: Instant) -> HashSet<Pair> {
        self.by_id
            .values()
            .filter(|record| record.status(now).is_outstanding())
            .map(|record| (record.key.clone(), record.operation.clone()))
            .collect()
    }

    /// Ready records without an outstanding sibling
    fn ready_ids(&self, now: Instant) -> Vec<RecordId> {
        let outstanding = self.outstanding_pairs(now);
        self.by_id
            .values()
            .filter(|record| record.is_ready(now))
            .filter(|record| !outstanding.contains(&(record.key.clone(), record.operation.clone())))
            .map(|record| record.id)
            .collect()
    }

    fn with_status(&self, now: Instant, wanted: impl Fn(RecordStatus) -> bool) -> Vec<RequestRecord> {
        self.by_id
            .values()
            .filter(|record| wanted(record.status(now)))
            .cloned()
            .collect()
    }

    /// Fold a fresh receipt into the pending follow-up for the same pair
    fn rebase_pending(&mut self, key: &ResourceKey, operation: &str, now: Instant) {
        for record in self.by_id.values_mut() {
            if record.key == *key && record.operation == operation {
                record.rebase(now, now);
            }
        }
    }

    fn next_wake(&self, now: Instant) -> Option<Instant> {
        let outstanding = self.outstanding_pairs(now);
        self.by_id
            .values()
            // A blocked pending record waits on its sibling's deadline
            .filter(|record| {
                !(record.status(now).is_pending()
                    && outstanding.contains(&(record.key.clone(), record.operation.clone())))
            })
            .filter_map(|record| record.wake_at(now))
            .min()
    }
}

struct Inner<C: Clock, T: Timer> {
    clock: C,
    timer: T,
    config: SchedulerConfig,
    operations: OperationTable,
    events: Arc<dyn DataEvents>,
    inspector: Arc<dyn Inspector>,
    records: Mutex<Records>,
    armed: Mutex<Option<T::Handle>>,
}

/// Batching, deduplicating request scheduler
pub struct Scheduler<C: Clock, T: Timer> {
    inner: Arc<Inner<C, T>>,
}

impl<C: Clock, T: Timer> Clone for Scheduler<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock, T: Timer> Scheduler<C, T> {
    pub fn new(deps: SchedulerDeps<C, T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock: deps.clock,
                timer: deps.timer,
                config: deps.config,
                operations: deps.operations,
                events: deps.events,
                inspector: deps.inspector,
                records: Mutex::new(Records::default()),
                armed: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn clock(&self) -> &C {
        &self.inner.clock
    }

    fn lock_records(&self) -> MutexGuard<'_, Records> {
        self.inner.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn observe(&self, event: InspectorEvent) {
        self.inner.inspector.observe(&event);
    }

    fn require_operation(&self, operation: &str) -> Result<(), SchedulerError> {
        if self.inner.operations.contains(operation) {
            Ok(())
        } else {
            Err(SchedulerError::UnknownOperation(operation.to_string()))
        }
    }

    /// Schedule a fetch of `key` through `operation`, or fold the requirement
    /// into the pending record already waiting for it.
    ///
    /// Does not re-arm the timer; call [`Scheduler::update_delay`] once done
    /// scheduling.
    pub fn schedule_request(
        &self,
        requirement: &Requirement,
        state: Option<&ResourceState>,
        key: &ResourceKey,
        operation: &str,
        payload: Option<&Payload>,
        now: Instant,
    ) -> Result<RecordId, SchedulerError> {
        self.require_operation(operation)?;
        requirement.validate(key)?;

        let (id, event) = {
            let mut records = self.lock_records();
            let pending = records.pending(key, operation, now);

            let extended = match pending {
                Some((id, RecordStatus::Unnecessary)) => {
                    records.by_id.remove(&id);
                    None
                }
                Some((id, _)) => records.by_id.get_mut(&id).map(|record| {
                    record.append_requirement(requirement, state, now);
                    if let Some(payload) = payload {
                        record.append_data(payload);
                    }
                    id
                }),
                None => None,
            };

            match extended {
                Some(id) => (
                    id,
                    InspectorEvent::RequestExtended {
                        record: id,
                        key: key.clone(),
                    },
                ),
                None => {
                    let id = records.allocate();
                    let mut record =
                        RequestRecord::new(id, key.clone(), operation, requirement, state, now);
                    if let Some(payload) = payload {
                        record.append_data(payload);
                    }
                    records.by_id.insert(id, record);
                    (
                        id,
                        InspectorEvent::RequestScheduled {
                            record: id,
                            key: key.clone(),
                            operation: operation.to_string(),
                        },
                    )
                }
            }
        };

        self.observe(event);
        Ok(id)
    }

    /// Schedule a write of each payload to its key. Fires immediately.
    pub fn schedule_mutation_operation(
        &self,
        operation: &str,
        payload_by_key: BTreeMap<ResourceKey, Payload>,
        now: Instant,
    ) -> Result<Vec<RecordId>, SchedulerError> {
        self.require_operation(operation)?;

        let mut ids = Vec::with_capacity(payload_by_key.len());
        let mut events = Vec::with_capacity(payload_by_key.len());
        {
            let mut records = self.lock_records();
            for (key, payload) in payload_by_key {
                let pending = records.pending(&key, operation, now);
                let appended = match pending {
                    Some((id, RecordStatus::Scheduled | RecordStatus::Overdue)) => records
                        .by_id
                        .get_mut(&id)
                        .map(|record| {
                            record.append_data(&payload);
                            id
                        }),
                    Some((id, _)) => {
                        records.by_id.remove(&id);
                        None
                    }
                    None => None,
                };

                let id = match appended {
                    Some(id) => {
                        events.push(InspectorEvent::RequestExtended {
                            record: id,
                            key: key.clone(),
                        });
                        id
                    }
                    None => {
                        let id = records.allocate();
                        events.push(InspectorEvent::RequestScheduled {
                            record: id,
                            key: key.clone(),
                            operation: operation.to_string(),
                        });
                        records
                            .by_id
                            .insert(id, RequestRecord::mutation(id, key, operation, payload, now));
                        id
                    }
                };
                ids.push(id);
            }
        }

        for event in events {
            self.observe(event);
        }
        Ok(ids)
    }

    /// Records that would go out on a send at `now`
    pub fn ready_requests(&self, now: Instant) -> Vec<RequestRecord> {
        let records = self.lock_records();
        records
            .ready_ids(now)
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect()
    }

    /// Sent and unanswered records, timed out ones included
    pub fn in_flight_requests(&self, now: Instant) -> Vec<RequestRecord> {
        self.lock_records().with_status(now, RecordStatus::is_outstanding)
    }

    pub fn timed_out_requests(&self, now: Instant) -> Vec<RequestRecord> {
        self.lock_records()
            .with_status(now, |status| status == RecordStatus::TimedOut)
    }

    pub fn records(&self, now: Instant) -> Vec<RecordSnapshot> {
        self.lock_records()
            .by_id
            .values()
            .map(|record| RecordSnapshot::of(record, now))
            .collect()
    }

    /// Remove complete and failed records. Returns how many went.
    pub fn clean_up(&self, now: Instant) -> usize {
        let count = {
            let mut records = self.lock_records();
            let before = records.by_id.len();
            records
                .by_id
                .retain(|_, record| !record.status(now).is_terminal());
            before - records.by_id.len()
        };
        if count > 0 {
            self.observe(InspectorEvent::RecordsCleaned { count });
        }
        count
    }

    /// Send every ready record, one call per operation and key batch
    pub fn send_ready_requests(&self, now: Instant) -> BoxFuture<'static, Result<(), SchedulerError>> {
        let batches = {
            let mut records = self.lock_records();
            let mut entries = Vec::new();
            for id in records.ready_ids(now) {
                if let Some(record) = records.by_id.get_mut(&id) {
                    if record.mark_sent(now) {
                        entries.push((
                            record.operation.clone(),
                            BatchEntry {
                                id,
                                key: record.key.clone(),
                                payload: record.payload().cloned(),
                            },
                        ));
                    }
                }
            }
            group_batches(entries, self.inner.config.max_batch_size)
        };
        self.dispatch(batches, false, now)
    }

    /// Send timed-out records again, failing those past the resend cap
    pub fn resend_timeouts(&self, now: Instant) -> BoxFuture<'static, Result<(), SchedulerError>> {
        let mut exhausted = Vec::new();
        let batches = {
            let mut records = self.lock_records();
            let timed_out: Vec<RecordId> = records
                .by_id
                .values()
                .filter(|record| record.status(now) == RecordStatus::TimedOut)
                .map(|record| record.id)
                .collect();

            let mut entries = Vec::new();
            for id in timed_out {
                let Some(record) = records.by_id.get_mut(&id) else {
                    continue;
                };
                let attempts = record.attempts();
                if self.inner.config.allows_resend(attempts) {
                    if record.mark_sent(now) {
                        entries.push((
                            record.operation.clone(),
                            BatchEntry {
                                id,
                                key: record.key.clone(),
                                payload: record.payload().cloned(),
                            },
                        ));
                    }
                } else if record.mark_failed(ResourceError::Timeout { attempts }, now) {
                    exhausted.push((id, record.key.clone(), record.operation.clone(), attempts));
                }
            }
            for (_, key, operation, _) in &exhausted {
                records.rebase_pending(key, operation, now);
            }
            group_batches(entries, self.inner.config.max_batch_size)
        };

        for (id, key, _, attempts) in exhausted {
            tracing::warn!(record = %id, key = %key, attempts, "giving up after timeouts");
            let outcome = Err(ResourceError::Timeout { attempts });
            self.inner.events.data_received(&key, &outcome, now);
            self.observe(InspectorEvent::ResendsExhausted {
                record: id,
                key,
                attempts,
            });
        }

        self.dispatch(batches, true, now)
    }

    fn dispatch(
        &self,
        batches: Vec<Batch>,
        resend: bool,
        now: Instant,
    ) -> BoxFuture<'static, Result<(), SchedulerError>> {
        let mut calls: Vec<BoxFuture<'static, Result<(), SchedulerError>>> = Vec::new();

        for batch in batches {
            let keys = batch.keys();
            self.inner.events.data_requested(&keys, now);
            self.observe(InspectorEvent::BatchSent {
                operation: batch.operation.clone(),
                keys: keys.clone(),
                resend,
            });

            let Some(operation) = self.inner.operations.get(&batch.operation) else {
                let error = SchedulerError::UnknownOperation(batch.operation.clone());
                calls.push(futures::future::ready(Err(error)).boxed());
                continue;
            };
            let payload = batch.combined_payload();
            let scheduler = self.clone();

            calls.push(
                async move {
                    match operation.call(keys, payload).await {
                        Ok(response) => {
                            scheduler.settle_batch(&batch, response).await;
                            Ok(())
                        }
                        Err(source) => {
                            tracing::warn!(operation = %batch.operation, error = %source, "batch rejected");
                            scheduler.observe(InspectorEvent::BatchRejected {
                                operation: batch.operation.clone(),
                                error: source.to_string(),
                            });
                            Err(SchedulerError::Operation {
                                operation: batch.operation,
                                source,
                            })
                        }
                    }
                }
                .boxed(),
            );
        }

        async move {
            join_all(calls)
                .await
                .into_iter()
                .collect::<Result<Vec<()>, _>>()
                .map(|_| ())
        }
        .boxed()
    }

    async fn settle_batch(&self, batch: &Batch, response: OperationResponse) {
        match response {
            OperationResponse::Combined(mut outcomes) => {
                for entry in &batch.entries {
                    let outcome = outcomes
                        .remove(&entry.key)
                        .unwrap_or(Err(ResourceError::MissingResult));
                    self.settle(entry.id, &entry.key, outcome);
                }
                if !outcomes.is_empty() {
                    tracing::debug!(
                        operation = %batch.operation,
                        extra = outcomes.len(),
                        "ignoring results for keys outside the batch"
                    );
                }
            }
            OperationResponse::PerKey(mut futures) => {
                let pending = batch.entries.iter().map(|entry| {
                    let future = futures.remove(&entry.key);
                    async move {
                        let outcome = match future {
                            Some(future) => future.await,
                            None => Err(ResourceError::MissingResult),
                        };
                        self.settle(entry.id, &entry.key, outcome);
                    }
                });
                join_all(pending).await;
            }
        }
    }

    /// Deliver one key's outcome and close its record if still open
    fn settle(&self, id: RecordId, key: &ResourceKey, outcome: FetchOutcome) {
        let now = self.inner.clock.now();
        self.inner.events.data_received(key, &outcome, now);

        let event = {
            let mut records = self.lock_records();
            let settled = records.by_id.get_mut(&id).and_then(|record| {
                let event = match &outcome {
                    Ok(_) => record
                        .mark_complete(now)
                        .then(|| InspectorEvent::RecordCompleted {
                            record: id,
                            key: key.clone(),
                        }),
                    Err(error) => record.mark_failed(error.clone(), now).then(|| {
                        InspectorEvent::RecordFailed {
                            record: id,
                            key: key.clone(),
                            error: error.clone(),
                        }
                    }),
                };
                event.map(|event| (event, record.operation.clone()))
            });
            if let Some((_, operation)) = &settled {
                records.rebase_pending(key, operation, now);
            }
            settled.map(|(event, _)| event)
        };

        match event {
            Some(event) => self.observe(event),
            None => tracing::debug!(record = %id, key = %key, "late completion, state updated only"),
        }
        self.update_delay(now);
    }

    /// Re-arm the timer for the earliest record deadline
    ///
    /// Returns the armed delay, or `None` when nothing is scheduled.
    pub fn update_delay(&self, now: Instant) -> Option<Duration> {
        let delay = self
            .lock_records()
            .next_wake(now)
            .map(|at| at.saturating_duration_since(now));

        {
            let mut armed = self.inner.armed.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(handle) = armed.take() {
                self.inner.timer.clear_timer(handle);
            }
            if let Some(delay) = delay {
                *armed = Some(self.arm(delay));
            }
        }

        if let Some(delay) = delay {
            self.observe(InspectorEvent::TimerArmed { delay });
        }
        delay
    }

    fn arm(&self, delay: Duration) -> T::Handle {
        let weak: Weak<Inner<C, T>> = Arc::downgrade(&self.inner);
        self.inner.timer.set_timer(
            delay,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let tick = Scheduler { inner }.process_requests();
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(async move {
                            if let Err(e) = tick.await {
                                tracing::warn!(error = %e, "scheduled send failed");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "no runtime to send scheduled requests"),
                }
            }),
        )
    }

    /// One tick: clean up, send ready, resend timed out, re-arm
    pub fn process_requests(&self) -> BoxFuture<'static, Result<(), SchedulerError>> {
        let now = self.inner.clock.now();
        self.clean_up(now);
        let sent = self.send_ready_requests(now);
        let resent = self.resend_timeouts(now);
        self.update_delay(now);

        async move {
            let (sent, resent) = join(sent, resent).await;
            sent.and(resent)
        }
        .boxed()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
