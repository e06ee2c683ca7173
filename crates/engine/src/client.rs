// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client façade
//!
//! Consumers read cached data through selectors and declare requirements as
//! a side effect. The client reduces every consumer's declarations into one
//! requirement map, asks the update calculator which keys are due, and hands
//! those to the scheduler as reads.

use crate::error::{ClientError, SchedulerError};
use crate::scheduler::{RecordSnapshot, Scheduler, SchedulerDeps};
use crate::store::CacheStore;
use freshen_adapters::{TokioTimer, TracingInspector};
use freshen_core::{
    calculate_updates, Clock, ConsumerId, ConsumerRequirements, Inspector, InspectorEvent,
    OperationTable, Payload, RecordId, Requirement, RequirementMap, ResourceKey, ResourceState,
    SchedulerConfig, StateMap, SystemClock, Timer, Updates,
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

/// Client dependencies
pub struct ClientDeps<C, T> {
    pub clock: C,
    pub timer: T,
    pub config: SchedulerConfig,
    pub operations: OperationTable,
    pub inspector: Arc<dyn Inspector>,
}

/// What a selector sees: cached state plus a way to declare requirements
pub struct Selection<'a> {
    state: &'a StateMap,
    required: RequirementMap,
}

impl<'a> Selection<'a> {
    fn new(state: &'a StateMap) -> Self {
        Self {
            state,
            required: RequirementMap::new(),
        }
    }

    pub fn get_data(&self, key: &ResourceKey) -> Option<&'a Value> {
        self.state.get(key).and_then(|state| state.data.as_ref())
    }

    pub fn state(&self, key: &ResourceKey) -> Option<&'a ResourceState> {
        self.state.get(key)
    }

    /// Declare `requirement` for `key` and read its cached data
    pub fn require_data(&mut self, requirement: Requirement, key: &ResourceKey) -> Option<&'a Value> {
        self.required = self.required.merge_for_keys([key], &requirement);
        self.get_data(key)
    }

    /// Everything declared so far in this pass
    pub fn requirements(&self) -> &RequirementMap {
        &self.required
    }
}

struct ClientInner<C: Clock, T: Timer> {
    clock: C,
    timer: T,
    config: SchedulerConfig,
    scheduler: Scheduler<C, T>,
    store: Arc<CacheStore>,
    inspector: Arc<dyn Inspector>,
    consumers: Mutex<ConsumerRequirements>,
    requirements: Mutex<RequirementMap>,
    check: Mutex<Option<T::Handle>>,
}

/// Entry point for consumers of cached remote data
pub struct Client<C: Clock, T: Timer> {
    inner: Arc<ClientInner<C, T>>,
}

impl<C: Clock, T: Timer> Clone for Client<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client<SystemClock, TokioTimer> {
    /// Client on the system clock and tokio timers, logging through tracing
    pub fn with_tokio(
        config: SchedulerConfig,
        operations: OperationTable,
    ) -> Result<Self, ClientError> {
        Self::new(ClientDeps {
            clock: SystemClock,
            timer: TokioTimer,
            config,
            operations,
            inspector: Arc::new(TracingInspector),
        })
    }
}

impl<C: Clock, T: Timer> Client<C, T> {
    pub fn new(deps: ClientDeps<C, T>) -> Result<Self, ClientError> {
        deps.config.validate()?;
        if !deps.operations.contains(&deps.config.read_operation) {
            return Err(SchedulerError::UnknownOperation(deps.config.read_operation.clone()).into());
        }

        let store = Arc::new(CacheStore::new());
        let scheduler = Scheduler::new(SchedulerDeps {
            clock: deps.clock.clone(),
            timer: deps.timer.clone(),
            config: deps.config.clone(),
            operations: deps.operations,
            events: store.clone(),
            inspector: Arc::clone(&deps.inspector),
        });

        tracing::debug!(read_operation = %deps.config.read_operation, "client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                clock: deps.clock,
                timer: deps.timer,
                config: deps.config,
                scheduler,
                store,
                inspector: deps.inspector,
                consumers: Mutex::new(ConsumerRequirements::new()),
                requirements: Mutex::new(RequirementMap::new()),
                check: Mutex::new(None),
            }),
        })
    }

    pub fn scheduler(&self) -> &Scheduler<C, T> {
        &self.inner.scheduler
    }

    pub fn state(&self) -> Arc<StateMap> {
        self.inner.store.snapshot()
    }

    pub fn get_data(&self, key: &ResourceKey) -> Option<Value> {
        self.state().get(key).and_then(|state| state.data.clone())
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<StateMap>> {
        self.inner.store.subscribe()
    }

    /// Effective requirements across all consumers
    pub fn requirements(&self) -> RequirementMap {
        self.lock_requirements().clone()
    }

    pub fn records(&self) -> Vec<RecordSnapshot> {
        self.inner.scheduler.records(self.inner.clock.now())
    }

    fn lock_requirements(&self) -> MutexGuard<'_, RequirementMap> {
        self.inner
            .requirements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lock_consumers(&self) -> MutexGuard<'_, ConsumerRequirements> {
        self.inner.consumers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a selector for `consumer`
    ///
    /// The requirements it declares replace the consumer's previous ones.
    pub fn select<R>(
        &self,
        consumer: &ConsumerId,
        selector: impl FnOnce(&mut Selection<'_>) -> R,
    ) -> Result<R, ClientError> {
        let snapshot = self.state();
        let mut selection = Selection::new(&snapshot);
        let value = selector(&mut selection);

        let declared = selection
            .required
            .iter()
            .map(|(key, requirement)| (key.clone(), *requirement));
        let changed = self.lock_consumers().replace(consumer, declared)?;
        if changed {
            self.refresh_requirements()?;
        }
        Ok(value)
    }

    /// Add one requirement for `consumer` without running a selector
    pub fn require(
        &self,
        consumer: &ConsumerId,
        key: &ResourceKey,
        requirement: Requirement,
    ) -> Result<(), ClientError> {
        self.lock_consumers().declare(consumer, key, &requirement)?;
        self.refresh_requirements()
    }

    /// Drop every requirement `consumer` declared
    pub fn release(&self, consumer: &ConsumerId) -> Result<bool, ClientError> {
        let released = self.lock_consumers().release(consumer);
        if released {
            self.refresh_requirements()?;
        }
        Ok(released)
    }

    fn refresh_requirements(&self) -> Result<(), ClientError> {
        let reduced = self.lock_consumers().reduce();
        let keys = reduced.len();
        let changed = {
            let mut current = self.lock_requirements();
            let changed = **current != *reduced;
            if changed {
                *current = reduced;
            }
            changed
        };

        if changed {
            self.inner
                .inspector
                .observe(&InspectorEvent::RequirementsChanged { keys });
            self.revalidate()?;
        }
        Ok(())
    }

    /// Write each payload to its key through `operation`
    pub fn mutate(
        &self,
        operation: &str,
        payload_by_key: BTreeMap<ResourceKey, Payload>,
    ) -> Result<Vec<RecordId>, ClientError> {
        let now = self.inner.clock.now();
        let ids = self
            .inner
            .scheduler
            .schedule_mutation_operation(operation, payload_by_key, now)?;
        self.inner.scheduler.update_delay(now);
        Ok(ids)
    }

    /// Schedule reads for every due key and re-arm the check timer
    pub fn revalidate(&self) -> Result<Updates, ClientError> {
        let now = self.inner.clock.now();
        let requirements = self.requirements();
        let states = self.state();
        let updates = calculate_updates(&requirements, &states, now, self.inner.config.check_bounds());

        for key in &updates.due_keys {
            if let Some(requirement) = requirements.get(key) {
                self.inner.scheduler.schedule_request(
                    requirement,
                    states.get(key),
                    key,
                    &self.inner.config.read_operation,
                    None,
                    now,
                )?;
            }
        }

        if !updates.due_keys.is_empty() {
            tracing::debug!(due = updates.due_keys.len(), "scheduled due keys");
        }
        self.inner.scheduler.update_delay(now);
        self.arm_check(updates.next_check_delay);
        Ok(updates)
    }

    fn arm_check(&self, delay: Duration) {
        let weak: Weak<ClientInner<C, T>> = Arc::downgrade(&self.inner);
        let mut check = self.inner.check.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = check.take() {
            self.inner.timer.clear_timer(handle);
        }
        *check = Some(self.inner.timer.set_timer(
            delay,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = (Client { inner }).revalidate() {
                    tracing::error!(error = %e, "revalidation failed");
                }
            }),
        ));
    }

    /// Run one scheduler tick now
    pub fn process_requests(&self) -> BoxFuture<'static, Result<(), SchedulerError>> {
        self.inner.scheduler.process_requests()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
