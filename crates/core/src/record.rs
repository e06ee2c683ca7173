// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request record state machine
//!
//! A record tracks one scheduled fetch (or write) of one key through one
//! operation. Only timestamps and flags are stored; the status is computed
//! from them and the current time on every call, so a status is never stale
//! across ticks.

use crate::key::ResourceKey;
use crate::requirement::Requirement;
use crate::state::{Payload, ResourceError, ResourceState};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Slack added past a timeout so the wake-up lands after it, not on it
const TIMEOUT_TICK: Duration = Duration::from_millis(1);

/// Scheduler-assigned identity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Derived lifecycle status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Nothing asks for this fetch
    Unnecessary,
    /// Will fire in the future
    Scheduled,
    /// Fire time has passed, not sent yet
    Overdue,
    /// Sent and still within its timeout
    InFlight,
    /// Sent, no answer within the timeout; eligible for a resend
    TimedOut,
    /// Answered successfully
    Complete,
    /// Answered with an error
    Failed,
}

impl RecordStatus {
    /// Waiting to be sent (or not needed at all)
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RecordStatus::Unnecessary | RecordStatus::Scheduled | RecordStatus::Overdue
        )
    }

    /// Sent and not answered yet
    pub fn is_outstanding(self) -> bool {
        matches!(self, RecordStatus::InFlight | RecordStatus::TimedOut)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Complete | RecordStatus::Failed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordStatus::Unnecessary => "unnecessary",
            RecordStatus::Scheduled => "scheduled",
            RecordStatus::Overdue => "overdue",
            RecordStatus::InFlight => "in_flight",
            RecordStatus::TimedOut => "timed_out",
            RecordStatus::Complete => "complete",
            RecordStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One scheduled, in-flight or finished request for a key
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub id: RecordId,
    pub key: ResourceKey,
    pub operation: String,
    payload: Option<Payload>,
    freshness: Option<Duration>,
    timeout: Duration,
    fire_at: Option<Instant>,
    requested_at: Option<Instant>,
    completed_at: Option<Instant>,
    error: Option<ResourceError>,
    attempts: u32,
}

/// When a requirement wants the next fetch, given what is cached
fn fire_time(requirement: &Requirement, state: Option<&ResourceState>, now: Instant) -> Option<Instant> {
    match state.and_then(|s| s.last_received) {
        None => Some(now),
        Some(received) => requirement
            .freshness
            .and_then(|freshness| received.checked_add(freshness)),
    }
}

impl RequestRecord {
    /// Record for a read driven by `requirement`
    pub fn new(
        id: RecordId,
        key: ResourceKey,
        operation: impl Into<String>,
        requirement: &Requirement,
        state: Option<&ResourceState>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            key,
            operation: operation.into(),
            payload: None,
            freshness: requirement.freshness,
            timeout: requirement.effective_timeout(),
            fire_at: fire_time(requirement, state, now),
            requested_at: None,
            completed_at: None,
            error: None,
            attempts: 0,
        }
    }

    /// Record for a write carrying `payload`; fires immediately
    pub fn mutation(
        id: RecordId,
        key: ResourceKey,
        operation: impl Into<String>,
        payload: Payload,
        now: Instant,
    ) -> Self {
        let mut record = Self::new(id, key, operation, &Requirement::new(), None, now);
        record.payload = Some(payload);
        record
    }

    pub fn status(&self, now: Instant) -> RecordStatus {
        if self.completed_at.is_some() {
            return if self.error.is_some() {
                RecordStatus::Failed
            } else {
                RecordStatus::Complete
            };
        }
        if let Some(requested) = self.requested_at {
            return if now.saturating_duration_since(requested) > self.timeout {
                RecordStatus::TimedOut
            } else {
                RecordStatus::InFlight
            };
        }
        match self.fire_at {
            None => RecordStatus::Unnecessary,
            Some(at) if at <= now => RecordStatus::Overdue,
            Some(_) => RecordStatus::Scheduled,
        }
    }

    /// Waiting to be sent and its fire time has come
    pub fn is_ready(&self, now: Instant) -> bool {
        matches!(
            self.status(now),
            RecordStatus::Scheduled | RecordStatus::Overdue
        ) && self.fire_at.is_some_and(|at| at <= now)
    }

    /// Fold a further requirement into a pending record.
    ///
    /// Moves the fire time earlier (never later) and tightens the timeout.
    /// Returns false when the record is not waiting to fire; the caller
    /// then needs a new record.
    pub fn append_requirement(
        &mut self,
        requirement: &Requirement,
        state: Option<&ResourceState>,
        now: Instant,
    ) -> bool {
        if !matches!(
            self.status(now),
            RecordStatus::Scheduled | RecordStatus::Overdue
        ) {
            return false;
        }

        if let Some(candidate) = fire_time(requirement, state, now) {
            if self.fire_at.map_or(true, |current| candidate < current) {
                self.fire_at = Some(candidate);
            }
        }
        if let Some(timeout) = requirement.timeout {
            self.timeout = self.timeout.min(timeout);
        }
        self.freshness = match (self.freshness, requirement.freshness) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        true
    }

    /// Shallow-merge payload fields. Returns false when nothing changed.
    pub fn append_data(&mut self, payload: &Payload) -> bool {
        let unchanged = payload.iter().all(|(field, value)| {
            self.payload.as_ref().and_then(|current| current.get(field)) == Some(value)
        });
        if unchanged {
            return false;
        }
        let current = self.payload.get_or_insert_with(Payload::new);
        for (field, value) in payload {
            current.insert(field.clone(), value.clone());
        }
        true
    }

    /// Record a send. Legal when ready, or when timed out (a resend).
    pub fn mark_sent(&mut self, now: Instant) -> bool {
        let resend = self.status(now) == RecordStatus::TimedOut;
        if !resend && !self.is_ready(now) {
            return false;
        }
        self.requested_at = Some(now);
        self.attempts += 1;
        true
    }

    pub fn mark_complete(&mut self, now: Instant) -> bool {
        if !self.status(now).is_outstanding() {
            return false;
        }
        self.completed_at = Some(now);
        true
    }

    pub fn mark_failed(&mut self, error: ResourceError, now: Instant) -> bool {
        if !self.status(now).is_outstanding() {
            return false;
        }
        self.completed_at = Some(now);
        self.error = Some(error);
        true
    }

    /// Recompute a pending read's fire time from a fresh receipt.
    ///
    /// A follow-up declared while a fetch for the same key was in flight is
    /// absorbed by that fetch this way.
    pub fn rebase(&mut self, received_at: Instant, now: Instant) -> bool {
        if self.payload.is_some() || !self.status(now).is_pending() {
            return false;
        }
        self.fire_at = self
            .freshness
            .and_then(|freshness| received_at.checked_add(freshness));
        true
    }

    /// Instant at which the scheduler should look at this record again
    pub fn wake_at(&self, now: Instant) -> Option<Instant> {
        match self.status(now) {
            RecordStatus::Scheduled | RecordStatus::Overdue => self.fire_at,
            // Timed out only once strictly past the timeout
            RecordStatus::InFlight => self
                .timeout
                .checked_add(TIMEOUT_TICK)
                .and_then(|span| self.requested_at?.checked_add(span)),
            RecordStatus::TimedOut => Some(now),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn fire_at(&self) -> Option<Instant> {
        self.fire_at
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn freshness(&self) -> Option<Duration> {
        self.freshness
    }

    pub fn requested_at(&self) -> Option<Instant> {
        self.requested_at
    }

    pub fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }

    pub fn error(&self) -> Option<&ResourceError> {
        self.error.as_ref()
    }

    /// Number of sends so far, the first one included
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
