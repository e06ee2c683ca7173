// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update calculation
//!
//! Pure function deciding which keys need a fetch now and how long until
//! the next check is worthwhile.

use crate::clock::is_earlier;
use crate::key::ResourceKey;
use crate::requirement::{Requirement, RequirementMap};
use crate::state::{ResourceState, StateMap};
use std::time::{Duration, Instant};

/// Bounds applied to the next check delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckBounds {
    /// Never check sooner than this
    pub min: Duration,
    /// Check at least this often, and this often when nothing is required
    pub max: Duration,
}

impl Default for CheckBounds {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_secs(300),
        }
    }
}

/// Result of [`calculate_updates`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updates {
    /// Keys to fetch now, in key order
    pub due_keys: Vec<ResourceKey>,
    pub next_check_delay: Duration,
}

/// When a key stops being acceptable. Variant order is time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Deadline {
    Immediately,
    At(Instant),
    Never,
}

impl Deadline {
    fn after(start: Instant, span: Duration) -> Self {
        start.checked_add(span).map_or(Deadline::Never, Deadline::At)
    }
}

fn deadline(requirement: &Requirement, state: &ResourceState) -> Deadline {
    // An outstanding request governs the key until its timeout runs out
    if let Some(requested) = state.last_requested {
        if is_earlier(state.last_received, Some(requested)) {
            return Deadline::after(requested, requirement.effective_timeout());
        }
    }

    match (state.last_received, requirement.freshness) {
        (Some(received), Some(freshness)) => Deadline::after(received, freshness),
        (None, Some(_)) => Deadline::Immediately,
        (_, None) => Deadline::Never,
    }
}

/// Compute the keys due for a fetch at `now` and the delay until the next check
pub fn calculate_updates(
    requirements: &RequirementMap,
    states: &StateMap,
    now: Instant,
    bounds: CheckBounds,
) -> Updates {
    let never_fetched = ResourceState::default();
    let mut due_keys = Vec::new();
    let mut next_check_delay = bounds.max;

    for (key, requirement) in requirements.iter() {
        let state = states.get(key).unwrap_or(&never_fetched);
        let effective = deadline(requirement, state);

        let left = match effective {
            Deadline::Immediately => Duration::ZERO,
            Deadline::At(at) => at.saturating_duration_since(now),
            Deadline::Never => continue,
        };
        next_check_delay = next_check_delay.min(left);

        if effective < Deadline::At(now) {
            due_keys.push(key.clone());
        }
    }

    Updates {
        due_keys,
        next_check_delay: next_check_delay.max(bounds.min),
    }
}

#[cfg(test)]
#[path = "calculator_tests.rs"]
mod tests;
