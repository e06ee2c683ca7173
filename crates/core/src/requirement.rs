// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requirement model
//!
//! A requirement states how stale a key's data may get (`freshness`) and how
//! long a fetch may stay unanswered before it is sent again (`timeout`).
//! Requirements for the same key merge toward the stricter value of each
//! field, and an unchanged merge hands back the existing value so callers
//! can detect no-ops by identity.

use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Timeout applied when no consumer asked for a tighter one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// A consumer's freshness and timeout tolerance for one key
///
/// `None` freshness means the data is never proactively required.
/// `None` timeout means [`DEFAULT_TIMEOUT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub freshness: Option<Duration>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub timeout: Option<Duration>,
}

/// Errors from malformed requirements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("requirement for {key} has a zero timeout")]
    ZeroTimeout { key: ResourceKey },
}

impl Requirement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require data no older than `freshness`
    pub fn fresh_within(freshness: Duration) -> Self {
        Self {
            freshness: Some(freshness),
            timeout: None,
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = Some(freshness);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Reject shapes that can only come from a programming mistake
    pub fn validate(&self, key: &ResourceKey) -> Result<(), RequirementError> {
        if self.timeout == Some(Duration::ZERO) {
            return Err(RequirementError::ZeroTimeout { key: key.clone() });
        }
        Ok(())
    }
}

/// `None` is infinite, so it loses to any finite value
fn min_duration(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn shrinks(current: Option<Duration>, incoming: Option<Duration>) -> bool {
    match (current, incoming) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(current), Some(incoming)) => incoming < current,
    }
}

/// Merge `incoming` into `existing`, keeping the stricter value of each field.
///
/// Returns the borrowed `existing` when neither field would shrink. With no
/// existing requirement the default one stands in and the result is owned.
pub fn merge_requirement<'a>(
    existing: Option<&'a Requirement>,
    incoming: &Requirement,
) -> Cow<'a, Requirement> {
    let Some(existing) = existing else {
        return Cow::Owned(Requirement {
            freshness: incoming.freshness,
            timeout: Some(
                incoming
                    .timeout
                    .map_or(DEFAULT_TIMEOUT, |t| t.min(DEFAULT_TIMEOUT)),
            ),
        });
    };

    let current_timeout = existing.effective_timeout();
    if !shrinks(existing.freshness, incoming.freshness)
        && !shrinks(Some(current_timeout), incoming.timeout)
    {
        return Cow::Borrowed(existing);
    }

    Cow::Owned(Requirement {
        freshness: min_duration(existing.freshness, incoming.freshness),
        timeout: min_duration(Some(current_timeout), incoming.timeout),
    })
}

/// Merged requirements by key
///
/// Cloning is cheap and shares the underlying map. [`RequirementMap::same_as`]
/// tells whether two handles point at the same map, which is how callers learn
/// that a merge changed nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementMap(Arc<BTreeMap<ResourceKey, Requirement>>);

impl RequirementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when both handles share one underlying map
    pub fn same_as(&self, other: &RequirementMap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Merge `incoming` into every key of `keys`.
    ///
    /// Returns a handle to the same map when no key changed.
    pub fn merge_for_keys<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k ResourceKey>,
        incoming: &Requirement,
    ) -> RequirementMap {
        let mut next: Option<BTreeMap<ResourceKey, Requirement>> = None;

        for key in keys {
            let current = next.as_ref().unwrap_or(self.0.as_ref()).get(key);
            let update = match merge_requirement(current, incoming) {
                Cow::Borrowed(_) => None,
                Cow::Owned(merged) => Some(merged),
            };
            if let Some(merged) = update {
                next.get_or_insert_with(|| self.0.as_ref().clone())
                    .insert(key.clone(), merged);
            }
        }

        match next {
            Some(map) => RequirementMap(Arc::new(map)),
            None => self.clone(),
        }
    }
}

impl Deref for RequirementMap {
    type Target = BTreeMap<ResourceKey, Requirement>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BTreeMap<ResourceKey, Requirement>> for RequirementMap {
    fn from(map: BTreeMap<ResourceKey, Requirement>) -> Self {
        Self(Arc::new(map))
    }
}

impl FromIterator<(ResourceKey, Requirement)> for RequirementMap {
    fn from_iter<I: IntoIterator<Item = (ResourceKey, Requirement)>>(iter: I) -> Self {
        let mut map = BTreeMap::new();
        for (key, requirement) in iter {
            let update = match merge_requirement(map.get(&key), &requirement) {
                Cow::Borrowed(_) => None,
                Cow::Owned(merged) => Some(merged),
            };
            if let Some(merged) = update {
                map.insert(key, merged);
            }
        }
        Self::from(map)
    }
}

#[cfg(test)]
#[path = "requirement_tests.rs"]
mod tests;
