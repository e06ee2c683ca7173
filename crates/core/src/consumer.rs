// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-consumer requirement declarations
//!
//! Every consumer owns the requirements it last declared. The merged view is
//! recomputed from all current declarations, so a consumer that stops
//! declaring (or is released) stops tightening the result.

use crate::key::ResourceKey;
use crate::requirement::{merge_requirement, Requirement, RequirementError, RequirementMap};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identity of one consumer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(pub String);

impl ConsumerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConsumerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

type Declarations = BTreeMap<ResourceKey, Requirement>;

/// Requirement declarations keyed by consumer
#[derive(Debug, Clone, Default)]
pub struct ConsumerRequirements {
    consumers: BTreeMap<ConsumerId, Declarations>,
}

fn merge_into(declarations: &mut Declarations, key: &ResourceKey, requirement: &Requirement) {
    let update = match merge_requirement(declarations.get(key), requirement) {
        Cow::Borrowed(_) => None,
        Cow::Owned(merged) => Some(merged),
    };
    if let Some(merged) = update {
        declarations.insert(key.clone(), merged);
    }
}

impl ConsumerRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one declaration for `consumer`, keeping its earlier ones
    pub fn declare(
        &mut self,
        consumer: &ConsumerId,
        key: &ResourceKey,
        requirement: &Requirement,
    ) -> Result<(), RequirementError> {
        requirement.validate(key)?;
        let declarations = self.consumers.entry(consumer.clone()).or_default();
        merge_into(declarations, key, requirement);
        Ok(())
    }

    /// Replace everything `consumer` declared.
    ///
    /// Returns whether the consumer's declarations changed. Validation happens
    /// before anything is replaced.
    pub fn replace(
        &mut self,
        consumer: &ConsumerId,
        declarations: impl IntoIterator<Item = (ResourceKey, Requirement)>,
    ) -> Result<bool, RequirementError> {
        let mut next = Declarations::new();
        for (key, requirement) in declarations {
            requirement.validate(&key)?;
            merge_into(&mut next, &key, &requirement);
        }

        if next.is_empty() {
            return Ok(self.release(consumer));
        }
        let changed = self.consumers.get(consumer) != Some(&next);
        self.consumers.insert(consumer.clone(), next);
        Ok(changed)
    }

    /// Drop every declaration of `consumer`. Returns whether it had any.
    pub fn release(&mut self, consumer: &ConsumerId) -> bool {
        self.consumers.remove(consumer).is_some()
    }

    pub fn declarations(&self, consumer: &ConsumerId) -> Option<&BTreeMap<ResourceKey, Requirement>> {
        self.consumers.get(consumer)
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Merge every consumer's declarations into one requirement per key
    pub fn reduce(&self) -> RequirementMap {
        let mut merged = Declarations::new();
        for declarations in self.consumers.values() {
            for (key, requirement) in declarations {
                merge_into(&mut merged, key, requirement);
            }
        }
        RequirementMap::from(merged)
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
