// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grouping of sent records into operation calls

use freshen_core::{Payload, RecordId, ResourceKey};
use serde_json::Value;
use std::collections::BTreeMap;

/// One record going out in a batch
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchEntry {
    pub id: RecordId,
    pub key: ResourceKey,
    pub payload: Option<Payload>,
}

/// Records answered by a single operation call
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Batch {
    pub operation: String,
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.entries.iter().map(|entry| entry.key.clone()).collect()
    }

    /// `{key: payload}` over the entries that carry one
    pub fn combined_payload(&self) -> Option<Payload> {
        let combined: Payload = self
            .entries
            .iter()
            .filter_map(|entry| {
                let payload = entry.payload.as_ref()?;
                Some((entry.key.to_string(), Value::Object(payload.clone())))
            })
            .collect();
        (!combined.is_empty()).then_some(combined)
    }
}

/// Group entries by operation, sort each group by key and split groups
/// larger than `max_batch_size`
pub(crate) fn group_batches(
    entries: impl IntoIterator<Item = (String, BatchEntry)>,
    max_batch_size: Option<usize>,
) -> Vec<Batch> {
    let mut by_operation: BTreeMap<String, Vec<BatchEntry>> = BTreeMap::new();
    for (operation, entry) in entries {
        by_operation.entry(operation).or_default().push(entry);
    }

    let mut batches = Vec::new();
    for (operation, mut entries) in by_operation {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let size = max_batch_size.unwrap_or(entries.len()).max(1);
        for chunk in entries.chunks(size) {
            batches.push(Batch {
                operation: operation.clone(),
                entries: chunk.to_vec(),
            });
        }
    }
    batches
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
