//! Combining local state with an incoming snapshot payload.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::record::{Collection, Payload, Record};

/// How an incoming payload is combined with local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Every collection is substituted wholesale by the incoming one.
    Replace,
    /// Incoming records are appended when their id is not already present
    /// locally. Local records always win.
    #[default]
    Merge,
}

impl FromStr for ReconcileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(ReconcileMode::Replace),
            "merge" => Ok(ReconcileMode::Merge),
            other => Err(format!("unknown mode '{other}', expected 'merge' or 'replace'")),
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileMode::Replace => f.write_str("replace"),
            ReconcileMode::Merge => f.write_str("merge"),
        }
    }
}

/// Combine `local` with `incoming`.
///
/// Merge output order is always the local records in their original order
/// followed by newly added incoming records in incoming order.
pub fn reconcile(local: &Payload, incoming: &Payload, mode: ReconcileMode) -> Payload {
    match mode {
        ReconcileMode::Replace => incoming.clone(),
        ReconcileMode::Merge => {
            let mut result = local.clone();
            for collection in Collection::ALL {
                merge_into(
                    result.collection_mut(collection),
                    incoming.collection(collection),
                );
            }
            result
        }
    }
}

fn merge_into(target: &mut Vec<Record>, incoming: &[Record]) {
    let mut present: HashSet<String> = target.iter().map(|r| r.id.clone()).collect();

    for record in incoming {
        if present.insert(record.id.clone()) {
            target.push(record.clone());
        }
    }
}

/// Per-collection record changes between two payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub changes: Vec<CollectionChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub collection: Collection,
    pub added: usize,
    /// Ids present on both sides whose content differs.
    pub updated: usize,
    pub removed: usize,
}

impl ReconcileSummary {
    pub fn between(before: &Payload, after: &Payload) -> Self {
        let changes = Collection::ALL
            .iter()
            .filter_map(|&collection| {
                let old: HashMap<&str, &Record> = before
                    .collection(collection)
                    .iter()
                    .map(|r| (r.id.as_str(), r))
                    .collect();
                let new: HashMap<&str, &Record> = after
                    .collection(collection)
                    .iter()
                    .map(|r| (r.id.as_str(), r))
                    .collect();

                let added = new.keys().filter(|id| !old.contains_key(*id)).count();
                let removed = old.keys().filter(|id| !new.contains_key(*id)).count();
                let updated = new
                    .iter()
                    .filter(|(id, record)| old.get(*id).is_some_and(|prev| prev != *record))
                    .count();

                (added > 0 || updated > 0 || removed > 0).then_some(CollectionChange {
                    collection,
                    added,
                    updated,
                    removed,
                })
            })
            .collect();

        ReconcileSummary { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Added, updated and removed records across all collections.
    pub fn totals(&self) -> (usize, usize, usize) {
        self.changes.iter().fold((0, 0, 0), |(a, u, r), c| {
            (a + c.added, u + c.updated, r + c.removed)
        })
    }
}
