//! Shared state of one transformation run.

use std::collections::HashMap;

use crate::transformer::{ConflictId, ConflictIds};

/// Entries that transformers publish for later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKey {
    /// Written by the conflict marker.
    ConflictIds,
    /// Written by the conflict id sorter.
    SortedConflictIds,
    /// Groups the sorter had to force out of a cycle, in the order it did so.
    CyclicConflictIds,
}

/// A typed context entry.
#[derive(Debug, Clone)]
pub enum ContextValue {
    ConflictIds(ConflictIds),
    SortedConflictIds(Vec<ConflictId>),
    CyclicConflictIds(Vec<ConflictId>),
}

impl ContextValue {
    pub fn key(&self) -> ContextKey {
        match self {
            ContextValue::ConflictIds(_) => ContextKey::ConflictIds,
            ContextValue::SortedConflictIds(_) => ContextKey::SortedConflictIds,
            ContextValue::CyclicConflictIds(_) => ContextKey::CyclicConflictIds,
        }
    }
}

/// Key-value store created per resolution request and dropped afterwards.
///
/// Not thread-safe; the pipeline is single-threaded.
#[derive(Debug, Default)]
pub struct TransformationContext {
    entries: HashMap<ContextKey, ContextValue>,
}

impl TransformationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under its own key, returning the previous one.
    pub fn put(&mut self, value: ContextValue) -> Option<ContextValue> {
        self.entries.insert(value.key(), value)
    }

    pub fn get(&self, key: ContextKey) -> Option<&ContextValue> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: ContextKey) -> Option<ContextValue> {
        self.entries.remove(&key)
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn conflict_ids(&self) -> Option<&ConflictIds> {
        match self.get(ContextKey::ConflictIds) {
            Some(ContextValue::ConflictIds(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn sorted_conflict_ids(&self) -> Option<&[ConflictId]> {
        match self.get(ContextKey::SortedConflictIds) {
            Some(ContextValue::SortedConflictIds(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn cyclic_conflict_ids(&self) -> Option<&[ConflictId]> {
        match self.get(ContextKey::CyclicConflictIds) {
            Some(ContextValue::CyclicConflictIds(ids)) => Some(ids),
            _ => None,
        }
    }
}
