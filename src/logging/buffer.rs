//! Bounded per-namespace log storage
//!
//! Each namespace keeps its most recent entries in a ring buffer. The store
//! maps namespace names to their buffers and creates a buffer lazily on the
//! first entry written for that namespace.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use super::entry::LogEntry;

/// Insertion-ordered entries for one namespace, capped at a buffer size
#[derive(Debug, Clone, Default)]
pub struct NamespaceLog {
    entries: VecDeque<LogEntry>,
}

impl NamespaceLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, dropping the oldest entries beyond `capacity`
    pub fn push(&mut self, entry: LogEntry, capacity: usize) {
        self.entries.push_back(entry);
        self.truncate(capacity);
    }

    /// Drop the oldest entries until at most `capacity` remain
    pub fn truncate(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    /// Get all entries as a vector, oldest first
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thread-safe map of namespace logs
#[derive(Debug, Default)]
pub struct LogStore {
    logs: RwLock<HashMap<String, NamespaceLog>>,
}

impl LogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to a namespace, creating its log on first write
    pub fn append(&self, namespace: &str, entry: LogEntry, capacity: usize) {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        logs.entry(namespace.to_string())
            .or_default()
            .push(entry, capacity);
    }

    /// Re-apply a buffer size to an existing namespace log
    ///
    /// Namespaces that have never been written to are left absent.
    pub fn truncate(&self, namespace: &str, capacity: usize) {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(log) = logs.get_mut(namespace) {
            log.truncate(capacity);
        }
    }

    /// Entries of one namespace, oldest first
    pub fn entries(&self, namespace: &str) -> Vec<LogEntry> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .map(NamespaceLog::to_vec)
            .unwrap_or_default()
    }

    /// Copy of every non-empty namespace log, keyed by namespace
    pub fn snapshot(&self) -> BTreeMap<String, Vec<LogEntry>> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, log)| !log.is_empty())
            .map(|(namespace, log)| (namespace.clone(), log.to_vec()))
            .collect()
    }

    /// Number of entries held for a namespace
    pub fn len(&self, namespace: &str) -> usize {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .map_or(0, NamespaceLog::len)
    }
}
