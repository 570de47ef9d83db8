//! Per-connection subscription tracking.

use std::collections::HashMap;

/// An active subscription on one connection.
#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    /// Client chosen subscription id.
    pub id: String,
    /// Destination being watched.
    pub destination: String,
}

impl SubscriptionEntry {
    pub fn new(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
        }
    }
}

/// Subscriptions of a single connection, keyed by id.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: HashMap<String, SubscriptionEntry>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription, replacing any with the same id.
    pub fn add(&mut self, id: &str, destination: &str) {
        self.entries
            .insert(id.to_string(), SubscriptionEntry::new(id, destination));
    }

    pub fn remove(&mut self, id: &str) -> Option<SubscriptionEntry> {
        self.entries.remove(id)
    }

    /// Ids of the subscriptions on `destination`.
    pub fn deliver_to(&self, destination: &str) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.destination == destination)
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
