use crate::mapping::PropertyKey;
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Available(Value),
    Unavailable,
}

/// Last observed wire values of one device, keyed by logical property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    values: HashMap<PropertyKey, SnapshotValue>,
    updated_at: Option<DateTime<Utc>>,
}

impl StateSnapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(SnapshotValue::Available(value)) => Some(value),
            _ => None,
        }
    }

    pub fn entry(&self, name: &str) -> Option<&SnapshotValue> {
        self.values.get(name)
    }

    pub fn is_unavailable(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(SnapshotValue::Unavailable))
    }

    pub fn set(&mut self, key: PropertyKey, value: Value) {
        self.values.insert(key, SnapshotValue::Available(value));
    }

    pub fn mark_unavailable(&mut self, key: PropertyKey) {
        self.values.insert(key, SnapshotValue::Unavailable);
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    /// A snapshot is fresh when it was polled less than `max_age` before `now`.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.updated_at.is_some_and(|updated_at| {
            now.signed_duration_since(updated_at)
                .to_std()
                .map(|age| age < max_age)
                .unwrap_or(true) // updated in the future, clock went backwards
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &SnapshotValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.values.values().filter(|value| matches!(value, SnapshotValue::Available(_))).count()
    }
}
