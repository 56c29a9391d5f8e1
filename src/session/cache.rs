//! Last known level per output.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::{OutputId, StatusEvent};

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    level: Option<f64>,
    in_flight_since: Option<Instant>,
}

/// Level cache with an in-flight marker for outstanding queries.
///
/// An in-flight marker older than the expiry no longer counts, so a query
/// whose reply was lost does not block later queries.
#[derive(Debug)]
pub struct StatusCache {
    entries: HashMap<OutputId, Entry>,
    in_flight_expiry: Duration,
}

impl StatusCache {
    #[must_use]
    pub fn new(in_flight_expiry: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight_expiry,
        }
    }

    /// Last level reported for `id`.
    #[must_use]
    pub fn level(&self, id: OutputId) -> Option<f64> {
        self.entries.get(&id).and_then(|entry| entry.level)
    }

    /// Returns true if a query for `id` is outstanding.
    #[must_use]
    pub fn is_in_flight(&self, id: OutputId, now: Instant) -> bool {
        self.entries
            .get(&id)
            .and_then(|entry| entry.in_flight_since)
            .is_some_and(|since| now.duration_since(since) < self.in_flight_expiry)
    }

    /// Marks a query for `id` as sent.
    pub fn mark_in_flight(&mut self, id: OutputId, now: Instant) {
        self.entries.entry(id).or_default().in_flight_since = Some(now);
    }

    /// Records a status push and clears the in-flight marker.
    pub fn update(&mut self, event: StatusEvent) {
        let entry = self.entries.entry(event.id).or_default();
        entry.level = Some(event.level);
        entry.in_flight_since = None;
    }
}
