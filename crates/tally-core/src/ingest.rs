//! Event Ingestor: live message notifications into the counter.

use std::sync::Arc;

use tracing::trace;

use tally_types::event::MessageEvent;

use crate::counter::ActivityCounter;

/// Applies live [`MessageEvent`]s, one at a time, as they arrive.
///
/// Automated messages and events without an author or channel are dropped
/// silently. There is no buffering and no retry.
pub struct EventIngestor {
    counter: Arc<ActivityCounter>,
}

impl EventIngestor {
    /// Ingest into `counter`.
    pub fn new(counter: Arc<ActivityCounter>) -> Self {
        Self { counter }
    }

    /// Apply one event. Returns `true` if it was counted.
    pub fn ingest(&self, event: &MessageEvent) -> bool {
        match event.countable() {
            Some((author, channel)) => {
                self.counter.accumulate(author, channel);
                true
            }
            None => {
                trace!(?event, "event not counted");
                false
            }
        }
    }
}
