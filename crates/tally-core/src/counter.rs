//! The accumulation function shared by live ingestion and backfill.

use std::sync::Arc;

use tracing::debug;

use crate::store::ActivityStore;

/// Applies counted messages to an [`ActivityStore`].
///
/// Both the [`EventIngestor`](crate::ingest::EventIngestor) and the
/// [`BackfillTraverser`](crate::backfill::BackfillTraverser) hold the same
/// counter, so live and historical messages are counted identically.
/// Accumulation is cumulative: counting the same message twice counts it
/// twice.
pub struct ActivityCounter {
    store: Arc<dyn ActivityStore>,
}

impl ActivityCounter {
    /// Count into `store`.
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Add one message by `user_id` in `channel_id`.
    pub fn accumulate(&self, user_id: &str, channel_id: &str) {
        let after = self.store.update(user_id, &mut |activity| activity.record(channel_id));
        debug!(
            user = %user_id,
            channel = %channel_id,
            total = after.total(),
            "message counted"
        );
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ActivityStore> {
        &self.store
    }
}
