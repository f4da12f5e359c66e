//! Counter Store: the user-id -> [`UserActivity`] table.
//!
//! [`ActivityStore`] is the storage capability the counting logic talks to;
//! [`InMemoryActivityStore`] is the process-lifetime backend. Entries are
//! created lazily and never removed.

use std::collections::HashMap;

use parking_lot::Mutex;

use tally_types::UserActivity;

/// Storage capability for per-user activity.
///
/// Implementations must apply [`update`](ActivityStore::update) atomically
/// with respect to every other call, and [`snapshot`](ActivityStore::snapshot)
/// must return users in first-insertion order (leaderboard ties depend on it).
pub trait ActivityStore: Send + Sync {
    /// A copy of one user's record.
    fn get(&self, user_id: &str) -> Option<UserActivity>;

    /// Apply `apply` to the user's record, creating an empty record first if
    /// the user is new. Returns the record as it is after the change.
    fn update(&self, user_id: &str, apply: &mut dyn FnMut(&mut UserActivity)) -> UserActivity;

    /// A point-in-time copy of every record, in first-insertion order.
    fn snapshot(&self) -> Vec<UserActivity>;

    /// Number of tracked users.
    fn len(&self) -> usize;

    /// Returns `true` when no user has been counted yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Entries {
    /// Records in first-insertion order.
    records: Vec<UserActivity>,
    /// user id -> position in `records`.
    index: HashMap<String, usize>,
}

/// In-memory [`ActivityStore`] guarded by a single mutex.
///
/// Reads and writes share the one lock, so a snapshot never observes a
/// record mid-update.
#[derive(Default)]
pub struct InMemoryActivityStore {
    entries: Mutex<Entries>,
}

impl InMemoryActivityStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityStore for InMemoryActivityStore {
    fn get(&self, user_id: &str) -> Option<UserActivity> {
        let entries = self.entries.lock();
        entries
            .index
            .get(user_id)
            .map(|&pos| entries.records[pos].clone())
    }

    fn update(&self, user_id: &str, apply: &mut dyn FnMut(&mut UserActivity)) -> UserActivity {
        let mut entries = self.entries.lock();
        let pos = match entries.index.get(user_id) {
            Some(&pos) => pos,
            None => {
                let pos = entries.records.len();
                entries.records.push(UserActivity::new(user_id));
                entries.index.insert(user_id.to_owned(), pos);
                pos
            }
        };
        let record = &mut entries.records[pos];
        apply(record);
        record.clone()
    }

    fn snapshot(&self) -> Vec<UserActivity> {
        self.entries.lock().records.clone()
    }

    fn len(&self) -> usize {
        self.entries.lock().records.len()
    }
}
