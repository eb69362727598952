//! External read-only collaborators referenced, but not owned, by this
//! subsystem.

use crate::entities::{Hash, Roster};

/// Resolves a roster hash to the roster it names. Rosters are pure data;
/// callers pass the resolved value into a controller by value and never
/// retain a reference to this store past construction.
pub trait RosterStore: Send + Sync {
    fn get(&self, roster_hash: Hash) -> Option<Roster>;
}

/// An in-memory [`RosterStore`] for tests and the demonstration binary.
#[derive(Default)]
pub struct InMemoryRosterStore {
    rosters: std::collections::HashMap<Hash, Roster>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, roster_hash: Hash, roster: Roster) {
        self.rosters.insert(roster_hash, roster);
    }
}

impl RosterStore for InMemoryRosterStore {
    fn get(&self, roster_hash: Hash) -> Option<Roster> {
        self.rosters.get(&roster_hash).cloned()
    }
}
