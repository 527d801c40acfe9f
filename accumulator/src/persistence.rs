//! Interfaces for persistent storage of the registry's members

use ark_std::{collections::BTreeMap, vec::Vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    /// Deleted members are kept so they can never be added again
    Revoked,
}

/// Database interface implemented for the registry to track every element ever added. Deleted elements are flagged,
/// never removed. A production implementation of this could be persistent key-value store like LevelDb or Rocksdb.
pub trait MemberStore<T> {
    /// Add element as active
    fn add(&mut self, element: T);

    /// Flag an active element as revoked. Returns false when it was not active.
    fn revoke(&mut self, element: &T) -> bool;

    fn status(&self, element: &T) -> Option<MemberStatus>;

    /// Check if element is active
    fn has(&self, element: &T) -> bool {
        self.status(element) == Some(MemberStatus::Active)
    }

    /// Number of active elements
    fn size(&self) -> u64;

    /// All active elements
    fn active(&self) -> Vec<T>;
}

/// In-memory store, the default for a registry
#[derive(Clone, Debug, Default)]
pub struct InMemoryMemberStore<T: Ord> {
    pub db: BTreeMap<T, MemberStatus>,
    active: u64,
}

impl<T: Ord> InMemoryMemberStore<T> {
    pub fn new() -> Self {
        Self {
            db: BTreeMap::new(),
            active: 0,
        }
    }
}

impl<T: Ord + Clone> MemberStore<T> for InMemoryMemberStore<T> {
    fn add(&mut self, element: T) {
        if self.db.insert(element, MemberStatus::Active) != Some(MemberStatus::Active) {
            self.active += 1;
        }
    }

    fn revoke(&mut self, element: &T) -> bool {
        match self.db.get_mut(element) {
            Some(s) if *s == MemberStatus::Active => {
                *s = MemberStatus::Revoked;
                self.active -= 1;
                true
            }
            _ => false,
        }
    }

    fn status(&self, element: &T) -> Option<MemberStatus> {
        self.db.get(element).copied()
    }

    fn size(&self) -> u64 {
        self.active
    }

    fn active(&self) -> Vec<T> {
        self.db
            .iter()
            .filter(|(_, s)| **s == MemberStatus::Active)
            .map(|(e, _)| e.clone())
            .collect()
    }
}
