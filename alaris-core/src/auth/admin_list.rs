use dashmap::DashMap;
use tracing::info;

use alaris_common::models::{AdminEntry, UserIdentity};
use alaris_common::traits::PermissionOracle;

/// In-memory administrator list, keyed by IRC user name and seeded from the config.
#[derive(Default)]
pub struct AdminList {
    admins: DashMap<String, AdminEntry>,
}

impl AdminList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AdminEntry>) -> Self {
        let list = Self::new();
        for entry in entries {
            list.add(entry);
        }
        list
    }

    /// Adds or replaces the entry for `entry.user`. Returns true if it was new.
    pub fn add(&self, entry: AdminEntry) -> bool {
        info!("Adding admin {}", entry);
        self.admins.insert(entry.user.clone(), entry).is_none()
    }

    pub fn remove(&self, user: &str) -> Option<AdminEntry> {
        self.admins.remove(user).map(|(_, entry)| entry)
    }

    /// Entries sorted by user name.
    pub fn list(&self) -> Vec<AdminEntry> {
        let mut entries: Vec<AdminEntry> = self.admins.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.user.cmp(&b.user));
        entries
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl PermissionOracle for AdminList {
    fn is_admin(&self, identity: &UserIdentity) -> bool {
        self.admins
            .get(&identity.user)
            .is_some_and(|entry| entry.matches(identity))
    }
}
