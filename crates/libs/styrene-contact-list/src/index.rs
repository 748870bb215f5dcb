//! Contact uid to row lookup.

use std::collections::HashMap;

use crate::array::RowKey;

/// Maps a contact uid to every row showing it. A uid may legally back more
/// than one row.
#[derive(Debug, Default)]
pub(crate) struct NameIndex {
    rows: HashMap<String, Vec<RowKey>>,
}

impl NameIndex {
    pub fn insert(&mut self, uid: &str, key: RowKey) {
        let keys = self.rows.entry(uid.to_string()).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    pub fn get(&self, uid: &str) -> &[RowKey] {
        self.rows.get(uid).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.rows.contains_key(uid)
    }

    /// Drops every row recorded for `uid`.
    pub fn remove(&mut self, uid: &str) -> Vec<RowKey> {
        self.rows.remove(uid).unwrap_or_default()
    }

    pub fn remove_row(&mut self, uid: &str, key: RowKey) -> bool {
        let Some(keys) = self.rows.get_mut(uid) else {
            return false;
        };
        let before = keys.len();
        keys.retain(|other| *other != key);
        let removed = keys.len() != before;
        if keys.is_empty() {
            self.rows.remove(uid);
        }
        removed
    }

    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}
