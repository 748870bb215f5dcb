//! Row ordering and the deferred resort task.

use std::cmp::Ordering;

use contacts_core::{ContactId, IdentityGraph, PresenceType, ATTR_PINNED};
use serde::{Deserialize, Serialize};

/// Order within a group.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrimarySort {
    /// Case-folded display name.
    #[default]
    Name,
    /// Most reachable first, then by name.
    Presence,
}

/// Coarse partition applied before the primary order.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupSort {
    #[default]
    None,
    /// Pinned contacts first.
    Pinned,
    /// Online contacts first.
    Online,
}

/// Everything the comparators look at, captured once per row before sorting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub pinned: bool,
    pub presence: PresenceType,
    pub name: String,
    pub uid: String,
}

impl SortKey {
    /// Builds the key for a master contact, resolving its presence on the way.
    pub fn for_contact(graph: &mut IdentityGraph, contact: ContactId) -> Self {
        let presence = graph
            .resolve_presence(contact)
            .map(|p| p.kind)
            .unwrap_or_default();
        let (pinned, uid) = graph
            .get(contact)
            .map(|c| (c.attributes().is_truthy(ATTR_PINNED), c.uid().to_string()))
            .unwrap_or_default();
        let name = graph.display_name(contact).to_lowercase();
        Self {
            pinned,
            presence,
            name,
            uid,
        }
    }
}

impl PrimarySort {
    pub fn compare(self, a: &SortKey, b: &SortKey) -> Ordering {
        let by_name = || a.name.cmp(&b.name).then_with(|| a.uid.cmp(&b.uid));
        match self {
            Self::Name => by_name(),
            Self::Presence => b.presence.rank().cmp(&a.presence.rank()).then_with(by_name),
        }
    }
}

impl GroupSort {
    pub fn compare(self, a: &SortKey, b: &SortKey) -> Ordering {
        match self {
            Self::None => Ordering::Equal,
            Self::Pinned => b.pinned.cmp(&a.pinned),
            Self::Online => b.presence.is_online().cmp(&a.presence.is_online()),
        }
    }
}

/// Stable sort of `keys`; returns `new_order` with `new_order[new] == old`.
pub fn sorted_order(keys: &[SortKey], group: GroupSort, primary: PrimarySort) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        group
            .compare(&keys[a], &keys[b])
            .then_with(|| primary.compare(&keys[a], &keys[b]))
    });
    order
}

/// Single coalesced resort task, fired by [`crate::ListStore::tick`].
#[derive(Debug, Default)]
pub struct SortScheduler {
    pending: bool,
    scheduled: u64,
    runs: u64,
}

impl SortScheduler {
    /// Requests a resort. Returns `false` when one is already pending.
    pub fn schedule(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        self.scheduled += 1;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clears the pending flag, returning whether the task should run now.
    pub fn take(&mut self) -> bool {
        let run = std::mem::take(&mut self.pending);
        if run {
            self.runs += 1;
        }
        run
    }

    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Times a resort was actually scheduled, coalesced requests excluded.
    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    pub fn run_count(&self) -> u64 {
        self.runs
    }
}
