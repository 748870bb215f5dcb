//! The list store: master contacts exposed as a stable, indexable sequence.

use std::collections::{HashMap, HashSet};

use contacts_core::{
    Attributes, Capabilities, ContactId, ContactRecord, GraphError, IdentityGraph, Presence,
    RosterRecord,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::array::{Balloon, RowArray, RowKey};
use crate::config::ListStoreConfig;
use crate::error::ListError;
use crate::index::NameIndex;
use crate::notify::{ListEvent, ListObserver, ObserverId, Observers};
use crate::sort::{self, GroupSort, PrimarySort, SortKey, SortScheduler};
use crate::source::{ContactSource, SequenceStatus, SourceEvent};

/// One visible row, backed by a master contact in the store's graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListStoreRow {
    key: RowKey,
    contact: ContactId,
    uid: String,
}

impl ListStoreRow {
    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn contact(&self) -> ContactId {
        self.contact
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }
}

/// Rows are inserted, changed and deleted as source batches arrive; ordering
/// and change notification are deferred to [`ListStore::tick`].
pub struct ListStore {
    config: ListStoreConfig,
    graph: IdentityGraph,
    source: Option<Box<dyn ContactSource>>,
    receiver: Option<UnboundedReceiver<SourceEvent>>,
    rows: RowArray<ListStoreRow>,
    index: NameIndex,
    by_contact: HashMap<ContactId, RowKey>,
    dirty: HashSet<RowKey>,
    scheduler: SortScheduler,
    observers: Observers,
    loading: bool,
}

impl Default for ListStore {
    fn default() -> Self {
        Self::new(ListStoreConfig::default())
    }
}

impl ListStore {
    pub fn new(config: ListStoreConfig) -> Self {
        Self {
            config,
            graph: IdentityGraph::new(),
            source: None,
            receiver: None,
            rows: RowArray::default(),
            index: NameIndex::default(),
            by_contact: HashMap::new(),
            dirty: HashSet::new(),
            scheduler: SortScheduler::default(),
            observers: Observers::default(),
            loading: false,
        }
    }

    pub fn graph(&self) -> &IdentityGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.len() == 0
    }

    /// Placeholder slots after the last row.
    pub fn prealloc_rows(&self) -> usize {
        self.rows.extra()
    }

    pub fn balloon(&self) -> Balloon {
        self.rows.balloon()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().map(|source| source.name())
    }

    pub fn scheduler(&self) -> &SortScheduler {
        &self.scheduler
    }

    pub fn is_sort_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    // ── Source wiring ─────────────────────────────────────────────────────────

    /// Replaces the data source, clearing every row of the previous one.
    ///
    /// A source that is already streaming can only be shared when it is
    /// multiplexable; otherwise the store is left untouched.
    pub fn set_source<S>(&mut self, source: S) -> Result<(), ListError>
    where
        S: ContactSource + 'static,
    {
        if source.is_streaming() && !source.is_multiplexable() {
            log::error!(
                "refusing contact source {}: already streaming and not multiplexable",
                source.name()
            );
            return Err(ListError::SourceAlreadyStreaming {
                name: source.name().to_string(),
            });
        }

        self.clear_source();
        let mut source: Box<dyn ContactSource> = Box::new(source);
        self.receiver = Some(source.subscribe());
        self.loading = true;
        if !source.is_streaming() {
            source.start();
        }
        log::debug!("attached contact source {}", source.name());
        self.source = Some(source);
        Ok(())
    }

    /// Detaches the current source and deletes its rows.
    ///
    /// Only master contacts go with the rows. Roster contacts belong to the
    /// roster backend that inserted them, which drops them with
    /// [`ListStore::remove_roster`].
    pub fn clear_source(&mut self) {
        self.receiver = None;
        if let Some(source) = self.source.take() {
            log::debug!(
                "detaching contact source {} with {} rows",
                source.name(),
                self.rows.len()
            );
        }
        self.clear_rows();
        self.dirty.clear();
        self.scheduler.cancel();
        self.loading = false;
    }

    fn clear_rows(&mut self) {
        self.rows.collapse();
        while let Some(last) = self.rows.len().checked_sub(1) {
            let Some(key) = self.rows.key_at(last) else {
                break;
            };
            if let Some(row) = self.rows.value(key) {
                self.index.remove_row(&row.uid, key);
            }
            self.remove_row(key);
        }
    }

    /// Dispatches every batch the source has queued. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let Some(receiver) = self.receiver.as_mut() else {
            return 0;
        };
        let mut events = Vec::new();
        let mut closed = false;
        loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }
        if closed {
            log::debug!("contact source closed its stream");
            self.receiver = None;
        }

        let handled = events.len();
        for event in events {
            self.dispatch(event);
        }
        handled
    }

    fn dispatch(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::ItemsAdded(batch) => self.on_items_added(batch),
            SourceEvent::ItemsChanged(batch) => self.on_items_changed(batch),
            SourceEvent::ItemsRemoved(uids) => self.on_items_removed(&uids),
            SourceEvent::SequenceComplete(status) => self.on_sequence_complete(status),
        }
    }

    // ── Source callbacks ──────────────────────────────────────────────────────

    pub fn on_items_added(&mut self, batch: Vec<ContactRecord>) {
        if batch.is_empty() {
            return;
        }
        let added = batch.len();
        self.rows.reserve(added, self.config.prealloc_chunk);
        for record in batch {
            let uid = record.uid.clone();
            let contact = self.graph.insert_master(record);
            let (key, index) = self.rows.insert(|key| ListStoreRow {
                key,
                contact,
                uid: uid.clone(),
            });
            self.index.insert(&uid, key);
            self.by_contact.insert(contact, key);
            self.observers.emit(&ListEvent::RowInserted { index });
        }
        self.scheduler.schedule();
        log::debug!("added {added} contacts, {} rows", self.rows.len());
    }

    pub fn on_items_changed(&mut self, batch: Vec<ContactRecord>) {
        for record in batch {
            let contacts: Vec<ContactId> = self
                .index
                .get(&record.uid)
                .iter()
                .filter_map(|key| self.rows.value(*key))
                .map(|row| row.contact)
                .collect();
            if contacts.is_empty() {
                log::trace!("ignoring change of unknown contact {}", record.uid);
                continue;
            }
            let uid = record.uid.clone();
            for contact in contacts {
                if let Err(err) = self.graph.update_master(contact, record.clone()) {
                    log::warn!("failed to update contact {uid}: {err}");
                }
            }
            self.on_item_changed(&uid);
        }
    }

    pub fn on_items_removed<S: AsRef<str>>(&mut self, uids: &[S]) {
        for uid in uids {
            let uid = uid.as_ref();
            let keys = self.index.remove(uid);
            if keys.is_empty() {
                log::trace!("ignoring removal of unknown contact {uid}");
                continue;
            }
            for key in keys {
                self.remove_row(key);
            }
        }
    }

    fn remove_row(&mut self, key: RowKey) {
        let Some((row, index)) = self.rows.remove(key) else {
            return;
        };
        self.by_contact.remove(&row.contact);
        self.dirty.remove(&key);
        if let Err(err) = self.graph.remove(row.contact) {
            log::warn!("failed to drop contact {}: {err}", row.uid);
        }
        self.observers.emit(&ListEvent::RowDeleted { index });
    }

    /// Marks every row showing `uid` for a change notification on the next tick.
    pub fn on_item_changed(&mut self, uid: &str) {
        let keys = self.index.get(uid);
        if keys.is_empty() {
            log::trace!("ignoring change notification for unknown contact {uid}");
            return;
        }
        self.dirty.extend(keys.iter().copied());
    }

    pub fn on_sequence_complete(&mut self, status: SequenceStatus) {
        match &status {
            SequenceStatus::Ok => {
                log::debug!("initial load finished with {} rows", self.rows.len())
            }
            SequenceStatus::Failed(reason) => log::warn!("initial load failed: {reason}"),
        }
        self.loading = false;
        self.observers.emit(&ListEvent::LoadingFinished { status });
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// Every row showing `uid`.
    pub fn find(&self, uid: &str) -> Vec<&ListStoreRow> {
        self.index
            .get(uid)
            .iter()
            .filter_map(|key| self.rows.value(*key))
            .collect()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains(uid)
    }

    pub fn row_at(&self, index: usize) -> Option<&ListStoreRow> {
        self.rows.get(index)
    }

    pub fn row_index(&self, row: &ListStoreRow) -> Option<usize> {
        self.rows.index_of(row.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListStoreRow> + '_ {
        self.rows.iter()
    }

    /// Presence the master behind a row displays.
    pub fn resolve_presence(&mut self, contact: ContactId) -> Result<&Presence, ListError> {
        Ok(self.graph.resolve_presence(contact)?)
    }

    // ── Roster contacts ───────────────────────────────────────────────────────
    //
    // Roster backends feed the graph through these. Masters stay under the
    // control of the source, and every change reaches the rows on the next
    // tick.

    pub fn insert_roster(&mut self, record: RosterRecord) -> ContactId {
        self.graph.insert_roster(record)
    }

    /// Attaches `roster` to the master of every row showing `uid`.
    pub fn attach_roster(&mut self, uid: &str, roster: ContactId) -> Result<usize, ListError> {
        let contacts: Vec<ContactId> = self.find(uid).iter().map(|row| row.contact).collect();
        for contact in &contacts {
            self.graph.attach(*contact, roster)?;
        }
        Ok(contacts.len())
    }

    pub fn set_roster_presence(
        &mut self,
        roster: ContactId,
        presence: Presence,
    ) -> Result<(), ListError> {
        Ok(self.graph.set_roster_presence(roster, presence)?)
    }

    pub fn set_roster_capabilities(
        &mut self,
        roster: ContactId,
        capabilities: Capabilities,
    ) -> Result<(), ListError> {
        Ok(self.graph.set_roster_capabilities(roster, capabilities)?)
    }

    pub fn set_roster_avatar(
        &mut self,
        roster: ContactId,
        avatar: Option<String>,
    ) -> Result<(), ListError> {
        Ok(self.graph.set_roster_avatar(roster, avatar)?)
    }

    pub fn set_roster_attributes(
        &mut self,
        roster: ContactId,
        attributes: Attributes,
    ) -> Result<(), ListError> {
        Ok(self.graph.set_roster_attributes(roster, attributes)?)
    }

    /// Drops a roster contact after detaching it from every master.
    ///
    /// Master contacts are rejected; they leave with their rows through
    /// [`ListStore::on_items_removed`].
    pub fn remove_roster(&mut self, roster: ContactId) -> Result<(), ListError> {
        match self.graph.get(roster) {
            None => return Err(GraphError::UnknownContact(roster).into()),
            Some(contact) if !contact.is_roster() => {
                return Err(GraphError::NotRoster(roster).into());
            }
            Some(_) => {}
        }
        let removed = self.graph.remove(roster)?;
        log::debug!("removed roster contact {}", removed.uid());
        Ok(())
    }

    // ── Ordering ──────────────────────────────────────────────────────────────

    pub fn primary_sort(&self) -> PrimarySort {
        self.config.primary_sort
    }

    pub fn group_sort(&self) -> GroupSort {
        self.config.group_sort
    }

    pub fn set_primary_sort(&mut self, sort: PrimarySort) {
        if self.config.primary_sort != sort {
            self.config.primary_sort = sort;
            self.scheduler.schedule();
        }
    }

    pub fn set_group_sort(&mut self, sort: GroupSort) {
        if self.config.group_sort != sort {
            self.config.group_sort = sort;
            self.scheduler.schedule();
        }
    }

    pub fn subscribe<O>(&mut self, observer: O) -> ObserverId
    where
        O: ListObserver + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// One main-loop iteration: pump the source, flush change notifications,
    /// then run a pending resort.
    pub fn tick(&mut self) {
        self.pump();
        self.absorb_graph_events();
        self.flush_dirty();
        if self.scheduler.take() {
            self.resort();
        }
    }

    fn absorb_graph_events(&mut self) {
        for event in self.graph.drain_events() {
            if let Some(key) = self.by_contact.get(&event.subject()) {
                self.dirty.insert(*key);
            }
        }
    }

    fn flush_dirty(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let mut indices: Vec<usize> = self
            .dirty
            .drain()
            .filter_map(|key| self.rows.index_of(key))
            .collect();
        indices.sort_unstable();
        for index in indices {
            self.observers.emit(&ListEvent::RowChanged { index });
        }
        self.scheduler.schedule();
    }

    fn resort(&mut self) {
        if self.rows.len() == 0 {
            return;
        }
        self.rows.collapse();
        let contacts: Vec<ContactId> = self.rows.iter().map(|row| row.contact).collect();
        let keys: Vec<SortKey> = contacts
            .into_iter()
            .map(|contact| SortKey::for_contact(&mut self.graph, contact))
            .collect();
        let new_order = sort::sorted_order(&keys, self.config.group_sort, self.config.primary_sort);
        self.rows.reorder(&new_order);
        log::trace!(
            "resorted {} rows by {:?}/{:?}",
            new_order.len(),
            self.config.group_sort,
            self.config.primary_sort
        );
        self.observers.emit(&ListEvent::RowsReordered { new_order });
    }
}

impl std::fmt::Debug for ListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStore")
            .field("source", &self.source_name())
            .field("rows", &self.rows.len())
            .field("extra", &self.rows.extra())
            .field("balloon", &self.rows.balloon())
            .field("indexed", &self.index.row_count())
            .field("loading", &self.loading)
            .field("observers", &self.observers.len())
            .finish()
    }
}
