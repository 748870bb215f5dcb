use anyhow::{Context, Result};
use contact_list::{ChannelSource, ListStore, ListStoreConfig};
use contacts_core::{ContactId, ContactRecord};
use serde::Serialize;

use crate::snapshot::Snapshot;

/// One list row with everything the graph resolved for it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowView {
    pub index: usize,
    pub uid: String,
    pub name: String,
    pub presence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub capabilities: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub rosters: Vec<String>,
}

/// Loads the snapshot into a list store and attaches every roster contact to
/// its masters. Roster contacts without a master get a temporary one.
pub fn build_store(config: ListStoreConfig, name: &str, snapshot: &Snapshot) -> Result<ListStore> {
    let source = ChannelSource::new(name)
        .with_contacts(snapshot.contacts.iter().map(|entry| entry.to_record()));
    let mut store = ListStore::new(config);
    store
        .set_source(source)
        .context("failed to attach snapshot source")?;
    store.tick();

    for entry in &snapshot.rosters {
        let roster = store.insert_roster(entry.to_record());
        if entry.masters.is_empty() {
            let temporary = ContactRecord::temporary_for(&entry.uid);
            let uid = temporary.uid.clone();
            store.on_items_added(vec![temporary]);
            store
                .attach_roster(&uid, roster)
                .with_context(|| format!("failed to wrap roster contact {}", entry.uid))?;
            continue;
        }
        for master in &entry.masters {
            let attached = store
                .attach_roster(master, roster)
                .with_context(|| format!("failed to attach {} to {master}", entry.uid))?;
            if attached == 0 {
                log::warn!(
                    "roster contact {} names unknown contact {master}",
                    entry.uid
                );
            }
        }
    }
    store.tick();
    Ok(store)
}

pub fn rows(store: &mut ListStore) -> Vec<RowView> {
    let contacts: Vec<ContactId> = store.iter().map(|row| row.contact()).collect();
    contacts
        .into_iter()
        .enumerate()
        .map(|(index, contact)| describe(store, index, contact))
        .collect()
}

/// Rows showing `uid`, in list order.
pub fn find(store: &mut ListStore, uid: &str) -> Vec<RowView> {
    let mut found: Vec<(usize, ContactId)> = store
        .find(uid)
        .into_iter()
        .filter_map(|row| store.row_index(row).map(|index| (index, row.contact())))
        .collect();
    found.sort_unstable_by_key(|(index, _)| *index);
    found
        .into_iter()
        .map(|(index, contact)| describe(store, index, contact))
        .collect()
}

fn describe(store: &mut ListStore, index: usize, contact: ContactId) -> RowView {
    let (presence, message) = match store.resolve_presence(contact) {
        Ok(presence) => (presence.kind.as_str().to_string(), presence.message.clone()),
        Err(err) => {
            log::warn!("row {index} has no presence: {err}");
            ("unset".to_string(), None)
        }
    };
    let graph = store.graph();
    let rosters = graph
        .attached(contact)
        .iter()
        .filter_map(|roster| graph.get(*roster))
        .map(|roster| roster.uid().to_string())
        .collect();
    let uid = graph
        .get(contact)
        .map(|c| c.uid().to_string())
        .unwrap_or_default();
    let capabilities = graph.capabilities(contact);
    let capabilities = if capabilities.is_empty() {
        "-".to_string()
    } else {
        let names: Vec<&str> = capabilities.iter_names().map(|(name, _)| name).collect();
        names.join(" ")
    };
    RowView {
        index,
        uid,
        name: graph.display_name(contact),
        presence,
        message,
        capabilities,
        avatar: graph.resolve_avatar(contact).map(str::to_string),
        rosters,
    }
}
