//! Master/roster attachment graph and the derived state it keeps current.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::capability::{self, Capabilities};
use crate::error::GraphError;
use crate::events::{ContactProperty, GraphEvent, ListenerTable};
use crate::presence::{self, Presence, PresenceType};
use crate::types::{
    is_temporary_uid, AccountRef, Attributes, ContactId, ContactRecord, RosterRecord,
    ATTR_FULL_NAME, ATTR_MASTER_UID, ATTR_NAME, ATTR_NICKNAME, ATTR_PHOTO,
};

static UNSET_PRESENCE: Presence = Presence {
    kind: PresenceType::Unset,
    status: String::new(),
    message: None,
    location: None,
};

/// Which identity supplies a master's displayed presence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceSource {
    Own,
    Roster(ContactId),
}

#[derive(Clone, Debug, Default)]
pub struct MasterState {
    /// Attached roster contacts in attachment order.
    rosters: Vec<ContactId>,
    combined: Capabilities,
    /// `None` until resolved, and again after the source was invalidated.
    presence_source: Option<PresenceSource>,
    /// Roster contact whose status notifications are forwarded to this master.
    forwarding: Option<ContactId>,
}

impl MasterState {
    pub fn rosters(&self) -> &[ContactId] {
        &self.rosters
    }

    pub fn combined_capabilities(&self) -> Capabilities {
        self.combined
    }

    pub fn presence_source(&self) -> Option<PresenceSource> {
        self.presence_source
    }
}

#[derive(Clone, Debug, Default)]
pub struct RosterState {
    account: AccountRef,
    avatar: Option<String>,
    avatar_id: u32,
    masters: Vec<ContactId>,
}

impl RosterState {
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Larger means more recently set. Zero when no avatar was ever set.
    pub fn avatar_id(&self) -> u32 {
        self.avatar_id
    }

    pub fn masters(&self) -> &[ContactId] {
        &self.masters
    }
}

#[derive(Clone, Debug)]
enum ContactKind {
    Master(MasterState),
    Roster(RosterState),
}

#[derive(Clone, Debug)]
pub struct Contact {
    uid: String,
    attributes: Attributes,
    presence: Presence,
    capabilities: Capabilities,
    kind: ContactKind,
}

impl Contact {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Raw presence reported for this identity, before any resolution.
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn own_capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_master(&self) -> bool {
        matches!(self.kind, ContactKind::Master(_))
    }

    pub fn is_roster(&self) -> bool {
        matches!(self.kind, ContactKind::Roster(_))
    }

    pub fn as_master(&self) -> Option<&MasterState> {
        match &self.kind {
            ContactKind::Master(state) => Some(state),
            ContactKind::Roster(_) => None,
        }
    }

    pub fn as_roster(&self) -> Option<&RosterState> {
        match &self.kind {
            ContactKind::Roster(state) => Some(state),
            ContactKind::Master(_) => None,
        }
    }

    fn master_mut(&mut self) -> Option<&mut MasterState> {
        match &mut self.kind {
            ContactKind::Master(state) => Some(state),
            ContactKind::Roster(_) => None,
        }
    }

    fn roster_mut(&mut self) -> Option<&mut RosterState> {
        match &mut self.kind {
            ContactKind::Roster(state) => Some(state),
            ContactKind::Master(_) => None,
        }
    }
}

/// Owns every contact of a collection plus the attachment edges between them.
///
/// Derived state (combined capabilities, chosen presence source) lives on the
/// master and is updated on the mutation paths that can change it. Observers
/// learn about changes through [`IdentityGraph::drain_events`].
#[derive(Debug, Default)]
pub struct IdentityGraph {
    contacts: SlotMap<ContactId, Contact>,
    by_uid: HashMap<String, Vec<ContactId>>,
    listeners: ListenerTable,
    events: Vec<GraphEvent>,
    next_avatar_id: u32,
}

impl IdentityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.get(id)
    }

    pub fn contains(&self, id: ContactId) -> bool {
        self.contacts.contains_key(id)
    }

    /// Every live contact carrying `uid`.
    pub fn find_by_uid(&self, uid: &str) -> &[ContactId] {
        self.by_uid.get(uid).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn insert_master(&mut self, record: ContactRecord) -> ContactId {
        let ContactRecord {
            uid,
            attributes,
            presence,
            capabilities,
        } = record;
        let state = MasterState {
            combined: capabilities,
            ..MasterState::default()
        };
        self.insert(Contact {
            uid,
            attributes,
            presence,
            capabilities,
            kind: ContactKind::Master(state),
        })
    }

    pub fn insert_roster(&mut self, record: RosterRecord) -> ContactId {
        let RosterRecord {
            uid,
            account,
            attributes,
            presence,
            capabilities,
            avatar,
        } = record;
        let avatar_id = match avatar {
            Some(_) => self.bump_avatar_id(),
            None => 0,
        };
        let state = RosterState {
            account,
            avatar,
            avatar_id,
            masters: Vec::new(),
        };
        self.insert(Contact {
            uid,
            attributes,
            presence,
            capabilities,
            kind: ContactKind::Roster(state),
        })
    }

    fn insert(&mut self, contact: Contact) -> ContactId {
        let uid = contact.uid.clone();
        let id = self.contacts.insert(contact);
        self.by_uid.entry(uid).or_default().push(id);
        id
    }

    /// Removes a contact after tearing down every edge it takes part in.
    pub fn remove(&mut self, id: ContactId) -> Result<Contact, GraphError> {
        let contact = self.contacts.get(id).ok_or(GraphError::UnknownContact(id))?;
        match &contact.kind {
            ContactKind::Master(state) => {
                for roster in state.rosters.clone() {
                    self.detach(id, roster)?;
                }
            }
            ContactKind::Roster(state) => {
                for master in state.masters.clone() {
                    self.detach(master, id)?;
                }
            }
        }

        self.listeners.purge(id);
        let contact = self
            .contacts
            .remove(id)
            .ok_or(GraphError::UnknownContact(id))?;
        if let Some(ids) = self.by_uid.get_mut(&contact.uid) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_uid.remove(&contact.uid);
            }
        }
        self.events.push(GraphEvent::Removed { contact: id });
        log::trace!("removed contact {}", contact.uid);
        Ok(contact)
    }

    // ── Attachment ────────────────────────────────────────────────────────────

    pub fn attach(&mut self, master: ContactId, roster: ContactId) -> Result<(), GraphError> {
        if master == roster {
            return reject(GraphError::SelfAttachment(master));
        }
        let master_uid = match self.contacts.get(master) {
            None => return reject(GraphError::UnknownContact(master)),
            Some(contact) => match contact.as_master() {
                None => return reject(GraphError::NotMaster(master)),
                Some(state) if state.rosters.contains(&roster) => {
                    return reject(GraphError::AlreadyAttached { master, roster });
                }
                Some(_) => contact.uid.clone(),
            },
        };
        let account = match self.contacts.get(roster) {
            None => return reject(GraphError::UnknownContact(roster)),
            Some(contact) => match contact.as_roster() {
                None => return reject(GraphError::NotRoster(roster)),
                Some(state) => state.account.account_id.clone(),
            },
        };

        let current = self.resolve_source(master);

        if let Some(state) = self.contacts.get_mut(master).and_then(Contact::master_mut) {
            state.rosters.push(roster);
        }
        if let Some(contact) = self.contacts.get_mut(roster) {
            if !is_temporary_uid(&master_uid) {
                contact.attributes.add_value(ATTR_MASTER_UID, &master_uid);
            }
            if let Some(state) = contact.roster_mut() {
                state.masters.push(master);
            }
        }
        for property in ContactProperty::ATTACHMENT {
            self.listeners.subscribe(roster, master, property);
        }

        let roster_presence = self.contacts.get(roster).map(|c| &c.presence);
        let current_presence = self.source_presence(master, current);
        if roster_presence.is_some_and(|p| p.is_better_than(current_presence)) {
            self.set_presence_source(master, PresenceSource::Roster(roster));
            self.push_notify(master, ContactProperty::PresenceType);
        }

        self.refresh_capabilities(master);
        self.events.push(GraphEvent::Attached { master, roster });
        log::debug!("attached {roster:?} from account {account} to master {master_uid}");
        Ok(())
    }

    pub fn detach(&mut self, master: ContactId, roster: ContactId) -> Result<(), GraphError> {
        let master_uid = match self.contacts.get(master) {
            None => return reject(GraphError::UnknownContact(master)),
            Some(contact) => match contact.as_master() {
                None => return reject(GraphError::NotMaster(master)),
                Some(state) if !state.rosters.contains(&roster) => {
                    return reject(GraphError::NotAttached { master, roster });
                }
                Some(_) => contact.uid.clone(),
            },
        };

        self.listeners
            .unsubscribe(roster, master, &ContactProperty::ATTACHMENT);
        let mut source_lost = false;
        if let Some(state) = self.contacts.get_mut(master).and_then(Contact::master_mut) {
            state.rosters.retain(|other| *other != roster);
            source_lost = state.presence_source == Some(PresenceSource::Roster(roster));
        }
        if source_lost {
            self.invalidate_presence_source(master);
        }

        let mut remaining = Vec::new();
        if let Some(state) = self.contacts.get_mut(roster).and_then(Contact::roster_mut) {
            state.masters.retain(|other| *other != master);
            remaining.extend_from_slice(&state.masters);
        }
        let uid_still_used = remaining
            .iter()
            .filter_map(|other| self.contacts.get(*other))
            .any(|c| c.uid == master_uid);
        if !uid_still_used {
            if let Some(attributes) = self.contacts.get_mut(roster).map(|c| &mut c.attributes) {
                attributes.remove_value(ATTR_MASTER_UID, &master_uid);
            }
        }

        if source_lost {
            self.push_notify(master, ContactProperty::PresenceType);
        }
        self.refresh_capabilities(master);
        self.events.push(GraphEvent::Detached { master, roster });
        log::debug!("detached {:?} from master {}", roster, master_uid);
        Ok(())
    }

    pub fn attached(&self, master: ContactId) -> &[ContactId] {
        self.contacts
            .get(master)
            .and_then(Contact::as_master)
            .map(MasterState::rosters)
            .unwrap_or_default()
    }

    pub fn masters_of(&self, roster: ContactId) -> &[ContactId] {
        self.contacts
            .get(roster)
            .and_then(Contact::as_roster)
            .map(RosterState::masters)
            .unwrap_or_default()
    }

    /// Master uids recorded on a roster contact.
    pub fn master_uids(&self, roster: ContactId) -> &[String] {
        self.contacts
            .get(roster)
            .map(|c| c.attributes.values(ATTR_MASTER_UID))
            .unwrap_or_default()
    }

    /// Whether `subscriber` currently receives `property` notifications of
    /// `source`.
    pub fn is_listening(
        &self,
        subscriber: ContactId,
        source: ContactId,
        property: ContactProperty,
    ) -> bool {
        self.listeners.is_subscribed(source, subscriber, property)
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    /// Combined capabilities for a master, own flags for a roster contact.
    pub fn capabilities(&self, id: ContactId) -> Capabilities {
        let Some(contact) = self.contacts.get(id) else {
            return Capabilities::empty();
        };
        match contact.as_master() {
            Some(state) => state.combined,
            None => contact.capabilities,
        }
    }

    /// Presence a master displays, resolving the source lazily.
    pub fn resolve_presence(&mut self, master: ContactId) -> Result<&Presence, GraphError> {
        match self.contacts.get(master) {
            None => return Err(GraphError::UnknownContact(master)),
            Some(contact) if !contact.is_master() => return Err(GraphError::NotMaster(master)),
            Some(_) => {}
        }
        let source = self.resolve_source(master);
        Ok(self.source_presence(master, source))
    }

    /// Cached presence source, `None` when unresolved.
    pub fn presence_source(&self, master: ContactId) -> Option<PresenceSource> {
        self.contacts
            .get(master)
            .and_then(Contact::as_master)
            .and_then(MasterState::presence_source)
    }

    fn resolve_source(&mut self, master: ContactId) -> PresenceSource {
        let Some(contact) = self.contacts.get(master) else {
            return PresenceSource::Own;
        };
        let Some(state) = contact.as_master() else {
            return PresenceSource::Own;
        };
        if state.rosters.is_empty() {
            if state.presence_source != Some(PresenceSource::Own) {
                self.set_presence_source(master, PresenceSource::Own);
            }
            return PresenceSource::Own;
        }
        if let Some(source) = state.presence_source {
            return source;
        }

        let own = &contact.presence;
        let incumbent = own.is_set().then_some((PresenceSource::Own, own));
        let candidates = state.rosters.iter().filter_map(|roster| {
            let presence = &self.contacts.get(*roster)?.presence;
            Some((PresenceSource::Roster(*roster), presence))
        });
        let source = presence::choose_best(incumbent, candidates).unwrap_or(PresenceSource::Own);
        self.set_presence_source(master, source);
        log::trace!(
            "resolved presence source of {} to {:?}",
            contact_uid(&self.contacts, master),
            source
        );
        source
    }

    fn source_presence(&self, master: ContactId, source: PresenceSource) -> &Presence {
        let id = match source {
            PresenceSource::Own => master,
            PresenceSource::Roster(roster) => roster,
        };
        self.contacts
            .get(id)
            .map(|c| &c.presence)
            .unwrap_or(&UNSET_PRESENCE)
    }

    fn set_presence_source(&mut self, master: ContactId, source: PresenceSource) {
        let Some(state) = self.contacts.get_mut(master).and_then(Contact::master_mut) else {
            return;
        };
        state.presence_source = Some(source);
        let forward = match source {
            PresenceSource::Own => None,
            PresenceSource::Roster(roster) => Some(roster),
        };
        if state.forwarding == forward {
            return;
        }
        if let Some(previous) = std::mem::replace(&mut state.forwarding, forward) {
            self.listeners
                .unsubscribe(previous, master, &ContactProperty::PRESENCE_FORWARD);
        }
        if let Some(roster) = forward {
            for property in ContactProperty::PRESENCE_FORWARD {
                self.listeners.subscribe(roster, master, property);
            }
        }
    }

    /// Forgets the cached presence source. Status forwarding stops with it and
    /// resumes once the next resolution picks a roster contact again.
    fn invalidate_presence_source(&mut self, master: ContactId) {
        let Some(state) = self.contacts.get_mut(master).and_then(Contact::master_mut) else {
            return;
        };
        state.presence_source = None;
        if let Some(previous) = state.forwarding.take() {
            self.listeners
                .unsubscribe(previous, master, &ContactProperty::PRESENCE_FORWARD);
        }
    }

    fn refresh_capabilities(&mut self, master: ContactId) {
        let Some(contact) = self.contacts.get(master) else {
            return;
        };
        let Some(state) = contact.as_master() else {
            return;
        };
        let attached = state
            .rosters
            .iter()
            .filter_map(|roster| self.contacts.get(*roster).map(|c| c.capabilities));
        let combined = capability::combine(contact.capabilities, attached);
        if combined == state.combined {
            return;
        }
        if let Some(state) = self.contacts.get_mut(master).and_then(Contact::master_mut) {
            state.combined = combined;
        }
        self.push_notify(master, ContactProperty::Capabilities);
    }

    /// Avatar a master displays: its own photo, else the most recently set
    /// avatar among its roster contacts.
    pub fn resolve_avatar(&self, master: ContactId) -> Option<&str> {
        let contact = self.contacts.get(master)?;
        if let Some(photo) = contact.attributes.first(ATTR_PHOTO) {
            return Some(photo);
        }
        contact
            .as_master()?
            .rosters
            .iter()
            .filter_map(|roster| self.contacts.get(*roster).and_then(Contact::as_roster))
            .filter(|state| state.avatar.is_some())
            .max_by_key(|state| state.avatar_id)
            .and_then(RosterState::avatar)
    }

    /// Human-readable name used for display and collation.
    pub fn display_name(&self, id: ContactId) -> String {
        let Some(contact) = self.contacts.get(id) else {
            return String::new();
        };
        if let Some(name) = name_from_attributes(&contact.attributes) {
            return name;
        }
        contact
            .as_master()
            .and_then(|state| {
                state
                    .rosters
                    .iter()
                    .filter_map(|roster| self.contacts.get(*roster))
                    .find_map(|roster| name_from_attributes(&roster.attributes))
            })
            .unwrap_or_else(|| contact.uid.clone())
    }

    // ── Mutation from backends ────────────────────────────────────────────────

    /// Replaces a master's own data with a fresh record from its source.
    pub fn update_master(
        &mut self,
        master: ContactId,
        record: ContactRecord,
    ) -> Result<(), GraphError> {
        let contact = self
            .contacts
            .get_mut(master)
            .ok_or(GraphError::UnknownContact(master))?;
        if !contact.is_master() {
            return Err(GraphError::NotMaster(master));
        }
        let ContactRecord {
            uid,
            attributes,
            presence,
            capabilities,
        } = record;
        let old_uid = std::mem::replace(&mut contact.uid, uid);
        let uid_changed = old_uid != contact.uid;
        let new_uid = contact.uid.clone();
        contact.attributes = attributes;
        let kind_changed = contact.presence.kind != presence.kind;
        contact.presence = presence;
        contact.capabilities = capabilities;
        self.invalidate_presence_source(master);

        if uid_changed {
            if let Some(ids) = self.by_uid.get_mut(&old_uid) {
                ids.retain(|other| *other != master);
                if ids.is_empty() {
                    self.by_uid.remove(&old_uid);
                }
            }
            self.by_uid.entry(new_uid.clone()).or_default().push(master);
            for roster in self.attached(master).to_vec() {
                if let Some(contact) = self.contacts.get_mut(roster) {
                    if !is_temporary_uid(&old_uid) {
                        contact.attributes.remove_value(ATTR_MASTER_UID, &old_uid);
                    }
                    if !is_temporary_uid(&new_uid) {
                        contact.attributes.add_value(ATTR_MASTER_UID, &new_uid);
                    }
                }
            }
        }

        self.push_notify(master, ContactProperty::Attributes);
        if kind_changed {
            self.push_notify(master, ContactProperty::PresenceType);
        }
        self.refresh_capabilities(master);
        Ok(())
    }

    pub fn set_roster_presence(
        &mut self,
        roster: ContactId,
        presence: Presence,
    ) -> Result<(), GraphError> {
        let contact = self.roster_contact_mut(roster)?;
        let old = std::mem::replace(&mut contact.presence, presence);
        let new = &contact.presence;
        let mut changed = Vec::new();
        if old.kind != new.kind {
            changed.push(ContactProperty::PresenceType);
        }
        if old.status != new.status || old.location != new.location {
            changed.push(ContactProperty::PresenceStatus);
        }
        if old.message != new.message {
            changed.push(ContactProperty::PresenceStatusMessage);
        }
        for property in changed {
            self.notify(roster, property);
        }
        Ok(())
    }

    pub fn set_roster_capabilities(
        &mut self,
        roster: ContactId,
        capabilities: Capabilities,
    ) -> Result<(), GraphError> {
        let contact = self.roster_contact_mut(roster)?;
        if contact.capabilities == capabilities {
            return Ok(());
        }
        contact.capabilities = capabilities;
        self.notify(roster, ContactProperty::Capabilities);
        Ok(())
    }

    pub fn set_roster_avatar(
        &mut self,
        roster: ContactId,
        avatar: Option<String>,
    ) -> Result<(), GraphError> {
        self.roster_contact_mut(roster)?;
        let avatar_id = match avatar {
            Some(_) => self.bump_avatar_id(),
            None => 0,
        };
        if let Some(state) = self.contacts.get_mut(roster).and_then(Contact::roster_mut) {
            state.avatar = avatar;
            state.avatar_id = avatar_id;
        }
        self.notify(roster, ContactProperty::AvatarImage);
        Ok(())
    }

    /// Replaces a roster contact's attributes. Master uid bookkeeping is
    /// owned by the graph and survives the replacement.
    pub fn set_roster_attributes(
        &mut self,
        roster: ContactId,
        mut attributes: Attributes,
    ) -> Result<(), GraphError> {
        let contact = self.roster_contact_mut(roster)?;
        attributes.remove(ATTR_MASTER_UID);
        for uid in contact.attributes.values(ATTR_MASTER_UID) {
            attributes.add_value(ATTR_MASTER_UID, uid);
        }
        contact.attributes = attributes;
        self.notify(roster, ContactProperty::Attributes);
        Ok(())
    }

    fn roster_contact_mut(&mut self, roster: ContactId) -> Result<&mut Contact, GraphError> {
        let contact = self
            .contacts
            .get_mut(roster)
            .ok_or(GraphError::UnknownContact(roster))?;
        if contact.is_roster() {
            Ok(contact)
        } else {
            Err(GraphError::NotRoster(roster))
        }
    }

    fn bump_avatar_id(&mut self) -> u32 {
        self.next_avatar_id = self.next_avatar_id.wrapping_add(1).max(1);
        self.next_avatar_id
    }

    // ── Notification ──────────────────────────────────────────────────────────

    fn push_notify(&mut self, contact: ContactId, property: ContactProperty) {
        self.events.push(GraphEvent::Notify { contact, property });
    }

    fn notify(&mut self, source: ContactId, property: ContactProperty) {
        self.push_notify(source, property);
        for subscriber in self.listeners.subscribers(source, property) {
            self.on_source_changed(subscriber, source, property);
        }
    }

    fn on_source_changed(
        &mut self,
        master: ContactId,
        roster: ContactId,
        property: ContactProperty,
    ) {
        match property {
            ContactProperty::Capabilities => self.refresh_capabilities(master),
            ContactProperty::PresenceType => {
                self.reevaluate_presence(master, roster);
                self.push_notify(master, property);
            }
            ContactProperty::AvatarImage
            | ContactProperty::PresenceStatus
            | ContactProperty::PresenceStatusMessage => self.push_notify(master, property),
            ContactProperty::Attributes => {}
        }
    }

    fn reevaluate_presence(&mut self, master: ContactId, roster: ContactId) {
        let Some(current) = self.presence_source(master) else {
            return;
        };
        if current == PresenceSource::Roster(roster) {
            // The source itself changed; it may no longer be the best.
            self.invalidate_presence_source(master);
            return;
        }
        let current_presence = self.source_presence(master, current);
        let better = self
            .contacts
            .get(roster)
            .is_some_and(|c| c.presence.is_better_than(current_presence));
        if better {
            self.set_presence_source(master, PresenceSource::Roster(roster));
        }
    }

    /// Hands every event accumulated since the last call to the caller.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

fn reject(err: GraphError) -> Result<(), GraphError> {
    log::warn!("identity graph rejected operation: {err}");
    Err(err)
}

fn contact_uid(contacts: &SlotMap<ContactId, Contact>, id: ContactId) -> &str {
    contacts.get(id).map(Contact::uid).unwrap_or("<removed>")
}

fn first_non_empty<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a str> {
    let value = attributes.first(name)?.trim();
    (!value.is_empty()).then_some(value)
}

fn name_from_attributes(attributes: &Attributes) -> Option<String> {
    if let Some(full) = first_non_empty(attributes, ATTR_FULL_NAME) {
        return Some(full.to_string());
    }
    if let Some(structured) = attributes.first(ATTR_NAME) {
        let mut parts = structured.split(';').map(str::trim);
        let family = parts.next().unwrap_or_default();
        let given = parts.next().unwrap_or_default();
        let joined = format!("{given} {family}");
        let joined = joined.trim();
        if !joined.is_empty() {
            return Some(joined.to_string());
        }
    }
    first_non_empty(attributes, ATTR_NICKNAME).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(uid: &str, kind: PresenceType, caps: Capabilities) -> RosterRecord {
        RosterRecord::new(uid, AccountRef::new("mesh0", "lxmf"))
            .with_presence(Presence::new(kind))
            .with_capabilities(caps)
    }

    #[test]
    fn structured_name_is_given_then_family() {
        let mut graph = IdentityGraph::new();
        let record = ContactRecord::new("x").with_attribute(ATTR_NAME, "Doe;Jane;;;");
        let id = graph.insert_master(record);
        assert_eq!(graph.display_name(id), "Jane Doe");

        let family_only = ContactRecord::new("y").with_attribute(ATTR_NAME, "Doe;;;;");
        let id = graph.insert_master(family_only);
        assert_eq!(graph.display_name(id), "Doe");
    }

    #[test]
    fn display_name_falls_back_to_roster_then_uid() {
        let mut graph = IdentityGraph::new();
        let master = graph.insert_master(ContactRecord::new("uid-1"));
        assert_eq!(graph.display_name(master), "uid-1");
        let r = graph.insert_roster(
            roster("r@mesh", PresenceType::Offline, Capabilities::empty()).with_name("Rita"),
        );
        graph.attach(master, r).expect("attach");
        assert_eq!(graph.display_name(master), "Rita");
    }

    #[test]
    fn removing_a_master_detaches_rosters_first() {
        let mut graph = IdentityGraph::new();
        let master = graph.insert_master(ContactRecord::new("bob"));
        let r = graph.insert_roster(roster("bob@mesh", PresenceType::Away, Capabilities::CHAT));
        graph.attach(master, r).expect("attach");
        graph.drain_events();

        graph.remove(master).expect("remove");
        let events = graph.drain_events();
        let detached = GraphEvent::Detached { master, roster: r };
        let removed = GraphEvent::Removed { contact: master };
        let detached_at = events.iter().position(|e| *e == detached);
        let removed_at = events.iter().position(|e| *e == removed);
        assert!(detached_at.expect("detached") < removed_at.expect("removed"));
        assert!(graph.masters_of(r).is_empty());
        assert!(graph.master_uids(r).is_empty());
        assert_eq!(graph.listeners.len(), 0);
    }

    #[test]
    fn removed_handle_is_stale() {
        let mut graph = IdentityGraph::new();
        let master = graph.insert_master(ContactRecord::new("bob"));
        graph.remove(master).expect("remove");
        let again = graph.insert_master(ContactRecord::new("bob"));
        assert_ne!(master, again);
        assert!(graph.get(master).is_none());
        let err = graph.remove(master).expect_err("stale handle");
        assert_eq!(err, GraphError::UnknownContact(master));
        assert_eq!(graph.find_by_uid("bob"), [again]);
    }

    #[test]
    fn source_change_to_worse_presence_forces_rescan() {
        let mut graph = IdentityGraph::new();
        let bob = graph.insert_master(ContactRecord::new("bob"));
        let a = graph.insert_roster(roster("a", PresenceType::Available, Capabilities::empty()));
        let b = graph.insert_roster(roster("b", PresenceType::Away, Capabilities::empty()));
        graph.attach(bob, a).expect("attach a");
        graph.attach(bob, b).expect("attach b");
        assert_eq!(graph.presence_source(bob), Some(PresenceSource::Roster(a)));

        let offline = Presence::new(PresenceType::Offline);
        graph.set_roster_presence(a, offline).expect("presence");
        assert_eq!(graph.presence_source(bob), None);
        let resolved = graph.resolve_presence(bob).expect("resolve");
        assert_eq!(resolved.kind, PresenceType::Away);
        assert_eq!(graph.presence_source(bob), Some(PresenceSource::Roster(b)));
    }

    #[test]
    fn forwarding_follows_presence_source() {
        let mut graph = IdentityGraph::new();
        let master = graph.insert_master(ContactRecord::new("bob"));
        let a = graph.insert_roster(roster("a", PresenceType::Away, Capabilities::empty()));
        let b = graph.insert_roster(roster("b", PresenceType::Available, Capabilities::empty()));
        graph.attach(master, a).expect("attach a");
        assert!(graph.is_listening(master, a, ContactProperty::PresenceStatus));

        graph.attach(master, b).expect("attach b");
        assert!(!graph.is_listening(master, a, ContactProperty::PresenceStatus));
        assert!(graph.is_listening(master, b, ContactProperty::PresenceStatusMessage));
        graph.drain_events();

        let greeting = Presence::new(PresenceType::Available).with_message("hi");
        graph.set_roster_presence(b, greeting).expect("presence");
        let events = graph.drain_events();
        assert!(events.contains(&GraphEvent::Notify {
            contact: master,
            property: ContactProperty::PresenceStatusMessage,
        }));
    }
}
