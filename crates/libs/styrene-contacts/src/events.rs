//! Change notifications and the listener table behind them.

use std::collections::HashMap;

use crate::types::ContactId;

/// Observable property of a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContactProperty {
    AvatarImage,
    Capabilities,
    PresenceType,
    PresenceStatus,
    PresenceStatusMessage,
    /// Any raw attribute.
    Attributes,
}

impl ContactProperty {
    /// Properties a master listens to on every attached roster contact.
    pub const ATTACHMENT: [Self; 3] = [Self::AvatarImage, Self::Capabilities, Self::PresenceType];

    /// Properties forwarded from whichever contact supplies a master's presence.
    pub const PRESENCE_FORWARD: [Self; 2] = [Self::PresenceStatus, Self::PresenceStatusMessage];
}

/// Event emitted by the identity graph, drained by the owning collection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphEvent {
    Attached {
        master: ContactId,
        roster: ContactId,
    },
    Detached {
        master: ContactId,
        roster: ContactId,
    },
    Notify {
        contact: ContactId,
        property: ContactProperty,
    },
    Removed { contact: ContactId },
}

impl GraphEvent {
    /// The contact whose displayed state this event affects.
    pub fn subject(&self) -> ContactId {
        match self {
            Self::Attached { master, .. } | Self::Detached { master, .. } => *master,
            Self::Notify { contact, .. } | Self::Removed { contact } => *contact,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Listener {
    pub subscriber: ContactId,
    pub property: ContactProperty,
}

/// Subscriptions keyed by the contact being observed.
#[derive(Debug, Default)]
pub(crate) struct ListenerTable {
    by_source: HashMap<ContactId, Vec<Listener>>,
}

impl ListenerTable {
    pub fn subscribe(
        &mut self,
        source: ContactId,
        subscriber: ContactId,
        property: ContactProperty,
    ) {
        let listeners = self.by_source.entry(source).or_default();
        let listener = Listener {
            subscriber,
            property,
        };
        if !listeners.contains(&listener) {
            listeners.push(listener);
        }
    }

    pub fn unsubscribe(
        &mut self,
        source: ContactId,
        subscriber: ContactId,
        properties: &[ContactProperty],
    ) -> usize {
        let Some(listeners) = self.by_source.get_mut(&source) else {
            return 0;
        };
        let before = listeners.len();
        listeners.retain(|l| l.subscriber != subscriber || !properties.contains(&l.property));
        let removed = before - listeners.len();
        if listeners.is_empty() {
            self.by_source.remove(&source);
        }
        removed
    }

    /// Subscribers of `property` on `source`, in subscription order.
    pub fn subscribers(&self, source: ContactId, property: ContactProperty) -> Vec<ContactId> {
        self.by_source
            .get(&source)
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|l| l.property == property)
                    .map(|l| l.subscriber)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(
        &self,
        source: ContactId,
        subscriber: ContactId,
        property: ContactProperty,
    ) -> bool {
        let listener = Listener {
            subscriber,
            property,
        };
        self.by_source
            .get(&source)
            .is_some_and(|listeners| listeners.contains(&listener))
    }

    /// Drops everything observed on or by `contact`.
    pub fn purge(&mut self, contact: ContactId) {
        self.by_source.remove(&contact);
        self.by_source.retain(|_, listeners| {
            listeners.retain(|l| l.subscriber != contact);
            !listeners.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }
}
