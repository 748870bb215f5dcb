use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::presence::Presence;

// ── Handles ───────────────────────────────────────────────────────────────────

slotmap::new_key_type! {
    /// Generational handle to a contact owned by an [`IdentityGraph`].
    ///
    /// A handle outlives the contact it names without ever aliasing a newer
    /// one: once the contact is removed every lookup through the old handle
    /// fails.
    ///
    /// [`IdentityGraph`]: crate::IdentityGraph
    pub struct ContactId;
}

// ── Attribute names ───────────────────────────────────────────────────────────

/// Formatted display name.
pub const ATTR_FULL_NAME: &str = "FN";
/// Structured name, `family;given;additional;prefix;suffix`.
pub const ATTR_NAME: &str = "N";
pub const ATTR_NICKNAME: &str = "NICKNAME";
/// Avatar reference owned by the contact itself.
pub const ATTR_PHOTO: &str = "PHOTO";
/// Truthy when the user pinned the contact to the top of lists.
pub const ATTR_PINNED: &str = "X-PINNED";
/// Repeated on a roster contact, one value per master it belongs to.
pub const ATTR_MASTER_UID: &str = "X-MASTER-UID";

/// Prefix of uids given to masters that have not been persisted yet.
pub const TEMPORARY_UID_PREFIX: &str = "tmc:";

/// Returns `true` for uids that must never be recorded on a roster contact.
pub fn is_temporary_uid(uid: &str) -> bool {
    uid.is_empty() || uid.starts_with(TEMPORARY_UID_PREFIX)
}

// ── Attributes ────────────────────────────────────────────────────────────────

/// vCard-like attribute set: upper-cased name to an ordered list of values.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.0
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces every value of `name` with a single one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(normalize_name(name), vec![value.into()]);
    }

    /// Appends `value` unless it is already present. Returns `true` if the
    /// set changed.
    pub fn add_value(&mut self, name: &str, value: &str) -> bool {
        let values = self.0.entry(normalize_name(name)).or_default();
        if values.iter().any(|existing| existing == value) {
            return false;
        }
        values.push(value.to_string());
        true
    }

    /// Removes every occurrence of `value`. Returns `true` if the set changed.
    pub fn remove_value(&mut self, name: &str, value: &str) -> bool {
        let key = normalize_name(name);
        let Some(values) = self.0.get_mut(&key) else {
            return false;
        };
        let before = values.len();
        values.retain(|existing| existing != value);
        let changed = values.len() != before;
        if values.is_empty() {
            self.0.remove(&key);
        }
        changed
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(&normalize_name(name))
    }

    pub fn is_truthy(&self, name: &str) -> bool {
        self.first(name).is_some_and(|value| {
            let value = value.trim().to_ascii_lowercase();
            matches!(value.as_str(), "1" | "true" | "yes")
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            let key = normalize_name(name.as_ref());
            attrs.0.entry(key).or_default().push(value.into());
        }
        attrs
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

// ── Accounts ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AccountRef {
    pub account_id: String,
    pub protocol: String,
}

impl AccountRef {
    pub fn new(account_id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            protocol: protocol.into(),
        }
    }
}

// ── Records delivered by backends ─────────────────────────────────────────────

/// Address book entry as delivered by a contact data source. Becomes a
/// master contact once it lands in a collection.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ContactRecord {
    pub uid: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub presence: Presence,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl ContactRecord {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Record for a master that only exists to wrap `roster_uid` until the
    /// user saves it.
    pub fn temporary_for(roster_uid: &str) -> Self {
        Self::new(format!("{TEMPORARY_UID_PREFIX}{roster_uid}"))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.set(ATTR_FULL_NAME, name);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Per-account identity as delivered by a roster backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct RosterRecord {
    pub uid: String,
    pub account: AccountRef,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub presence: Presence,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl RosterRecord {
    pub fn new(uid: impl Into<String>, account: AccountRef) -> Self {
        Self {
            uid: uid.into(),
            account,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.set(ATTR_FULL_NAME, name);
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}
