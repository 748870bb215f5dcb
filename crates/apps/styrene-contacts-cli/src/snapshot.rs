use anyhow::{Context, Result};
use contacts_core::{
    AccountRef, Capabilities, ContactRecord, Presence, PresenceType, RosterRecord, ATTR_NICKNAME,
    ATTR_PINNED,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_PROTOCOL: &str = "lxmf";

/// Address book contents as stored on disk: saved contacts plus the roster
/// contacts each account currently reports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
    #[serde(default)]
    pub rosters: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactEntry {
    pub uid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub presence: Option<PresenceType>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RosterEntry {
    pub uid: String,
    pub account: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub presence: Option<PresenceType>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Uids of the saved contacts this identity belongs to. Empty means the
    /// identity is shown under a temporary contact of its own.
    #[serde(default)]
    pub masters: Vec<String>,
}

impl Snapshot {
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).context("invalid address book snapshot")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("in {}", path.display()))
    }
}

impl ContactEntry {
    pub fn to_record(&self) -> ContactRecord {
        let mut record = ContactRecord::new(&self.uid).with_capabilities(self.capabilities);
        if let Some(name) = &self.name {
            record = record.with_name(name);
        }
        if let Some(nickname) = &self.nickname {
            record = record.with_attribute(ATTR_NICKNAME, nickname);
        }
        if self.pinned {
            record = record.with_attribute(ATTR_PINNED, "true");
        }
        if let Some(kind) = self.presence {
            record = record.with_presence(Presence::new(kind));
        }
        record
    }
}

impl RosterEntry {
    pub fn to_record(&self) -> RosterRecord {
        let protocol = self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
        let mut record = RosterRecord::new(&self.uid, AccountRef::new(&self.account, protocol))
            .with_capabilities(self.capabilities);
        if let Some(name) = &self.name {
            record = record.with_name(name);
        }
        if let Some(kind) = self.presence {
            let mut presence = Presence::new(kind);
            if let Some(message) = &self.message {
                presence = presence.with_message(message);
            }
            record = record.with_presence(presence);
        }
        if let Some(avatar) = &self.avatar {
            record = record.with_avatar(avatar);
        }
        record
    }
}
