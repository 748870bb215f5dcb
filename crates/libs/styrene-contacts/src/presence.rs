//! Presence records and the order used to pick which one a master displays.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Connectivity state reported by an account backend.
///
/// Declaration order is the ranking: later variants are more actionable.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PresenceType {
    /// Nothing reported yet. Loses against everything.
    #[default]
    Unset,
    Error,
    Unknown,
    Offline,
    Hidden,
    ExtendedAway,
    Away,
    Busy,
    Available,
}

impl PresenceType {
    pub const fn rank(self) -> u8 {
        match self {
            Self::Unset => 0,
            Self::Error => 1,
            Self::Unknown => 2,
            Self::Offline => 3,
            Self::Hidden => 4,
            Self::ExtendedAway => 5,
            Self::Away => 6,
            Self::Busy => 7,
            Self::Available => 8,
        }
    }

    /// Reachable right now, even if not attentive.
    pub const fn is_online(self) -> bool {
        self.rank() >= Self::ExtendedAway.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::Offline => "offline",
            Self::Hidden => "hidden",
            Self::ExtendedAway => "extended_away",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Available => "available",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Presence {
    pub kind: PresenceType,
    /// Backend-specific status token, e.g. `"dnd"` for a busy variant.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Presence {
    pub fn new(kind: PresenceType) -> Self {
        Self {
            kind,
            status: kind.as_str().to_string(),
            message: None,
            location: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_set(&self) -> bool {
        self.kind != PresenceType::Unset
    }

    /// Orders by rank only; status text and message never break ties.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.kind.rank().cmp(&other.kind.rank())
    }

    pub fn is_better_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

/// Picks the best presence among `candidates`, starting from `incumbent`.
///
/// A candidate replaces the current best only when strictly better, so equal
/// ranks keep whichever was seen first. A candidate carrying the incumbent's
/// key is skipped.
pub fn choose_best<'a, K, I>(incumbent: Option<(K, &'a Presence)>, candidates: I) -> Option<K>
where
    K: Copy + PartialEq,
    I: IntoIterator<Item = (K, &'a Presence)>,
{
    let mut best = incumbent;
    for (key, presence) in candidates {
        match best {
            Some((best_key, _)) if best_key == key => continue,
            Some((_, best_presence)) if !presence.is_better_than(best_presence) => continue,
            _ => best = Some((key, presence)),
        }
    }
    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_follows_declaration_order() {
        let order = [
            PresenceType::Unset,
            PresenceType::Error,
            PresenceType::Unknown,
            PresenceType::Offline,
            PresenceType::Hidden,
            PresenceType::ExtendedAway,
            PresenceType::Away,
            PresenceType::Busy,
            PresenceType::Available,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank(), "{pair:?}");
        }
    }

    #[test]
    fn unset_is_weakest() {
        let unset = Presence::default();
        let unknown = Presence::new(PresenceType::Unknown);
        assert!(unknown.is_better_than(&unset));
        assert!(!unset.is_better_than(&unset));
    }

    #[test]
    fn choose_best_keeps_incumbent_on_tie() {
        let away = Presence::new(PresenceType::Away);
        let also_away = Presence::new(PresenceType::Away).with_message("lunch");
        assert_eq!(choose_best(Some((1, &away)), [(2, &also_away)]), Some(1));
    }

    #[test]
    fn choose_best_first_found_wins_among_equals() {
        let offline = Presence::new(PresenceType::Offline);
        let busy_a = Presence::new(PresenceType::Busy);
        let busy_b = Presence::new(PresenceType::Busy);
        let candidates = [(1, &offline), (2, &busy_a), (3, &busy_b)];
        assert_eq!(choose_best(None, candidates), Some(2));
    }

    #[test]
    fn choose_best_skips_incumbent_key() {
        let online = Presence::new(PresenceType::Available);
        let offline = Presence::new(PresenceType::Offline);
        assert_eq!(choose_best(Some((7, &offline)), [(7, &online)]), Some(7));
    }

    #[test]
    fn choose_best_of_nothing_is_none() {
        assert_eq!(choose_best::<u8, _>(None, []), None);
    }

    #[test]
    fn presence_type_uses_snake_case() {
        let json = serde_json::to_string(&PresenceType::ExtendedAway).expect("serialize");
        assert_eq!(json, "\"extended_away\"");
    }
}
