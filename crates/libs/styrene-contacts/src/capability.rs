//! Contact capability flags and the OR-reduction that combines them.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Communication channels a contact can be reached on.
    ///
    /// A master contact can do anything one of its roster contacts can do,
    /// so combining is a plain bitwise OR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// Text chat.
        const CHAT = 1 << 0;
        /// Voice calls.
        const VOICE = 1 << 1;
        /// Video calls.
        const VIDEO = 1 << 2;
        /// Regular phone number.
        const PHONE = 1 << 3;
        /// Short messages.
        const SMS = 1 << 4;
        const EMAIL = 1 << 5;
        /// Postal address.
        const ADDRESS = 1 << 6;
    }
}

/// Combined capabilities of an identity: its own flags OR the flags of every
/// attached identity.
pub fn combine<I>(own: Capabilities, attached: I) -> Capabilities
where
    I: IntoIterator<Item = Capabilities>,
{
    attached.into_iter().fold(own, |acc, caps| acc | caps)
}
