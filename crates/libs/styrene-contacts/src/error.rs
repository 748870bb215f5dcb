use crate::types::ContactId;

/// Errors returned by identity graph operations.
///
/// Every variant is a caller contract violation. The graph rejects the
/// operation and leaves its state untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GraphError {
    #[error("unknown contact: {0:?}")]
    UnknownContact(ContactId),

    #[error("contact {0:?} cannot be attached to itself")]
    SelfAttachment(ContactId),

    #[error("contact {0:?} is not a master contact")]
    NotMaster(ContactId),

    #[error("contact {0:?} is not a roster contact")]
    NotRoster(ContactId),

    #[error("roster contact {roster:?} is already attached to {master:?}")]
    AlreadyAttached {
        master: ContactId,
        roster: ContactId,
    },

    #[error("roster contact {roster:?} is not attached to {master:?}")]
    NotAttached {
        master: ContactId,
        roster: ContactId,
    },
}
