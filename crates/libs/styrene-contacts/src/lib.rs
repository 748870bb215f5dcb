//! # styrene-contacts
//!
//! Identity graph for the Styrene address book.
//!
//! A *roster contact* is one identity on one account (a mesh peer, an XMPP
//! buddy, a SIP address). A *master contact* is what the user sees in the
//! address book: it aggregates any number of roster contacts and derives its
//! presence and capabilities from them.
//!
//! This crate provides:
//!
//! - **Boundary types** ([`ContactRecord`], [`RosterRecord`], [`Attributes`])
//!   delivered by backends
//! - **[`Capabilities`]** and the OR-reduction that combines them
//! - **[`Presence`]** and the total order used to pick the one to display
//! - **[`IdentityGraph`]** owning contacts, attachment edges, and the
//!   listener table that keeps derived state current
//!
//! ## Example
//!
//! ```rust
//! use contacts_core::{
//!     AccountRef, Capabilities, ContactRecord, IdentityGraph, Presence, PresenceType,
//!     RosterRecord,
//! };
//!
//! let mut graph = IdentityGraph::new();
//! let bob = graph.insert_master(ContactRecord::new("bob").with_name("Bob"));
//! let roster = graph.insert_roster(
//!     RosterRecord::new("bob@mesh", AccountRef::new("mesh0", "lxmf"))
//!         .with_capabilities(Capabilities::CHAT)
//!         .with_presence(Presence::new(PresenceType::Available)),
//! );
//!
//! graph.attach(bob, roster).unwrap();
//! assert!(graph.capabilities(bob).contains(Capabilities::CHAT));
//! assert_eq!(graph.resolve_presence(bob).unwrap().kind, PresenceType::Available);
//! ```

pub mod capability;
pub mod error;
pub mod events;
pub mod graph;
pub mod presence;
pub mod types;

pub use capability::Capabilities;
pub use error::GraphError;
pub use events::{ContactProperty, GraphEvent};
pub use graph::{Contact, IdentityGraph, MasterState, PresenceSource, RosterState};
pub use presence::{Presence, PresenceType};
pub use types::*;
