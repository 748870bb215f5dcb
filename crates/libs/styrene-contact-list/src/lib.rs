//! # styrene-contact-list
//!
//! List model for address book frontends. A [`ListStore`] turns the batches a
//! [`ContactSource`] streams into an indexable sequence of rows, each backed by
//! a master contact in the store's [`contacts_core::IdentityGraph`].
//!
//! Structural changes are reported immediately. Change notifications and
//! reordering are deferred to [`ListStore::tick`], so many updates within one
//! main-loop iteration cost one resort.
//!
//! ## Example
//!
//! ```rust
//! use contact_list::{ChannelSource, ListStore, ListStoreConfig};
//! use contacts_core::ContactRecord;
//!
//! let source = ChannelSource::new("book").with_contacts([
//!     ContactRecord::new("bob").with_name("Bob"),
//!     ContactRecord::new("ann").with_name("Ann"),
//! ]);
//! let mut store = ListStore::new(ListStoreConfig::default());
//! store.set_source(source.clone()).unwrap();
//! store.tick();
//!
//! assert_eq!(store.row_at(0).map(|row| row.uid()), Some("ann"));
//! source.remove(["ann"]);
//! store.tick();
//! assert_eq!(store.row_at(0).map(|row| row.uid()), Some("bob"));
//! ```

mod array;
pub mod config;
pub mod error;
mod index;
pub mod notify;
pub mod sort;
pub mod source;
pub mod store;

pub use array::{Balloon, RowKey};
pub use config::{ConfigError, ListStoreConfig, DEFAULT_PREALLOC_CHUNK};
pub use error::ListError;
pub use notify::{ListEvent, ListObserver, ObserverId};
pub use sort::{GroupSort, PrimarySort, SortKey, SortScheduler};
pub use source::{ChannelSource, ContactSource, SequenceStatus, SourceEvent};
pub use store::{ListStore, ListStoreRow};
