//! Address book inspection tool: loads a snapshot into a contact list store
//! and prints the rows in list order.

pub mod app;
pub mod output;
pub mod snapshot;
pub mod view;
