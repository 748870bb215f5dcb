//! The seam through which contact records reach a list store.

use std::cell::RefCell;
use std::rc::Rc;

use contacts_core::ContactRecord;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Outcome of an initial load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceStatus {
    Ok,
    Failed(String),
}

/// Batch delivered by a contact source.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    ItemsAdded(Vec<ContactRecord>),
    ItemsChanged(Vec<ContactRecord>),
    /// Contact uids.
    ItemsRemoved(Vec<String>),
    SequenceComplete(SequenceStatus),
}

/// A query over some contact store that streams its results.
pub trait ContactSource {
    fn name(&self) -> &str;

    /// Whether [`ContactSource::start`] has already run.
    fn is_streaming(&self) -> bool;

    /// Whether a streaming source may feed more than one store.
    fn is_multiplexable(&self) -> bool {
        false
    }

    /// Opens a new event stream. Dropping the receiver unsubscribes.
    fn subscribe(&mut self) -> UnboundedReceiver<SourceEvent>;

    fn start(&mut self);
}

/// In-memory source.
///
/// Clones share state, so a test or tool can keep one handle to push batches
/// while a store owns another. Contents seeded before `start` are delivered
/// as one `ItemsAdded` batch followed by `SequenceComplete`. A multiplexable
/// source replays its current contents to subscribers that join late.
#[derive(Clone, Debug)]
pub struct ChannelSource {
    name: String,
    inner: Rc<RefCell<ChannelInner>>,
}

#[derive(Debug, Default)]
struct ChannelInner {
    streaming: bool,
    multiplexable: bool,
    contents: Vec<ContactRecord>,
    subscribers: Vec<UnboundedSender<SourceEvent>>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Rc::default(),
        }
    }

    pub fn multiplexable(self) -> Self {
        self.inner.borrow_mut().multiplexable = true;
        self
    }

    pub fn with_contacts(self, records: impl IntoIterator<Item = ContactRecord>) -> Self {
        self.inner.borrow_mut().contents.extend(records);
        self
    }

    pub fn add(&self, records: Vec<ContactRecord>) {
        self.inner
            .borrow_mut()
            .contents
            .extend(records.iter().cloned());
        self.emit(SourceEvent::ItemsAdded(records));
    }

    pub fn change(&self, records: Vec<ContactRecord>) {
        {
            let mut inner = self.inner.borrow_mut();
            for record in &records {
                for existing in inner.contents.iter_mut().filter(|c| c.uid == record.uid) {
                    *existing = record.clone();
                }
            }
        }
        self.emit(SourceEvent::ItemsChanged(records));
    }

    pub fn remove<I, S>(&self, uids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let uids: Vec<String> = uids.into_iter().map(Into::into).collect();
        self.inner
            .borrow_mut()
            .contents
            .retain(|c| !uids.contains(&c.uid));
        self.emit(SourceEvent::ItemsRemoved(uids));
    }

    pub fn complete(&self, status: SequenceStatus) {
        self.emit(SourceEvent::SequenceComplete(status));
    }

    /// Live subscribers; closed ones are pruned first.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }

    fn emit(&self, event: SourceEvent) {
        let mut inner = self.inner.borrow_mut();
        if !inner.streaming {
            log::trace!(
                "source {} not started; holding {:?} until start",
                self.name,
                event
            );
            return;
        }
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl ContactSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_streaming(&self) -> bool {
        self.inner.borrow().streaming
    }

    fn is_multiplexable(&self) -> bool {
        self.inner.borrow().multiplexable
    }

    fn subscribe(&mut self) -> UnboundedReceiver<SourceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.borrow_mut();
        if inner.streaming {
            if !inner.contents.is_empty() {
                let _ = tx.send(SourceEvent::ItemsAdded(inner.contents.clone()));
            }
            let _ = tx.send(SourceEvent::SequenceComplete(SequenceStatus::Ok));
        }
        inner.subscribers.push(tx);
        rx
    }

    fn start(&mut self) {
        let initial = {
            let mut inner = self.inner.borrow_mut();
            if inner.streaming {
                return;
            }
            inner.streaming = true;
            inner.contents.clone()
        };
        log::debug!(
            "source {} streaming {} initial contacts",
            self.name,
            initial.len()
        );
        if !initial.is_empty() {
            self.emit(SourceEvent::ItemsAdded(initial));
        }
        self.emit(SourceEvent::SequenceComplete(SequenceStatus::Ok));
    }
}
