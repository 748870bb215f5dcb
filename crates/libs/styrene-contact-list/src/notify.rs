//! Row-level notifications for list consumers.

use crate::source::SequenceStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ListEvent {
    RowInserted { index: usize },
    RowDeleted { index: usize },
    RowChanged { index: usize },
    /// `new_order[new_index] == old_index`.
    RowsReordered { new_order: Vec<usize> },
    LoadingFinished { status: SequenceStatus },
}

pub trait ListObserver {
    fn on_list_event(&mut self, event: &ListEvent);
}

impl<F> ListObserver for F
where
    F: FnMut(&ListEvent),
{
    fn on_list_event(&mut self, event: &ListEvent) {
        self(event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn ListObserver>)>,
}

impl Observers {
    pub fn subscribe(&mut self, observer: Box<dyn ListObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(other, _)| *other != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &ListEvent) {
        log::trace!("list event {event:?}");
        for (_, observer) in &mut self.entries {
            observer.on_list_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
