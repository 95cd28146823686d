//! Listener lists backing `subscribe` on entities and collections.
//!
//! # Invariants
//! - Listeners are invoked after every internal lock is released, so a
//!   listener may read back from the store that notified it.
//! - Dropping a [`Subscription`] unregisters its listener.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct ListenerTable<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Shared list of change listeners for one store object.
pub(crate) struct Listeners<E> {
    table: Arc<Mutex<ListenerTable<E>>>,
}

impl<E: 'static> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub(crate) fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut table = self.table.lock();
            table.next_id += 1;
            let id = table.next_id;
            table.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<ListenerTable<E>>> = Arc::downgrade(&self.table);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(table) = weak.upgrade() {
                    table.lock().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    pub(crate) fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .table
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table.lock().entries.len()
    }
}

/// Handle returned by `subscribe`; unregisters on drop.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregisters the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keeps the listener registered for the lifetime of the store object.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
