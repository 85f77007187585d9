//! Event System
//!
//! Observer registration for client core notifications.
//!
//! # Ordering and re-entrancy
//!
//! Handlers are called in registration order on the thread that raised the
//! event. The handler list is copied before delivery, so a handler may add
//! or remove handlers from inside its callback; the change applies from the
//! next event on.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::contact::{ContactKey, MsnLists, PresenceStatus};

/// Events emitted by the client core.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A contact record was added to an address book.
    ContactAdded {
        /// The contact key.
        contact: ContactKey,
    },

    /// A contact record was removed.
    ContactRemoved {
        /// The contact key.
        contact: ContactKey,
    },

    /// Membership lists of a contact changed (siblings included).
    ListsChanged {
        contact: ContactKey,
        lists: MsnLists,
    },

    /// Presence of a contact changed.
    PresenceChanged {
        contact: ContactKey,
        status: PresenceStatus,
    },

    /// A contact's display image changed.
    DisplayImageChanged {
        contact: ContactKey,
    },

    /// A circle was created from address-book data.
    CircleAdded {
        /// Circle address book id.
        address_book_id: uuid::Uuid,
    },

    /// A circle was removed.
    CircleRemoved {
        address_book_id: uuid::Uuid,
    },

    /// A message handler failed while handling a command.
    HandlerFailed {
        /// Command verb.
        verb: String,
        /// Handler name.
        handler: String,
        /// Error description.
        message: String,
    },

    /// Received bytes could not be parsed into a command.
    ParseFailed {
        /// Error description.
        message: String,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive client events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: ClientEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(ClientEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(ClientEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(ClientEvent) + Send + Sync,
{
    fn on_event(&self, event: ClientEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event handler.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    /// Removes a handler previously added. Returns true if it was present.
    pub fn remove_handler(&self, handler: &Arc<dyn EventHandler>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: ClientEvent) {
        let handlers: Vec<Arc<dyn EventHandler>> = self.handlers.read().clone();
        for handler in handlers {
            handler.on_event(event.clone());
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
