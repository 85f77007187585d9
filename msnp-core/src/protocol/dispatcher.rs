// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Dispatcher
//!
//! Delivers every parsed command to every registered handler.
//!
//! - The handler list is copied before delivery; registrations made while a
//!   command is in flight apply to the next command.
//! - Each handler receives its own clone of the command.
//! - A handler that returns an error or panics is reported through the
//!   event channel; delivery to the remaining handlers continues.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use super::command::Command;
use super::processor::MessageProcessor;
use crate::error::MsnpError;
use crate::events::{ClientEvent, EventDispatcher};

/// Receives commands from a [`MessageDispatcher`].
pub trait MessageHandler: Send + Sync {
    /// Handles one command. `command` is owned by this handler.
    fn handle_message(
        &self,
        processor: &dyn MessageProcessor,
        command: Command,
    ) -> Result<(), MsnpError>;

    /// Name used in failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Handlers that received the command.
    pub delivered: usize,
    /// Handlers that failed on it.
    pub failed: usize,
}

/// Fan-out of commands to registered handlers.
pub struct MessageDispatcher {
    handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
    events: Arc<EventDispatcher>,
}

impl MessageDispatcher {
    pub fn new(events: Arc<EventDispatcher>) -> Self {
        MessageDispatcher {
            handlers: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    /// Registers a handler. Registering the same handler twice is a no-op.
    pub fn register_handler(&self, handler: Arc<dyn MessageHandler>) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    pub fn unregister_handler(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers `command` to a snapshot of the registered handlers.
    pub fn dispatch(&self, processor: &dyn MessageProcessor, command: &Command) -> DispatchReport {
        let handlers: Vec<Arc<dyn MessageHandler>> = self.handlers.read().clone();
        let mut report = DispatchReport::default();

        for handler in handlers {
            report.delivered += 1;
            let copy = command.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.handle_message(processor, copy)
            }));

            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            report.failed += 1;
            let error = MsnpError::Handler {
                verb: command.verb().to_string(),
                handler: handler.name().to_string(),
                message: message.clone(),
            };
            tracing::error!(
                connection = %processor.connection_id(),
                command = %command,
                "{}",
                error
            );
            self.events.dispatch(ClientEvent::HandlerFailed {
                verb: command.verb().to_string(),
                handler: handler.name().to_string(),
                message,
            });
        }

        report
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
