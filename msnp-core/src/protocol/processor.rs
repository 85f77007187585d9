// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Processor
//!
//! The core never touches sockets. A [`ByteTransport`] supplied by the host
//! sends bytes; the host feeds received bytes into
//! [`NotificationConnection::on_bytes_received`].

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::command::Command;
use super::dispatcher::{DispatchReport, MessageDispatcher};
use super::framer::CommandFramer;
use super::sequencer::TransactionSequencer;
use crate::config::ClientConfig;
use crate::error::NetworkError;
use crate::events::ClientEvent;

/// Byte-level send primitive provided by the transport layer.
pub trait ByteTransport: Send + Sync {
    /// Sends raw bytes.
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), NetworkError>;

    /// Returns true if the underlying socket is connected.
    fn is_connected(&self) -> bool;
}

/// Outbound side of a connection, as seen by handlers and schedulers.
pub trait MessageProcessor: Send + Sync {
    /// Identifies this connection in logs and scheduler ownership.
    fn connection_id(&self) -> Uuid;

    /// Returns true if sends can currently succeed.
    fn is_connected(&self) -> bool;

    /// Issues the next transaction id of this connection.
    fn increase_transaction_id(&self) -> u32;

    /// Stamps `command` with a transaction id (unless its verb takes none)
    /// and sends it. Returns the id used.
    fn send_message(&self, command: Command) -> Result<Option<u32>, NetworkError>;
}

/// A protocol connection over a host-supplied transport.
pub struct NotificationConnection<T: ByteTransport> {
    id: Uuid,
    transport: T,
    sequencer: TransactionSequencer,
    framer: Mutex<CommandFramer>,
    /// Serializes framing + dispatch so commands reach handlers in arrival order.
    receive_lock: Mutex<()>,
    dispatcher: Arc<MessageDispatcher>,
}

impl<T: ByteTransport> NotificationConnection<T> {
    pub fn new(transport: T, dispatcher: Arc<MessageDispatcher>, config: &ClientConfig) -> Self {
        NotificationConnection {
            id: Uuid::new_v4(),
            transport,
            sequencer: TransactionSequencer::new(),
            framer: Mutex::new(CommandFramer::new(config.max_payload_size)),
            receive_lock: Mutex::new(()),
            dispatcher,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    /// Last transaction id issued.
    pub fn current_transaction_id(&self) -> u32 {
        self.sequencer.current()
    }

    /// Frames `bytes` and dispatches each complete command in order.
    ///
    /// Parse failures are logged and reported as events; they never
    /// propagate to the transport.
    pub fn on_bytes_received(&self, bytes: &[u8]) -> Vec<DispatchReport> {
        let _guard = self.receive_lock.lock();
        let framed = {
            let mut framer = self.framer.lock();
            framer.feed(bytes);
            framer.drain()
        };

        let mut reports = Vec::new();
        for result in framed {
            match result {
                Ok(command) => {
                    tracing::trace!(connection = %self.id, command = %command, "received");
                    reports.push(self.dispatcher.dispatch(self, &command));
                }
                Err(err) => {
                    tracing::warn!(connection = %self.id, error = %err, "dropping unparsable command");
                    self.dispatcher.events().dispatch(ClientEvent::ParseFailed {
                        message: err.to_string(),
                    });
                }
            }
        }
        reports
    }

    /// Clears buffered input and restarts transaction ids at 0.
    pub fn reset(&self) {
        let _guard = self.receive_lock.lock();
        self.framer.lock().clear();
        self.sequencer.reset();
        tracing::debug!(connection = %self.id, "connection reset");
    }
}

impl<T: ByteTransport> MessageProcessor for NotificationConnection<T> {
    fn connection_id(&self) -> Uuid {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn increase_transaction_id(&self) -> u32 {
        self.sequencer.increase_transaction_id()
    }

    fn send_message(&self, mut command: Command) -> Result<Option<u32>, NetworkError> {
        if !self.transport.is_connected() {
            return Err(NetworkError::NotConnected);
        }
        let trid = if command.takes_transaction_id() {
            let trid = self.increase_transaction_id();
            command.set_transaction_id(trid);
            Some(trid)
        } else {
            None
        };
        tracing::trace!(connection = %self.id, command = %command, "sending");
        self.transport.send_bytes(&command.serialize())?;
        Ok(trid)
    }
}

impl<T: ByteTransport> std::fmt::Debug for NotificationConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConnection")
            .field("id", &self.id)
            .field("transaction_id", &self.sequencer.current())
            .finish()
    }
}
