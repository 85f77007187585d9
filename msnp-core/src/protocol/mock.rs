// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock transport and processor for tests.
//!
//! Both record what was sent and can be switched offline or made to fail.
//! Clones share state, so a test can keep a handle after moving a clone
//! into a connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::command::Command;
use super::processor::{ByteTransport, MessageProcessor};
use super::sequencer::TransactionSequencer;
use crate::error::NetworkError;

#[derive(Debug)]
struct MockState {
    sent: Mutex<Vec<Vec<u8>>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
}

/// In-memory [`ByteTransport`].
#[derive(Debug, Clone)]
pub struct MockByteTransport {
    state: Arc<MockState>,
}

impl Default for MockByteTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockByteTransport {
    /// Creates a connected mock transport.
    pub fn new() -> Self {
        MockByteTransport {
            state: Arc::new(MockState {
                sent: Mutex::new(Vec::new()),
                connected: AtomicBool::new(true),
                fail_sends: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes subsequent sends fail with `SendFailed`.
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Raw byte blocks sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.sent.lock().clone()
    }

    /// Sent blocks parsed back into commands. Unparsable blocks are skipped.
    pub fn sent_commands(&self) -> Vec<Command> {
        self.state
            .sent
            .lock()
            .iter()
            .filter_map(|bytes| Command::parse(bytes).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.state.sent.lock().clear();
    }
}

impl ByteTransport for MockByteTransport {
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), NetworkError> {
        if !self.state.connected.load(Ordering::SeqCst) {
            return Err(NetworkError::NotConnected);
        }
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(NetworkError::SendFailed("mock failure".into()));
        }
        self.state.sent.lock().push(bytes.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

/// [`MessageProcessor`] that records commands instead of serializing them.
#[derive(Debug)]
pub struct RecordingProcessor {
    id: Uuid,
    sequencer: TransactionSequencer,
    sent: Mutex<Vec<Command>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
}

impl Default for RecordingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingProcessor {
    pub fn new() -> Self {
        RecordingProcessor {
            id: Uuid::new_v4(),
            sequencer: TransactionSequencer::new(),
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl MessageProcessor for RecordingProcessor {
    fn connection_id(&self) -> Uuid {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn increase_transaction_id(&self) -> u32 {
        self.sequencer.increase_transaction_id()
    }

    fn send_message(&self, mut command: Command) -> Result<Option<u32>, NetworkError> {
        if !self.is_connected() {
            return Err(NetworkError::NotConnected);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NetworkError::SendFailed("mock failure".into()));
        }
        let trid = if command.takes_transaction_id() {
            let trid = self.increase_transaction_id();
            command.set_transaction_id(trid);
            Some(trid)
        } else {
            None
        };
        self.sent.lock().push(command);
        Ok(trid)
    }
}
