// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification session: the signed-in connection and its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::contact::Owner;
use crate::error::{MsnpError, MsnpResult};
use crate::protocol::{Command, MessageProcessor};

/// The notification server connection as seen by circles and handlers.
pub struct NotificationSession {
    processor: Arc<dyn MessageProcessor>,
    owner: Owner,
    signed_in: AtomicBool,
}

impl NotificationSession {
    pub fn new(processor: Arc<dyn MessageProcessor>, owner: Owner) -> Self {
        NotificationSession {
            processor,
            owner,
            signed_in: AtomicBool::new(false),
        }
    }

    pub fn processor(&self) -> &Arc<dyn MessageProcessor> {
        &self.processor
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    pub fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.store(signed_in, Ordering::SeqCst);
        tracing::info!(
            account = self.owner.account(),
            connection = %self.processor.connection_id(),
            signed_in,
            "session state changed"
        );
    }

    /// Sends `command` if the session is signed in.
    pub fn send(&self, command: Command) -> MsnpResult<Option<u32>> {
        if !self.is_signed_in() {
            return Err(MsnpError::NotSignedIn(format!(
                "cannot send {}",
                command.verb()
            )));
        }
        Ok(self.processor.send_message(command)?)
    }
}

impl std::fmt::Debug for NotificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSession")
            .field("connection", &self.processor.connection_id())
            .field("owner", &self.owner.account())
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}
