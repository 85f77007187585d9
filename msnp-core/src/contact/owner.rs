// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The signed-in user.

use std::sync::Arc;

use uuid::Uuid;

use super::{ClientType, Contact, PresenceStatus, DEFAULT_ADDRESS_BOOK_ID};

/// The signed-in user: a passport contact in the individual address book,
/// plus the endpoint id of this machine.
#[derive(Debug, Clone)]
pub struct Owner {
    contact: Arc<Contact>,
    machine_guid: Uuid,
}

impl Owner {
    pub fn new(account: &str, machine_guid: Uuid) -> Self {
        Owner {
            contact: Arc::new(Contact::new(
                DEFAULT_ADDRESS_BOOK_ID,
                account,
                ClientType::Passport,
            )),
            machine_guid,
        }
    }

    pub fn contact(&self) -> &Arc<Contact> {
        &self.contact
    }

    pub fn account(&self) -> &str {
        self.contact.account()
    }

    pub fn machine_guid(&self) -> Uuid {
        self.machine_guid
    }

    pub fn status(&self) -> PresenceStatus {
        self.contact.status()
    }

    pub fn set_status(&self, status: PresenceStatus) {
        self.contact.set_status(status);
    }

    /// `1:account;epid={guid}` as used in routing headers.
    pub fn endpoint_address(&self) -> String {
        format!(
            "{}:{};epid={{{}}}",
            ClientType::Passport.code(),
            self.account(),
            self.machine_guid
        )
    }
}
