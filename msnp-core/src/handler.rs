// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Event Handler
//!
//! Folds presence and server-initiated list commands into the
//! [`AddressBook`].
//!
//! ```text
//! NLN <status> <type:account>[;via=9:abid@host] <name> <caps> [<msnobj>]
//! ILN <trid> <status> <type:account> <name> <caps> [<msnobj>]
//! FLN <type:account>[;via=9:abid@host] [caps]
//! ADL 0 <len>\r\n<ml><d n="domain"><c n="user" l="8" t="1"/></d></ml>
//! RML 0 <len>\r\n<ml>...</ml>
//! ```

use std::sync::Arc;

use crate::address_book::AddressBook;
use crate::circle::Circle;
use crate::contact::{
    parse_client_type_and_account, parse_guid_or_nil, ClientType, Contact, EndPoint, MsnLists,
    PresenceStatus,
};
use crate::error::{MsnpError, MsnpResult, ParseError};
use crate::msnobject::{parse_attributes, DisplayImage, MsnObject};
use crate::protocol::{percent_decode, Command, MessageHandler, MessageProcessor};

/// One contact named in an `<ml>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEntry {
    pub account: String,
    pub client_type: ClientType,
    pub lists: MsnLists,
}

/// Parses an `<ml>` list payload.
///
/// Entries with an unknown client type are logged and skipped.
pub fn parse_membership_list(payload: &str) -> Vec<MembershipEntry> {
    let mut entries = Vec::new();
    let mut domain = String::new();

    for element in payload.split('<') {
        let element = element.trim();
        if element.starts_with("d ") {
            domain = parse_attributes(element).remove("n").unwrap_or_default();
        } else if element.starts_with("c ") {
            let attrs = parse_attributes(element);
            let Some(name) = attrs.get("n") else {
                continue;
            };
            let type_code = attrs.get("t").map_or("1", String::as_str);
            let client_type = match ClientType::parse(type_code) {
                Ok(client_type) => client_type,
                Err(err) => {
                    tracing::warn!(value = type_code, error = %err, "skipping membership entry");
                    continue;
                }
            };
            let lists = attrs
                .get("l")
                .and_then(|l| l.parse::<u8>().ok())
                .map_or(MsnLists::NONE, MsnLists::from_bits);
            let account = if domain.is_empty() {
                name.to_lowercase()
            } else {
                format!("{}@{}", name, domain).to_lowercase()
            };
            entries.push(MembershipEntry {
                account,
                client_type,
                lists,
            });
        }
    }
    entries
}

/// Parsed account token of a presence command.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AccountToken {
    client_type: ClientType,
    account: String,
    end_point: Option<uuid::Uuid>,
    via: Option<String>,
}

fn parse_account_token(token: &str) -> Result<AccountToken, ParseError> {
    let mut parts = token.split(';');
    let head = parts.next().unwrap_or_default();
    let (client_type, account) = parse_client_type_and_account(head)?;
    let mut parsed = AccountToken {
        client_type,
        account,
        end_point: None,
        via: None,
    };
    for part in parts {
        if let Some(via) = part.strip_prefix("via=") {
            parsed.via = Some(via.to_string());
        } else if let Some(epid) = part.strip_prefix("epid=") {
            parsed.end_point = Some(parse_guid_or_nil(epid));
        } else if part.starts_with('{') {
            parsed.end_point = Some(parse_guid_or_nil(part));
        }
    }
    Ok(parsed)
}

/// Applies contact-related commands to an [`AddressBook`].
#[derive(Debug)]
pub struct ContactEventHandler {
    address_book: Arc<AddressBook>,
}

impl ContactEventHandler {
    pub fn new(address_book: Arc<AddressBook>) -> Self {
        ContactEventHandler { address_book }
    }

    pub fn address_book(&self) -> &Arc<AddressBook> {
        &self.address_book
    }

    fn on_presence(&self, command: &Command) -> MsnpResult<()> {
        let (status, token, name, msnobject) = match command.verb() {
            "FLN" => (PresenceStatus::Offline, command.arg(0), None, None),
            _ => {
                let code = command.arg(0).unwrap_or_default();
                let status = match PresenceStatus::from_code(code) {
                    Ok(status) => status,
                    Err(err) => {
                        tracing::warn!(verb = command.verb(), error = %err, "ignoring presence");
                        return Ok(());
                    }
                };
                (status, command.arg(1), command.arg(2), command.arg(4))
            }
        };
        let token = match token.map(parse_account_token) {
            Some(Ok(token)) => token,
            Some(Err(err)) => {
                tracing::warn!(verb = command.verb(), error = %err, "ignoring presence");
                return Ok(());
            }
            None => {
                tracing::warn!(verb = command.verb(), "presence without account");
                return Ok(());
            }
        };

        let Some(contact) = self.resolve(&token) else {
            tracing::debug!(
                verb = command.verb(),
                account = %token.account,
                "presence for unknown contact"
            );
            return Ok(());
        };

        if let Some(name) = name {
            contact.set_display_name(&percent_decode(name));
        }
        if let Some(epid) = token.end_point.filter(|id| !id.is_nil()) {
            if status == PresenceStatus::Offline {
                contact.remove_end_point(epid);
            } else {
                contact.upsert_end_point(EndPoint {
                    id: epid,
                    name: None,
                    status,
                });
            }
        }
        if let Some(context) = msnobject.filter(|c| *c != "0") {
            self.apply_msnobject(&contact, context);
        }

        self.address_book.set_presence(&contact, status);
        for sibling in self.address_book.manager().siblings(&contact) {
            self.address_book.set_presence(&sibling, status);
        }
        Ok(())
    }

    fn apply_msnobject(&self, contact: &Arc<Contact>, context: &str) {
        let object = match MsnObject::parse(context) {
            Ok(object) => object,
            Err(err) => {
                tracing::warn!(contact = %contact.key(), error = %err, "bad msnobject");
                return;
            }
        };
        if contact
            .display_image()
            .is_some_and(|image| image.sha1c() == object.sha1c())
        {
            return;
        }
        let catalog = self.address_book.catalog();
        match catalog.get_data(object.sha1c()) {
            Some(data) => {
                let image = DisplayImage::new(object.creator(), (*data).clone());
                self.address_book.set_display_image(contact, image);
            }
            None => {
                // Bytes arrive later through a transfer; remember the descriptor.
                catalog.add(object, None);
            }
        }
    }

    fn on_membership(&self, command: &Command) -> MsnpResult<()> {
        let Some(payload) = command.payload_text() else {
            // Acknowledgement of our own ADL/RML.
            return Ok(());
        };
        let adding = command.verb() == "ADL";
        for entry in parse_membership_list(&payload) {
            if adding {
                let contact = self
                    .address_book
                    .add_contact(&entry.account, entry.client_type);
                self.address_book.add_to_list(&contact, entry.lists);
            } else if let Some(contact) = self
                .address_book
                .get_contact(&entry.account, entry.client_type)
            {
                self.address_book.remove_from_list(&contact, entry.lists);
            } else {
                tracing::debug!(account = %entry.account, "RML for unknown contact");
            }
        }
        Ok(())
    }

    fn resolve(&self, token: &AccountToken) -> Option<Arc<Contact>> {
        match &token.via {
            Some(via) => {
                let circle: Arc<Circle> = self.address_book.circle_by_address(via)?;
                circle.members().get_typed(&token.account, token.client_type)
            }
            None => self
                .address_book
                .get_contact(&token.account, token.client_type),
        }
    }
}

impl MessageHandler for ContactEventHandler {
    fn handle_message(
        &self,
        _processor: &dyn MessageProcessor,
        command: Command,
    ) -> Result<(), MsnpError> {
        match command.verb() {
            "NLN" | "ILN" | "FLN" => self.on_presence(&command),
            "ADL" | "RML" => self.on_membership(&command),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "ContactEventHandler"
    }
}
