// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Module
//!
//! A contact is identified by (address book id, account, client type). The
//! identity is immutable; everything else lives behind a per-contact lock.
//!
//! # Lock ordering
//!
//! A contact's own lock may be taken while holding a collection lock
//! (`ContactList`, `ContactManager`), never the other way round. Contact
//! methods never call back into a collection.

mod list;
mod owner;
mod types;

pub use list::{ContactFilter, ContactList, ContactSnapshot};
pub use owner::Owner;
pub use types::{
    normalize_account, parse_client_type_and_account, ClientType, ContactKey, MsnLists,
    PresenceStatus, SiblingKey, DEFAULT_ADDRESS_BOOK_ID,
};

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::msnobject::DisplayImage;

/// One signed-in device of a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndPoint {
    /// Endpoint id (`epid`).
    pub id: Uuid,
    /// Machine name reported by the endpoint.
    pub name: Option<String>,
    /// Presence of this endpoint.
    pub status: PresenceStatus,
}

/// Splits `account;{guid}` into account and endpoint id.
///
/// A missing endpoint part yields `Uuid::nil()`. So does an unparsable
/// guid, which is logged.
pub fn parse_endpoint_account(text: &str) -> (String, Uuid) {
    match text.split_once(';') {
        None => (normalize_account(text), Uuid::nil()),
        Some((account, epid)) => (normalize_account(account), parse_guid_or_nil(epid)),
    }
}

/// Parses a guid with or without braces; failures log and return nil.
pub fn parse_guid_or_nil(text: &str) -> Uuid {
    let trimmed = text.trim().trim_start_matches('{').trim_end_matches('}');
    match Uuid::parse_str(trimmed) {
        Ok(guid) => guid,
        Err(err) => {
            tracing::error!(value = text, error = %err, "unparsable guid, using empty guid");
            Uuid::nil()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ContactState {
    display_name: String,
    nickname: Option<String>,
    personal_message: Option<String>,
    lists: MsnLists,
    guid: Uuid,
    cid: i64,
    status: PresenceStatus,
    is_messenger_user: bool,
    display_image: Option<DisplayImage>,
    end_points: HashMap<Uuid, EndPoint>,
}

/// A contact record in one address book.
#[derive(Debug)]
pub struct Contact {
    key: ContactKey,
    state: Mutex<ContactState>,
}

impl Contact {
    /// Creates a contact with empty state.
    pub fn new(address_book_id: Uuid, account: &str, client_type: ClientType) -> Self {
        let key = ContactKey::new(address_book_id, account, client_type);
        let display_name = key.account().to_string();
        Contact {
            key,
            state: Mutex::new(ContactState {
                display_name,
                ..Default::default()
            }),
        }
    }

    pub fn key(&self) -> &ContactKey {
        &self.key
    }

    pub fn sibling_key(&self) -> SiblingKey {
        self.key.sibling_key()
    }

    pub fn account(&self) -> &str {
        self.key.account()
    }

    pub fn client_type(&self) -> ClientType {
        self.key.client_type()
    }

    pub fn address_book_id(&self) -> Uuid {
        self.key.address_book_id()
    }

    /// True if this record lives in the individual address book.
    pub fn in_default_address_book(&self) -> bool {
        self.key.address_book_id() == DEFAULT_ADDRESS_BOOK_ID
    }

    pub fn display_name(&self) -> String {
        self.state.lock().display_name.clone()
    }

    pub fn set_display_name(&self, name: &str) {
        self.state.lock().display_name = name.to_string();
    }

    pub fn nickname(&self) -> Option<String> {
        self.state.lock().nickname.clone()
    }

    pub fn set_nickname(&self, nickname: Option<String>) {
        self.state.lock().nickname = nickname;
    }

    pub fn personal_message(&self) -> Option<String> {
        self.state.lock().personal_message.clone()
    }

    pub fn set_personal_message(&self, message: Option<String>) {
        self.state.lock().personal_message = message;
    }

    pub fn lists(&self) -> MsnLists {
        self.state.lock().lists
    }

    /// True if the contact is on every list in `lists`.
    pub fn has_lists(&self, lists: MsnLists) -> bool {
        self.state.lock().lists.contains(lists)
    }

    /// Replaces the membership bitset. Returns true if it changed.
    ///
    /// Does not reach siblings; `AddressBook`/`ContactManager` mirror changes.
    pub(crate) fn set_lists(&self, lists: MsnLists) -> bool {
        let mut state = self.state.lock();
        let changed = state.lists != lists;
        state.lists = lists;
        changed
    }

    pub fn guid(&self) -> Uuid {
        self.state.lock().guid
    }

    pub fn set_guid(&self, guid: Uuid) {
        self.state.lock().guid = guid;
    }

    /// Sets the contact guid from server text.
    pub fn set_guid_text(&self, text: &str) {
        self.set_guid(parse_guid_or_nil(text));
    }

    pub fn cid(&self) -> i64 {
        self.state.lock().cid
    }

    pub fn set_cid(&self, cid: i64) {
        self.state.lock().cid = cid;
    }

    pub fn status(&self) -> PresenceStatus {
        self.state.lock().status
    }

    pub fn set_status(&self, status: PresenceStatus) {
        let mut state = self.state.lock();
        state.status = status;
        if status == PresenceStatus::Offline {
            state.end_points.clear();
        }
    }

    pub fn is_online(&self) -> bool {
        !matches!(
            self.status(),
            PresenceStatus::Offline | PresenceStatus::Hidden
        )
    }

    pub fn is_messenger_user(&self) -> bool {
        self.state.lock().is_messenger_user
    }

    pub(crate) fn set_is_messenger_user(&self, value: bool) -> bool {
        let mut state = self.state.lock();
        let changed = state.is_messenger_user != value;
        state.is_messenger_user = value;
        changed
    }

    pub fn display_image(&self) -> Option<DisplayImage> {
        self.state.lock().display_image.clone()
    }

    /// Returns true if the image changed (compared by checksum).
    pub(crate) fn set_display_image(&self, image: Option<DisplayImage>) -> bool {
        let mut state = self.state.lock();
        let changed = match (&state.display_image, &image) {
            (Some(old), Some(new)) => old.sha1c() != new.sha1c(),
            (None, None) => false,
            _ => true,
        };
        state.display_image = image;
        changed
    }

    pub fn end_points(&self) -> Vec<EndPoint> {
        self.state.lock().end_points.values().cloned().collect()
    }

    pub fn end_point(&self, id: Uuid) -> Option<EndPoint> {
        self.state.lock().end_points.get(&id).cloned()
    }

    pub fn upsert_end_point(&self, end_point: EndPoint) {
        self.state.lock().end_points.insert(end_point.id, end_point);
    }

    pub fn remove_end_point(&self, id: Uuid) -> bool {
        self.state.lock().end_points.remove(&id).is_some()
    }

    /// Copies membership and messenger flags into `other`.
    ///
    /// Returns true if `other` changed.
    pub(crate) fn copy_properties_to(&self, other: &Contact) -> bool {
        let (lists, messenger) = {
            let state = self.state.lock();
            (state.lists, state.is_messenger_user)
        };
        let lists_changed = other.set_lists(lists);
        let messenger_changed = other.set_is_messenger_user(messenger);
        lists_changed || messenger_changed
    }
}
