// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Address Book
//!
//! Folds records supplied by the address-book service into the local
//! model: the individual contact list, the circles and their member lists.
//! Every record is registered with the [`ContactManager`], so list changes
//! made here reach siblings.
//!
//! The service call itself is made by the host; this module only consumes
//! its parsed results.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::circle::{Circle, CircleList};
use crate::contact::{
    ClientType, Contact, ContactFilter, ContactList, ContactSnapshot, MsnLists, Owner,
    PresenceStatus, DEFAULT_ADDRESS_BOOK_ID,
};
use crate::contact_manager::ContactManager;
use crate::error::{MsnpError, MsnpResult};
use crate::events::{ClientEvent, EventDispatcher};
use crate::msnobject::{DisplayImage, MsnObjectCatalog};

/// One contact or circle entry as returned by the address-book service.
///
/// - A record in the individual address book with a client type other
///   than `Circle` is a contact.
/// - A `Circle` record defines a circle; its account is `abid@hostdomain`
///   and `circle_role` carries the owner's membership role.
/// - A record whose address book id is a circle id is a circle member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookRecord {
    pub address_book_id: Uuid,
    pub account: String,
    pub client_type: ClientType,
    #[serde(default)]
    pub lists: MsnLists,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_messenger_user: bool,
    #[serde(default)]
    pub contact_guid: Option<String>,
    #[serde(default)]
    pub cid: Option<i64>,
    #[serde(default)]
    pub circle_role: Option<String>,
    /// Set on delta records for entries deleted on the server.
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub last_change: Option<String>,
}

impl AddressBookRecord {
    /// A contact record in the individual address book.
    pub fn contact(account: &str, client_type: ClientType, lists: MsnLists) -> Self {
        AddressBookRecord {
            address_book_id: DEFAULT_ADDRESS_BOOK_ID,
            account: account.to_string(),
            client_type,
            lists,
            display_name: None,
            is_messenger_user: true,
            contact_guid: None,
            cid: None,
            circle_role: None,
            deleted: false,
            last_change: None,
        }
    }

    /// A circle definition.
    pub fn circle(address_book_id: Uuid, host_domain: &str, role: &str) -> Self {
        AddressBookRecord {
            account: format!("{}@{}", address_book_id, host_domain),
            client_type: ClientType::Circle,
            circle_role: Some(role.to_string()),
            ..Self::contact("", ClientType::Circle, MsnLists::NONE)
        }
    }

    /// A member of the circle `address_book_id`.
    pub fn member(
        address_book_id: Uuid,
        account: &str,
        client_type: ClientType,
        lists: MsnLists,
    ) -> Self {
        AddressBookRecord {
            address_book_id,
            ..Self::contact(account, client_type, lists)
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_last_change(mut self, last_change: &str) -> Self {
        self.last_change = Some(last_change.to_string());
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    fn is_circle_definition(&self) -> bool {
        self.client_type == ClientType::Circle && self.address_book_id == DEFAULT_ADDRESS_BOOK_ID
    }
}

/// Counts from one [`AddressBook::apply_records`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub circles_added: usize,
    /// Records that could not be placed (unknown circle, bad account).
    pub skipped: usize,
}

/// Local model of the signed-in user's address books.
#[derive(Debug)]
pub struct AddressBook {
    contacts: ContactList,
    circles: CircleList,
    manager: ContactManager,
    catalog: Arc<MsnObjectCatalog>,
    events: Arc<EventDispatcher>,
    last_changes: RwLock<HashMap<Uuid, String>>,
}

impl AddressBook {
    pub fn new(events: Arc<EventDispatcher>, catalog: Arc<MsnObjectCatalog>) -> Self {
        AddressBook {
            contacts: ContactList::individual(),
            circles: CircleList::new(),
            manager: ContactManager::new(Arc::clone(&events)),
            catalog,
            events,
            last_changes: RwLock::new(HashMap::new()),
        }
    }

    pub fn contacts(&self) -> &ContactList {
        &self.contacts
    }

    pub fn circles(&self) -> &CircleList {
        &self.circles
    }

    pub fn manager(&self) -> &ContactManager {
        &self.manager
    }

    pub fn catalog(&self) -> &Arc<MsnObjectCatalog> {
        &self.catalog
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn owner(&self) -> Option<Owner> {
        self.contacts.owner()
    }

    pub fn set_owner(&self, owner: Owner) -> MsnpResult<()> {
        self.contacts.set_owner(owner)
    }

    /// Last change stamp seen for an address book.
    pub fn last_change(&self, address_book_id: Uuid) -> Option<String> {
        self.last_changes.read().get(&address_book_id).cloned()
    }

    /// Folds service records into the model.
    ///
    /// Circle definitions are applied first so member records can find
    /// their circle regardless of order. An unknown circle role aborts the
    /// fold with [`MsnpError::Configuration`]; records applied before it
    /// stay applied.
    pub fn apply_records(&self, records: &[AddressBookRecord]) -> MsnpResult<ApplySummary> {
        let owner = self.owner();
        let mut summary = ApplySummary::default();

        let (circle_defs, others): (Vec<_>, Vec<_>) =
            records.iter().partition(|r| r.is_circle_definition());

        for record in circle_defs {
            self.apply_circle_record(record, owner.as_ref(), &mut summary)?;
            self.note_last_change(record);
        }
        for record in others {
            self.apply_contact_record(record, &mut summary);
            self.note_last_change(record);
        }

        tracing::info!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            circles = summary.circles_added,
            skipped = summary.skipped,
            "address book records applied"
        );
        Ok(summary)
    }

    fn apply_circle_record(
        &self,
        record: &AddressBookRecord,
        owner: Option<&Owner>,
        summary: &mut ApplySummary,
    ) -> MsnpResult<()> {
        let Some((abid, host_domain)) = split_circle_account(&record.account) else {
            tracing::warn!(account = %record.account, "unparsable circle account");
            summary.skipped += 1;
            return Ok(());
        };

        if record.deleted {
            if self.remove_circle(abid).is_some() {
                summary.removed += 1;
            }
            return Ok(());
        }
        if self.circles.contains(abid) {
            summary.updated += 1;
            return Ok(());
        }

        let owner = owner.cloned().ok_or_else(|| {
            MsnpError::InvalidOperation("circles require a signed-in owner".into())
        })?;
        let role = record.circle_role.as_deref().unwrap_or("None");
        let circle = Circle::new(
            owner,
            abid,
            &host_domain,
            role,
            record.display_name.as_deref().unwrap_or(""),
        )?;
        circle.contact().set_lists(record.lists);
        self.add_circle(Arc::new(circle));
        summary.circles_added += 1;
        Ok(())
    }

    fn apply_contact_record(&self, record: &AddressBookRecord, summary: &mut ApplySummary) {
        let circle = if record.address_book_id == DEFAULT_ADDRESS_BOOK_ID {
            None
        } else {
            match self.circles.get(record.address_book_id) {
                Some(circle) => Some(circle),
                None => {
                    tracing::warn!(
                        address_book = %record.address_book_id,
                        account = %record.account,
                        "record for unknown circle"
                    );
                    summary.skipped += 1;
                    return;
                }
            }
        };
        let contacts = circle.as_ref().map_or(&self.contacts, |c| c.members());

        if record.account.trim().is_empty() {
            tracing::warn!(address_book = %record.address_book_id, "record without account");
            summary.skipped += 1;
            return;
        }

        if record.deleted {
            if let Some(contact) = contacts.remove(&record.account, record.client_type) {
                self.forget(&contact);
                summary.removed += 1;
            }
            return;
        }

        let (contact, created) = contacts.get_or_create_entry(&record.account, record.client_type);
        if let Some(name) = &record.display_name {
            contact.set_display_name(name);
        }
        if let Some(guid) = &record.contact_guid {
            contact.set_guid_text(guid);
        }
        if let Some(cid) = record.cid {
            contact.set_cid(cid);
        }

        if created {
            contact.set_lists(record.lists);
            contact.set_is_messenger_user(record.is_messenger_user);
            self.manager.add(&contact);
            self.events.dispatch(ClientEvent::ContactAdded {
                contact: contact.key().clone(),
            });
            summary.added += 1;
        } else {
            self.manager.set_lists(&contact, record.lists);
            self.manager
                .set_is_messenger_user(&contact, record.is_messenger_user);
            summary.updated += 1;
        }
    }

    fn note_last_change(&self, record: &AddressBookRecord) {
        let Some(stamp) = &record.last_change else {
            return;
        };
        let abid = if record.is_circle_definition() {
            split_circle_account(&record.account).map_or(record.address_book_id, |(id, _)| id)
        } else {
            record.address_book_id
        };
        let mut last_changes = self.last_changes.write();
        let entry = last_changes.entry(abid).or_default();
        if stamp.as_str() > entry.as_str() {
            *entry = stamp.clone();
        }
    }

    /// Looks up a contact of the individual address book.
    pub fn get_contact(&self, account: &str, client_type: ClientType) -> Option<Arc<Contact>> {
        self.contacts.get_typed(account, client_type)
    }

    /// Looks up by account alone using the client type priority order.
    pub fn find_contact(&self, account: &str) -> Option<Arc<Contact>> {
        self.contacts.get(account)
    }

    pub fn has_contact(&self, account: &str, client_type: ClientType) -> bool {
        self.contacts.has_contact(account, client_type)
    }

    /// Filtered snapshot of the individual address book.
    pub fn contacts_matching(&self, filter: ContactFilter) -> ContactSnapshot {
        self.contacts.snapshot(filter)
    }

    /// Adds (or returns) a contact of the individual address book.
    pub fn add_contact(&self, account: &str, client_type: ClientType) -> Arc<Contact> {
        let (contact, created) = self.contacts.get_or_create_entry(account, client_type);
        if created {
            self.manager.add(&contact);
            self.events.dispatch(ClientEvent::ContactAdded {
                contact: contact.key().clone(),
            });
        }
        contact
    }

    pub fn remove_contact(&self, account: &str, client_type: ClientType) -> Option<Arc<Contact>> {
        let contact = self.contacts.remove(account, client_type)?;
        self.forget(&contact);
        Some(contact)
    }

    /// Adds (or returns) a member of a known circle.
    pub fn add_circle_member(
        &self,
        address_book_id: Uuid,
        account: &str,
        client_type: ClientType,
    ) -> MsnpResult<Arc<Contact>> {
        let circle = self
            .circles
            .get(address_book_id)
            .ok_or_else(|| MsnpError::ContactNotFound(format!("circle {}", address_book_id)))?;
        let (contact, created) = circle
            .members()
            .get_or_create_entry(account, client_type);
        if created {
            self.manager.add(&contact);
            self.events.dispatch(ClientEvent::ContactAdded {
                contact: contact.key().clone(),
            });
        }
        Ok(contact)
    }

    pub fn remove_circle_member(
        &self,
        address_book_id: Uuid,
        account: &str,
        client_type: ClientType,
    ) -> Option<Arc<Contact>> {
        let circle = self.circles.get(address_book_id)?;
        let contact = circle.members().remove(account, client_type)?;
        self.forget(&contact);
        Some(contact)
    }

    /// Registers a circle and its contact record.
    pub fn add_circle(&self, circle: Arc<Circle>) -> bool {
        let abid = circle.address_book_id();
        let contact = Arc::clone(circle.contact());
        if !self.circles.add(circle) {
            return false;
        }
        match self.contacts.insert(Arc::clone(&contact)) {
            Ok(_) => {
                self.manager.add(&contact);
            }
            Err(err) => tracing::error!(error = %err, "circle contact not inserted"),
        }
        self.events.dispatch(ClientEvent::CircleAdded {
            address_book_id: abid,
        });
        true
    }

    /// Removes a circle, its contact record and its members.
    pub fn remove_circle(&self, address_book_id: Uuid) -> Option<Arc<Circle>> {
        let circle = self.circles.remove(address_book_id)?;
        for member in circle.members().all().iter() {
            self.manager.remove(member);
        }
        circle.members().reset();
        circle.detach_session();

        let contact = circle.contact();
        if self
            .contacts
            .remove(contact.account(), ClientType::Circle)
            .is_some()
        {
            self.manager.remove(contact);
        }
        self.events.dispatch(ClientEvent::CircleRemoved { address_book_id });
        Some(circle)
    }

    /// Finds the circle a `9:abid@hostdomain` address names.
    pub fn circle_by_address(&self, address: &str) -> Option<Arc<Circle>> {
        let account = address
            .split_once(':')
            .map_or(address, |(_, account)| account);
        self.circles.get_by_account(account)
    }

    pub fn set_lists(&self, contact: &Contact, lists: MsnLists) {
        self.manager.set_lists(contact, lists);
    }

    pub fn add_to_list(&self, contact: &Contact, lists: MsnLists) {
        self.manager.add_to_list(contact, lists);
    }

    pub fn remove_from_list(&self, contact: &Contact, lists: MsnLists) {
        self.manager.remove_from_list(contact, lists);
    }

    /// Sets the presence of a contact and emits a change event.
    pub fn set_presence(&self, contact: &Contact, status: PresenceStatus) {
        if contact.status() == status {
            return;
        }
        contact.set_status(status);
        self.events.dispatch(ClientEvent::PresenceChanged {
            contact: contact.key().clone(),
            status,
        });
    }

    /// Stores an image in the catalog and propagates it to siblings.
    pub fn set_display_image(&self, contact: &Contact, image: DisplayImage) {
        self.catalog.add_display_image(&image);
        self.manager.set_display_image(contact, Some(image));
    }

    /// Clears everything. Used on sign-out.
    pub fn reset(&self) {
        for circle in self.circles.all() {
            circle.detach_session();
            circle.members().reset();
        }
        self.circles.reset();
        self.contacts.reset();
        self.manager.reset();
        self.last_changes.write().clear();
        tracing::info!("address book reset");
    }

    fn forget(&self, contact: &Arc<Contact>) {
        self.manager.remove(contact);
        self.events.dispatch(ClientEvent::ContactRemoved {
            contact: contact.key().clone(),
        });
    }
}

/// Splits `abid@hostdomain`.
fn split_circle_account(account: &str) -> Option<(Uuid, String)> {
    let (abid, host_domain) = account.trim().split_once('@')?;
    let abid = Uuid::parse_str(abid).ok()?;
    if host_domain.is_empty() {
        return None;
    }
    Some((abid, host_domain.to_lowercase()))
}
