// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact List
//!
//! Address-book scoped, thread-safe map from [`ContactKey`] to [`Contact`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{ClientType, Contact, ContactKey, MsnLists, Owner, DEFAULT_ADDRESS_BOOK_ID};
use crate::error::{MsnpError, MsnpResult};

/// Selects contacts from a list snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFilter {
    /// Every contact.
    All,
    /// Contacts whose membership intersects the given lists.
    Lists(MsnLists),
    /// Email-only contacts.
    Email,
}

impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        match self {
            ContactFilter::All => true,
            ContactFilter::Lists(lists) => contact.lists().intersects(*lists),
            ContactFilter::Email => contact.client_type() == ClientType::Email,
        }
    }
}

/// Contacts captured at enumeration start, filtered lazily.
///
/// Iterating again restarts from the same snapshot.
#[derive(Debug, Clone)]
pub struct ContactSnapshot {
    contacts: Vec<Arc<Contact>>,
    filter: ContactFilter,
}

impl ContactSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Contact>> + '_ {
        self.contacts.iter().filter(|c| self.filter.matches(c))
    }

    pub fn filter(&self) -> ContactFilter {
        self.filter
    }
}

impl<'a> IntoIterator for &'a ContactSnapshot {
    type Item = &'a Arc<Contact>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<Contact>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[derive(Debug, Default)]
struct ListInner {
    contacts: HashMap<ContactKey, Arc<Contact>>,
    owner: Option<Owner>,
}

/// Contacts of one address book.
#[derive(Debug)]
pub struct ContactList {
    address_book_id: Uuid,
    inner: RwLock<ListInner>,
}

impl ContactList {
    pub fn new(address_book_id: Uuid) -> Self {
        ContactList {
            address_book_id,
            inner: RwLock::new(ListInner::default()),
        }
    }

    /// List for the individual address book.
    pub fn individual() -> Self {
        Self::new(DEFAULT_ADDRESS_BOOK_ID)
    }

    pub fn address_book_id(&self) -> Uuid {
        self.address_book_id
    }

    pub fn is_default(&self) -> bool {
        self.address_book_id == DEFAULT_ADDRESS_BOOK_ID
    }

    fn key(&self, account: &str, client_type: ClientType) -> ContactKey {
        ContactKey::new(self.address_book_id, account, client_type)
    }

    /// Returns the contact for the pair, creating it if absent.
    pub fn get_or_create(&self, account: &str, client_type: ClientType) -> Arc<Contact> {
        self.get_or_create_entry(account, client_type).0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// the contact was created by this call.
    pub fn get_or_create_entry(
        &self,
        account: &str,
        client_type: ClientType,
    ) -> (Arc<Contact>, bool) {
        let key = self.key(account, client_type);
        if let Some(contact) = self.inner.read().contacts.get(&key) {
            return (contact.clone(), false);
        }

        let mut inner = self.inner.write();
        // Re-check: another caller may have inserted between the locks.
        if let Some(contact) = inner.contacts.get(&key) {
            return (contact.clone(), false);
        }
        let contact = Arc::new(Contact::new(
            self.address_book_id,
            key.account(),
            client_type,
        ));
        inner.contacts.insert(key, contact.clone());
        tracing::debug!(contact = %contact.key(), "contact created");
        (contact, true)
    }

    /// Inserts an existing contact record.
    ///
    /// Returns false if a contact with the same key is already present.
    pub fn insert(&self, contact: Arc<Contact>) -> MsnpResult<bool> {
        if contact.address_book_id() != self.address_book_id {
            return Err(MsnpError::InvalidOperation(format!(
                "contact {} does not belong to address book {}",
                contact.key(),
                self.address_book_id
            )));
        }
        let mut inner = self.inner.write();
        if inner.contacts.contains_key(contact.key()) {
            return Ok(false);
        }
        inner.contacts.insert(contact.key().clone(), contact);
        Ok(true)
    }

    /// Resolves an account of unknown client type.
    ///
    /// Tries Passport, Email, Phone, then LCS; the first match wins.
    pub fn get(&self, account: &str) -> Option<Arc<Contact>> {
        let inner = self.inner.read();
        ClientType::RESOLUTION_ORDER
            .iter()
            .find_map(|client_type| inner.contacts.get(&self.key(account, *client_type)))
            .cloned()
    }

    pub fn get_typed(&self, account: &str, client_type: ClientType) -> Option<Arc<Contact>> {
        self.inner
            .read()
            .contacts
            .get(&self.key(account, client_type))
            .cloned()
    }

    pub fn get_by_key(&self, key: &ContactKey) -> Option<Arc<Contact>> {
        self.inner.read().contacts.get(key).cloned()
    }

    pub fn has_contact(&self, account: &str, client_type: ClientType) -> bool {
        self.inner
            .read()
            .contacts
            .contains_key(&self.key(account, client_type))
    }

    /// True if the account exists under any resolvable client type.
    pub fn has_account(&self, account: &str) -> bool {
        self.get(account).is_some()
    }

    pub fn remove(&self, account: &str, client_type: ClientType) -> Option<Arc<Contact>> {
        let removed = self
            .inner
            .write()
            .contacts
            .remove(&self.key(account, client_type));
        if let Some(contact) = &removed {
            tracing::debug!(contact = %contact.key(), "contact removed");
        }
        removed
    }

    /// Removes every contact and detaches the owner.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.contacts.clear();
        inner.owner = None;
    }

    pub fn len(&self) -> usize {
        self.inner.read().contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().contacts.is_empty()
    }

    pub fn owner(&self) -> Option<Owner> {
        self.inner.read().owner.clone()
    }

    /// Attaches the signed-in owner. Only the individual address book may
    /// hold an owner, and only once until [`reset`](Self::reset).
    pub fn set_owner(&self, owner: Owner) -> MsnpResult<()> {
        if !self.is_default() {
            return Err(MsnpError::NotDefaultAddressBook("hold the owner".into()));
        }
        let mut inner = self.inner.write();
        if inner.owner.is_some() {
            return Err(MsnpError::OwnerAlreadySet);
        }
        tracing::info!(owner = owner.account(), "owner attached");
        inner.owner = Some(owner);
        Ok(())
    }

    /// Snapshot of the list filtered by `filter`.
    pub fn snapshot(&self, filter: ContactFilter) -> ContactSnapshot {
        ContactSnapshot {
            contacts: self.inner.read().contacts.values().cloned().collect(),
            filter,
        }
    }

    pub fn all(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::All)
    }

    pub fn forward(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Lists(MsnLists::FORWARD))
    }

    pub fn allowed(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Lists(MsnLists::ALLOWED))
    }

    pub fn blocked(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Lists(MsnLists::BLOCKED))
    }

    pub fn reverse(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Lists(MsnLists::REVERSE))
    }

    pub fn pending(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Lists(MsnLists::PENDING))
    }

    pub fn email(&self) -> ContactSnapshot {
        self.snapshot(ContactFilter::Email)
    }
}
