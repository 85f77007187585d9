// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Manager
//!
//! Keeps siblings consistent. Siblings are contact records in different
//! address books that share a `clienttype:account` key.
//!
//! Two pages index the first record seen per key:
//!
//! - the default page holds the record from the individual address book
//!   (the root of the group);
//! - the other page holds the first record from any other address book.
//!
//! Sibling groups are a separate table of keys to records. Records hold no
//! reference back to the manager.
//!
//! # Sync direction
//!
//! Membership lists and the messenger flag flow root to siblings when a
//! record joins, and from the changed record to all siblings on mutation.
//! Display images flow from the record that changed to its siblings, except
//! when that record is outside the individual address book: then the other
//! page record for the key is the source.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::contact::{Contact, ContactKey, MsnLists, SiblingKey};
use crate::events::{ClientEvent, EventDispatcher};
use crate::msnobject::DisplayImage;

#[derive(Debug, Default)]
struct Pages {
    default_page: HashMap<SiblingKey, Arc<Contact>>,
    other_page: HashMap<SiblingKey, Arc<Contact>>,
    groups: HashMap<SiblingKey, Vec<Arc<Contact>>>,
}

/// Sibling synchronizer.
#[derive(Debug)]
pub struct ContactManager {
    pages: Mutex<Pages>,
    events: Arc<EventDispatcher>,
}

impl ContactManager {
    pub fn new(events: Arc<EventDispatcher>) -> Self {
        ContactManager {
            pages: Mutex::new(Pages::default()),
            events,
        }
    }

    /// Tracks `contact`. Returns false if it was already tracked.
    ///
    /// A record joining a group that has a root receives the root's lists,
    /// messenger flag and display image. A root joining an existing group
    /// pushes its state to the records already there.
    pub fn add(&self, contact: &Arc<Contact>) -> bool {
        let key = contact.sibling_key();
        let mut changed = Vec::new();
        {
            let mut pages = self.pages.lock();
            let group = pages.groups.entry(key.clone()).or_default();
            if group.iter().any(|c| Arc::ptr_eq(c, contact)) {
                return false;
            }
            group.push(Arc::clone(contact));

            if contact.in_default_address_book() {
                if let Some(previous) = pages.default_page.insert(key.clone(), Arc::clone(contact)) {
                    tracing::warn!(key = %key, "replacing default page record");
                    if let Some(group) = pages.groups.get_mut(&key) {
                        group.retain(|c| !Arc::ptr_eq(c, &previous));
                    }
                }
                if let Some(group) = pages.groups.get(&key) {
                    for sibling in group.iter().filter(|c| !Arc::ptr_eq(c, contact)) {
                        push_root_state(contact, sibling, &mut changed);
                    }
                }
            } else {
                pages
                    .other_page
                    .entry(key.clone())
                    .or_insert_with(|| Arc::clone(contact));
                if let Some(root) = pages.default_page.get(&key) {
                    push_root_state(root, contact, &mut changed);
                }
            }
            tracing::debug!(contact = %contact.key(), "tracking contact");
        }
        self.emit(changed);
        true
    }

    /// Stops tracking `contact`. The next record of the group (if any)
    /// takes over its other page slot.
    pub fn remove(&self, contact: &Arc<Contact>) -> bool {
        let key = contact.sibling_key();
        let mut pages = self.pages.lock();

        let Some(group) = pages.groups.get_mut(&key) else {
            return false;
        };
        let before = group.len();
        group.retain(|c| !Arc::ptr_eq(c, contact));
        if group.len() == before {
            return false;
        }
        let next_other = group
            .iter()
            .find(|c| !c.in_default_address_book())
            .cloned();
        if group.is_empty() {
            pages.groups.remove(&key);
        }

        if pages
            .default_page
            .get(&key)
            .is_some_and(|c| Arc::ptr_eq(c, contact))
        {
            pages.default_page.remove(&key);
        }
        if pages
            .other_page
            .get(&key)
            .is_some_and(|c| Arc::ptr_eq(c, contact))
        {
            match next_other {
                Some(next) => {
                    pages.other_page.insert(key, next);
                }
                None => {
                    pages.other_page.remove(&key);
                }
            }
        }
        true
    }

    /// Forgets every record.
    pub fn reset(&self) {
        let mut pages = self.pages.lock();
        pages.default_page.clear();
        pages.other_page.clear();
        pages.groups.clear();
    }

    /// Pushes lists and the messenger flag from `root` to its siblings.
    /// Returns how many siblings changed; an unknown key changes nothing.
    pub fn sync_properties(&self, root: &Contact) -> usize {
        let key = root.sibling_key();
        let mut changed = Vec::new();
        {
            let pages = self.pages.lock();
            let Some(group) = pages.groups.get(&key) else {
                tracing::debug!(key = %key, "sync_properties: unknown key");
                return 0;
            };
            for sibling in group.iter().filter(|c| !std::ptr::eq(c.as_ref(), root)) {
                if root.copy_properties_to(sibling) {
                    changed.push(ClientEvent::ListsChanged {
                        contact: sibling.key().clone(),
                        lists: sibling.lists(),
                    });
                }
            }
        }
        let count = changed.len();
        self.emit(changed);
        count
    }

    /// Pushes a display image change of `initiator` to its siblings.
    ///
    /// The source is `initiator` if it lives in the individual address
    /// book, otherwise the other page record for its key. Returns how many
    /// records changed.
    pub fn sync_display_image(&self, initiator: &Contact) -> usize {
        let key = initiator.sibling_key();
        let mut changed = Vec::new();
        {
            let pages = self.pages.lock();
            let Some(group) = pages.groups.get(&key) else {
                tracing::debug!(key = %key, "sync_display_image: unknown key");
                return 0;
            };

            let source: &Contact = if initiator.in_default_address_book() {
                initiator
            } else {
                match pages.other_page.get(&key) {
                    Some(root) => root.as_ref(),
                    None => {
                        tracing::debug!(key = %key, "sync_display_image: no other page record");
                        return 0;
                    }
                }
            };

            let image = source.display_image();
            for sibling in group.iter().filter(|c| !std::ptr::eq(c.as_ref(), source)) {
                if sibling.set_display_image(image.clone()) {
                    changed.push(ClientEvent::DisplayImageChanged {
                        contact: sibling.key().clone(),
                    });
                }
            }
        }
        let count = changed.len();
        self.emit(changed);
        count
    }

    /// Replaces the lists of `contact` and mirrors them to its siblings.
    pub fn set_lists(&self, contact: &Contact, lists: MsnLists) {
        let mut events = Vec::new();
        if contact.set_lists(lists) {
            events.push(ClientEvent::ListsChanged {
                contact: contact.key().clone(),
                lists,
            });
        }
        self.emit(events);
        self.sync_properties(contact);
    }

    pub fn add_to_list(&self, contact: &Contact, lists: MsnLists) {
        self.set_lists(contact, contact.lists() | lists);
    }

    pub fn remove_from_list(&self, contact: &Contact, lists: MsnLists) {
        let mut current = contact.lists();
        current.remove(lists);
        self.set_lists(contact, current);
    }

    /// Sets the messenger flag of `contact` and mirrors it to its siblings.
    pub fn set_is_messenger_user(&self, contact: &Contact, value: bool) {
        contact.set_is_messenger_user(value);
        self.sync_properties(contact);
    }

    /// Sets the display image of `contact` and propagates it.
    pub fn set_display_image(&self, contact: &Contact, image: Option<DisplayImage>) {
        if contact.set_display_image(image) {
            self.emit(vec![ClientEvent::DisplayImageChanged {
                contact: contact.key().clone(),
            }]);
        }
        self.sync_display_image(contact);
    }

    /// Siblings of `contact`, excluding itself.
    pub fn siblings(&self, contact: &Contact) -> Vec<Arc<Contact>> {
        let pages = self.pages.lock();
        pages
            .groups
            .get(&contact.sibling_key())
            .map(|group| {
                group
                    .iter()
                    .filter(|c| !std::ptr::eq(c.as_ref(), contact))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Root record (individual address book) for a key.
    pub fn root(&self, key: &SiblingKey) -> Option<Arc<Contact>> {
        self.pages.lock().default_page.get(key).cloned()
    }

    /// First record from a non-default address book for a key.
    pub fn other_root(&self, key: &SiblingKey) -> Option<Arc<Contact>> {
        self.pages.lock().other_page.get(key).cloned()
    }

    pub fn is_tracked(&self, key: &ContactKey) -> bool {
        self.pages
            .lock()
            .groups
            .get(&key.sibling_key())
            .is_some_and(|g| g.iter().any(|c| c.key() == key))
    }

    /// Records sharing `key`, root included.
    pub fn group_len(&self, key: &SiblingKey) -> usize {
        self.pages.lock().groups.get(key).map_or(0, Vec::len)
    }

    fn emit(&self, events: Vec<ClientEvent>) {
        for event in events {
            self.events.dispatch(event);
        }
    }
}

fn push_root_state(root: &Contact, sibling: &Arc<Contact>, changed: &mut Vec<ClientEvent>) {
    if root.copy_properties_to(sibling) {
        changed.push(ClientEvent::ListsChanged {
            contact: sibling.key().clone(),
            lists: sibling.lists(),
        });
    }
    if sibling.set_display_image(root.display_image()) {
        changed.push(ClientEvent::DisplayImageChanged {
            contact: sibling.key().clone(),
        });
    }
}
