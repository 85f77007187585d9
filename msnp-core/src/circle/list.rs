// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Circles known to the signed-in user, keyed by address book id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::Circle;
use crate::session::NotificationSession;

#[derive(Debug, Default)]
pub struct CircleList {
    circles: RwLock<HashMap<Uuid, Arc<Circle>>>,
}

impl CircleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a circle. Returns false if one with the same id exists.
    pub fn add(&self, circle: Arc<Circle>) -> bool {
        let mut circles = self.circles.write();
        if circles.contains_key(&circle.address_book_id()) {
            return false;
        }
        circles.insert(circle.address_book_id(), circle);
        true
    }

    pub fn get(&self, address_book_id: Uuid) -> Option<Arc<Circle>> {
        self.circles.read().get(&address_book_id).cloned()
    }

    /// Looks up by `abid@hostdomain`.
    pub fn get_by_account(&self, account: &str) -> Option<Arc<Circle>> {
        let account = account.trim().to_lowercase();
        self.circles
            .read()
            .values()
            .find(|c| c.account() == account)
            .cloned()
    }

    pub fn contains(&self, address_book_id: Uuid) -> bool {
        self.circles.read().contains_key(&address_book_id)
    }

    pub fn remove(&self, address_book_id: Uuid) -> Option<Arc<Circle>> {
        self.circles.write().remove(&address_book_id)
    }

    pub fn len(&self) -> usize {
        self.circles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.read().is_empty()
    }

    /// Snapshot of all circles.
    pub fn all(&self) -> Vec<Arc<Circle>> {
        self.circles.read().values().cloned().collect()
    }

    /// Attaches `session` to every circle.
    pub fn attach_session(&self, session: &Arc<NotificationSession>) {
        for circle in self.circles.read().values() {
            circle.attach_session(Arc::clone(session));
        }
    }

    pub fn reset(&self) {
        self.circles.write().clear();
    }
}
