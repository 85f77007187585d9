// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared helpers and fixtures used across test modules.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;

use msnp_core::*;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs a test log subscriber once. Controlled by `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects every event dispatched to it.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl EventRecorder {
    /// Creates a recorder registered on `dispatcher`.
    pub fn attach(dispatcher: &EventDispatcher) -> Self {
        let recorder = EventRecorder::default();
        let sink = recorder.events.clone();
        dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
            sink.lock().push(event);
        })));
        recorder
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&ClientEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// An address book with an owner attached.
pub fn signed_in_address_book(owner_account: &str) -> (Arc<AddressBook>, Arc<EventDispatcher>) {
    let events = Arc::new(EventDispatcher::new());
    let book = Arc::new(AddressBook::new(
        events.clone(),
        Arc::new(MsnObjectCatalog::new()),
    ));
    book.set_owner(Owner::new(owner_account, Uuid::new_v4()))
        .expect("fresh address book accepts an owner");
    (book, events)
}

/// A circle owned by `me`, with an admin role.
pub fn circle(me: &Owner, host_domain: &str) -> Circle {
    Circle::new(me.clone(), Uuid::new_v4(), host_domain, "Admin", "Test Circle")
        .expect("valid circle")
}
