// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! MSNP Core Library
//!
//! Message dispatch and contact synchronization for MSNP clients.
//! The library never opens sockets or calls web services: hosts supply a
//! [`ByteTransport`] and address-book records, and receive [`ClientEvent`]s.
//! MSNObject checksums use the audited `ring` crate.

pub mod address_book;
pub mod circle;
pub mod config;
pub mod contact;
pub mod contact_manager;
pub mod error;
pub mod events;
pub mod handler;
pub mod msnobject;
pub mod protocol;
pub mod scheduler;
pub mod session;

pub use address_book::{AddressBook, AddressBookRecord, ApplySummary};
pub use circle::{parse_full_circle_account, Circle, CircleList, CircleRole, MemberParseOption};
pub use config::ClientConfig;
pub use contact::{
    parse_endpoint_account, ClientType, Contact, ContactFilter, ContactKey, ContactList,
    ContactSnapshot, EndPoint, MsnLists, Owner, PresenceStatus, SiblingKey,
    DEFAULT_ADDRESS_BOOK_ID,
};
pub use contact_manager::ContactManager;
pub use error::{MsnpError, MsnpResult, NetworkError, ParseError};
pub use events::{CallbackHandler, ClientEvent, EventDispatcher, EventHandler};
pub use handler::{parse_membership_list, ContactEventHandler, MembershipEntry};
pub use msnobject::{DisplayImage, MsnObject, MsnObjectCatalog, MsnObjectType};
pub use protocol::{
    ByteTransport, Command, CommandFramer, DispatchReport, MessageDispatcher, MessageHandler,
    MessageProcessor, MessageType, MockByteTransport, MultiMimeMessage, NotificationConnection,
    RecordingProcessor, TransactionSequencer,
};
pub use scheduler::{DrainPolicy, DrainReport, Scheduler, SchedulerQueueObject};
pub use session::NotificationSession;
