// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for address_book

mod common;

use std::sync::Arc;

use common::EventRecorder;
use msnp_core::*;
use uuid::Uuid;

#[test]
fn test_apply_contact_records() {
    common::init_logging();
    let (book, events) = common::signed_in_address_book("me@live.com");
    let recorder = EventRecorder::attach(&events);

    let summary = book
        .apply_records(&[
            AddressBookRecord::contact("Bob@Live.com", ClientType::Passport, MsnLists::FORWARD | MsnLists::ALLOWED)
                .with_display_name("Bob"),
            AddressBookRecord::contact("carol@mail.com", ClientType::Email, MsnLists::FORWARD),
        ])
        .unwrap();

    assert_eq!(summary.added, 2);
    let bob = book.get_contact("bob@live.com", ClientType::Passport).unwrap();
    assert_eq!(bob.display_name(), "Bob");
    assert!(bob.has_lists(MsnLists::ALLOWED));
    assert!(book.find_contact("carol@mail.com").is_some());
    assert_eq!(
        recorder.count(|e| matches!(e, ClientEvent::ContactAdded { .. })),
        2
    );

    // A second pass updates in place.
    let summary = book
        .apply_records(&[AddressBookRecord::contact(
            "bob@live.com",
            ClientType::Passport,
            MsnLists::FORWARD | MsnLists::BLOCKED,
        )])
        .unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(bob.lists(), MsnLists::FORWARD | MsnLists::BLOCKED);
    assert_eq!(book.contacts_matching(ContactFilter::Lists(MsnLists::BLOCKED)).iter().count(), 1);
}

#[test]
fn test_circles_are_applied_before_members() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let abid = Uuid::new_v4();

    // Member first on the wire; the circle definition still wins.
    let summary = book
        .apply_records(&[
            AddressBookRecord::member(abid, "bob@live.com", ClientType::Passport, MsnLists::ALLOWED),
            AddressBookRecord::circle(abid, "live.com", "Admin").with_display_name("Friends"),
        ])
        .unwrap();

    assert_eq!(summary.circles_added, 1);
    assert_eq!(summary.added, 1);
    let circle = book.circles().get(abid).unwrap();
    assert_eq!(circle.role(), CircleRole::Admin);
    assert_eq!(circle.display_name(), "Friends");
    assert!(circle.has_member("1:bob@live.com", MemberParseOption::ParseAsClientTypeAndAccount));
    assert!(book
        .get_contact(&format!("{}@live.com", abid), ClientType::Circle)
        .is_some());
    assert!(Arc::ptr_eq(
        &book.circle_by_address(&format!("9:{}@live.com", abid)).unwrap(),
        &circle
    ));
}

#[test]
fn test_member_records_sync_with_individual_contact() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let abid = Uuid::new_v4();
    book.apply_records(&[
        AddressBookRecord::contact("bob@live.com", ClientType::Passport, MsnLists::FORWARD),
        AddressBookRecord::circle(abid, "live.com", "Member"),
        AddressBookRecord::member(abid, "bob@live.com", ClientType::Passport, MsnLists::NONE),
    ])
    .unwrap();

    let individual = book.get_contact("bob@live.com", ClientType::Passport).unwrap();
    let member = book
        .circles()
        .get(abid)
        .unwrap()
        .get_member("1:bob@live.com", MemberParseOption::ParseAsClientTypeAndAccount)
        .unwrap();
    assert_eq!(member.lists(), MsnLists::FORWARD);

    book.add_to_list(&member, MsnLists::ALLOWED);
    assert_eq!(individual.lists(), MsnLists::FORWARD | MsnLists::ALLOWED);
}

#[test]
fn test_unknown_role_aborts_with_configuration_error() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let result = book.apply_records(&[AddressBookRecord::circle(
        Uuid::new_v4(),
        "live.com",
        "Overlord",
    )]);
    assert!(matches!(result, Err(MsnpError::Configuration(_))));
    assert!(book.circles().is_empty());
}

#[test]
fn test_member_of_unknown_circle_is_skipped() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let summary = book
        .apply_records(&[
            AddressBookRecord::member(Uuid::new_v4(), "bob@live.com", ClientType::Passport, MsnLists::ALLOWED),
            AddressBookRecord::contact("   ", ClientType::Passport, MsnLists::FORWARD),
        ])
        .unwrap();
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.added, 0);
}

#[test]
fn test_deleted_records_remove_entries() {
    let (book, events) = common::signed_in_address_book("me@live.com");
    let abid = Uuid::new_v4();
    book.apply_records(&[
        AddressBookRecord::contact("bob@live.com", ClientType::Passport, MsnLists::FORWARD),
        AddressBookRecord::circle(abid, "live.com", "Admin"),
        AddressBookRecord::member(abid, "carol@live.com", ClientType::Passport, MsnLists::ALLOWED),
    ])
    .unwrap();

    let recorder = EventRecorder::attach(&events);
    let summary = book
        .apply_records(&[
            AddressBookRecord::contact("bob@live.com", ClientType::Passport, MsnLists::NONE).deleted(),
            AddressBookRecord::circle(abid, "live.com", "Admin").deleted(),
        ])
        .unwrap();

    assert_eq!(summary.removed, 2);
    assert!(!book.has_contact("bob@live.com", ClientType::Passport));
    assert!(book.circles().get(abid).is_none());
    assert!(book
        .get_contact(&format!("{}@live.com", abid), ClientType::Circle)
        .is_none());
    assert_eq!(
        recorder.count(|e| matches!(e, ClientEvent::CircleRemoved { address_book_id } if *address_book_id == abid)),
        1
    );
    assert_eq!(
        recorder.count(|e| matches!(e, ClientEvent::ContactRemoved { .. })),
        1
    );
}

#[test]
fn test_last_change_keeps_newest_stamp() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let abid = Uuid::new_v4();
    book.apply_records(&[
        AddressBookRecord::contact("a@live.com", ClientType::Passport, MsnLists::FORWARD)
            .with_last_change("2009-10-01T10:00:00Z"),
        AddressBookRecord::contact("b@live.com", ClientType::Passport, MsnLists::FORWARD)
            .with_last_change("2009-12-01T10:00:00Z"),
        AddressBookRecord::contact("c@live.com", ClientType::Passport, MsnLists::FORWARD)
            .with_last_change("2009-11-01T10:00:00Z"),
        AddressBookRecord::circle(abid, "live.com", "Member")
            .with_last_change("2010-01-01T00:00:00Z"),
    ])
    .unwrap();

    assert_eq!(
        book.last_change(DEFAULT_ADDRESS_BOOK_ID).as_deref(),
        Some("2009-12-01T10:00:00Z")
    );
    assert_eq!(book.last_change(abid).as_deref(), Some("2010-01-01T00:00:00Z"));
    assert_eq!(book.last_change(Uuid::new_v4()), None);
}

#[test]
fn test_circle_records_need_an_owner() {
    let book = AddressBook::new(
        Arc::new(EventDispatcher::new()),
        Arc::new(MsnObjectCatalog::new()),
    );
    let result = book.apply_records(&[AddressBookRecord::circle(Uuid::new_v4(), "live.com", "Admin")]);
    assert!(matches!(result, Err(MsnpError::InvalidOperation(_))));
}

#[test]
fn test_add_circle_member_requires_known_circle() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    assert!(matches!(
        book.add_circle_member(Uuid::new_v4(), "bob@live.com", ClientType::Passport),
        Err(MsnpError::ContactNotFound(_))
    ));

    let owner = book.owner().unwrap();
    let circle = Arc::new(common::circle(&owner, "live.com"));
    assert!(book.add_circle(circle.clone()));
    assert!(!book.add_circle(circle.clone()));

    let member = book
        .add_circle_member(circle.address_book_id(), "bob@live.com", ClientType::Passport)
        .unwrap();
    assert_eq!(member.address_book_id(), circle.address_book_id());
    assert!(book
        .remove_circle_member(circle.address_book_id(), "bob@live.com", ClientType::Passport)
        .is_some());
    assert!(circle.members().is_empty());
}

#[test]
fn test_only_book_added_members_join_sibling_sync() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let owner = book.owner().unwrap();
    let circle = Arc::new(common::circle(&owner, "live.com"));
    book.add_circle(circle.clone());
    let bob = book.add_contact("bob@live.com", ClientType::Passport);
    let carol = book.add_contact("carol@live.com", ClientType::Passport);

    let synced = book
        .add_circle_member(circle.address_book_id(), "bob@live.com", ClientType::Passport)
        .unwrap();
    let local = circle.add_member("carol@live.com", ClientType::Passport);
    assert!(book.manager().is_tracked(synced.key()));
    assert!(!book.manager().is_tracked(local.key()));

    book.add_to_list(&bob, MsnLists::ALLOWED);
    book.add_to_list(&carol, MsnLists::ALLOWED);
    assert!(synced.has_lists(MsnLists::ALLOWED));
    assert!(!local.has_lists(MsnLists::ALLOWED));
}

#[test]
fn test_presence_change_emits_once() {
    let (book, events) = common::signed_in_address_book("me@live.com");
    let recorder = EventRecorder::attach(&events);
    let bob = book.add_contact("bob@live.com", ClientType::Passport);

    book.set_presence(&bob, PresenceStatus::Busy);
    book.set_presence(&bob, PresenceStatus::Busy);
    assert_eq!(bob.status(), PresenceStatus::Busy);
    assert_eq!(
        recorder.count(|e| matches!(e, ClientEvent::PresenceChanged { .. })),
        1
    );
}

#[test]
fn test_display_image_is_cataloged() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let bob = book.add_contact("bob@live.com", ClientType::Passport);
    let image = DisplayImage::new("bob@live.com", b"png".to_vec());

    book.set_display_image(&bob, image.clone());
    assert!(book.catalog().contains(image.sha1c()));
    assert_eq!(bob.display_image(), Some(image));
}

#[test]
fn test_reset_clears_everything() {
    let (book, _) = common::signed_in_address_book("me@live.com");
    let abid = Uuid::new_v4();
    book.apply_records(&[
        AddressBookRecord::contact("bob@live.com", ClientType::Passport, MsnLists::FORWARD)
            .with_last_change("2010-01-01T00:00:00Z"),
        AddressBookRecord::circle(abid, "live.com", "Admin"),
    ])
    .unwrap();

    let bob = book.get_contact("bob@live.com", ClientType::Passport).unwrap();
    book.reset();

    assert!(book.contacts().is_empty());
    assert!(book.circles().is_empty());
    assert_eq!(book.last_change(DEFAULT_ADDRESS_BOOK_ID), None);
    assert!(!book.manager().is_tracked(bob.key()));
}
