// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for handler, driven through a notification connection

mod common;

use std::sync::Arc;

use common::EventRecorder;
use msnp_core::protocol::percent_encode;
use msnp_core::*;
use uuid::Uuid;

struct Fixture {
    book: Arc<AddressBook>,
    connection: NotificationConnection<MockByteTransport>,
    recorder: EventRecorder,
}

fn fixture() -> Fixture {
    common::init_logging();
    let (book, events) = common::signed_in_address_book("me@live.com");
    let recorder = EventRecorder::attach(&events);
    let dispatcher = Arc::new(MessageDispatcher::new(events));
    dispatcher.register_handler(Arc::new(ContactEventHandler::new(book.clone())));
    let connection = NotificationConnection::new(
        MockByteTransport::new(),
        dispatcher,
        &ClientConfig::default(),
    );
    Fixture {
        book,
        connection,
        recorder,
    }
}

fn with_payload(header: &str, payload: &str) -> Vec<u8> {
    let mut bytes = format!("{} {}\r\n", header, payload.len()).into_bytes();
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

#[test]
fn test_nln_updates_status_and_name() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);

    let reports = f
        .connection
        .on_bytes_received(b"NLN BSY 1:Bob@Live.com Bob%20Smith 2789003324:48\r\n");

    assert_eq!(reports, vec![DispatchReport { delivered: 1, failed: 0 }]);
    assert_eq!(bob.status(), PresenceStatus::Busy);
    assert_eq!(bob.display_name(), "Bob Smith");
    assert_eq!(
        f.recorder
            .count(|e| matches!(e, ClientEvent::PresenceChanged { status: PresenceStatus::Busy, .. })),
        1
    );
}

#[test]
fn test_iln_and_fln() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);

    f.connection
        .on_bytes_received(b"ILN 5 AWY 1:bob@live.com Bob 0\r\n");
    assert_eq!(bob.status(), PresenceStatus::Away);

    f.connection.on_bytes_received(b"FLN 1:bob@live.com 0\r\n");
    assert_eq!(bob.status(), PresenceStatus::Offline);
    assert!(!bob.is_online());
}

#[test]
fn test_presence_reaches_siblings() {
    let f = fixture();
    let abid = Uuid::new_v4();
    f.book
        .apply_records(&[
            AddressBookRecord::contact("bob@live.com", ClientType::Passport, MsnLists::FORWARD),
            AddressBookRecord::circle(abid, "live.com", "Member"),
            AddressBookRecord::member(abid, "bob@live.com", ClientType::Passport, MsnLists::NONE),
        ])
        .unwrap();
    let member = f
        .book
        .circles()
        .get(abid)
        .unwrap()
        .get_member("1:bob@live.com", MemberParseOption::ParseAsClientTypeAndAccount)
        .unwrap();

    f.connection
        .on_bytes_received(b"NLN NLN 1:bob@live.com Bob 0\r\n");
    assert_eq!(member.status(), PresenceStatus::Online);
}

#[test]
fn test_via_resolves_circle_member() {
    let f = fixture();
    let abid = Uuid::new_v4();
    f.book
        .apply_records(&[
            AddressBookRecord::circle(abid, "live.com", "Admin"),
            AddressBookRecord::member(abid, "carol@live.com", ClientType::Passport, MsnLists::ALLOWED),
        ])
        .unwrap();
    let circle = f.book.circles().get(abid).unwrap();
    let carol = circle
        .get_member("1:carol@live.com", MemberParseOption::ParseAsClientTypeAndAccount)
        .unwrap();

    let line = format!("NLN IDL 1:carol@live.com;via=9:{}@live.com Carol 0\r\n", abid);
    f.connection.on_bytes_received(line.as_bytes());

    assert_eq!(carol.status(), PresenceStatus::Idle);
    assert!(f.book.find_contact("carol@live.com").is_none());
}

#[test]
fn test_presence_for_unknown_contact_is_ignored() {
    let f = fixture();
    let reports = f
        .connection
        .on_bytes_received(b"NLN NLN 1:stranger@live.com Who 0\r\n");
    assert_eq!(reports[0].failed, 0);
    assert!(f.book.find_contact("stranger@live.com").is_none());
}

#[test]
fn test_malformed_presence_is_ignored() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);
    bob.set_display_name("Bob");

    let reports = f.connection.on_bytes_received(
        b"NLN ZZZ 1:bob@live.com Robert 0\r\nNLN NLN bob@live.com Robert 0\r\nFLN 77:bob@live.com\r\nNLN NLN\r\n",
    );

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.failed == 0));
    assert_eq!(
        f.recorder.count(|e| matches!(e, ClientEvent::HandlerFailed { .. })),
        0
    );
    assert_eq!(bob.status(), PresenceStatus::Offline);
    assert_eq!(bob.display_name(), "Bob");
    assert_eq!(
        f.recorder.count(|e| matches!(e, ClientEvent::PresenceChanged { .. })),
        0
    );
}

#[test]
fn test_end_point_tracking() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);
    let epid = Uuid::new_v4();

    let online = format!("NLN NLN 1:bob@live.com;{{{}}} Bob 0\r\n", epid);
    f.connection.on_bytes_received(online.as_bytes());
    assert_eq!(bob.end_point(epid).map(|e| e.status), Some(PresenceStatus::Online));

    let offline = format!("FLN 1:bob@live.com;{{{}}}\r\n", epid);
    f.connection.on_bytes_received(offline.as_bytes());
    assert!(bob.end_point(epid).is_none());
}

#[test]
fn test_msnobject_with_known_data_sets_image() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);
    let image = DisplayImage::new("bob@live.com", b"png bytes".to_vec());
    f.book.catalog().add_display_image(&image);

    let context = percent_encode(&image.object().context());
    let line = format!("NLN NLN 1:bob@live.com Bob 0 {}\r\n", context);
    f.connection.on_bytes_received(line.as_bytes());

    assert_eq!(bob.display_image(), Some(image));
}

#[test]
fn test_msnobject_without_data_is_cataloged() {
    let f = fixture();
    let bob = f.book.add_contact("bob@live.com", ClientType::Passport);
    let object = MsnObject::from_data("bob@live.com", MsnObjectType::UserDisplay, b"later");

    let context = percent_encode(&object.context());
    let line = format!("NLN NLN 1:bob@live.com Bob 0 {}\r\n", context);
    f.connection.on_bytes_received(line.as_bytes());

    assert!(bob.display_image().is_none());
    assert!(f.book.catalog().contains(object.sha1c()));
    assert!(f.book.catalog().get_data(object.sha1c()).is_none());
}

#[test]
fn test_adl_and_rml_payloads() {
    let f = fixture();
    let adl = with_payload(
        "ADL 0",
        r#"<ml><d n="live.com"><c n="dave" l="8" t="1"/></d></ml>"#,
    );
    f.connection.on_bytes_received(&adl);

    let dave = f.book.get_contact("dave@live.com", ClientType::Passport).unwrap();
    assert!(dave.has_lists(MsnLists::REVERSE));
    assert_eq!(
        f.recorder.count(|e| matches!(e, ClientEvent::ContactAdded { .. })),
        1
    );

    let rml = with_payload(
        "RML 0",
        r#"<ml><d n="live.com"><c n="dave" l="8" t="1"/></d></ml>"#,
    );
    f.connection.on_bytes_received(&rml);
    assert!(!dave.has_lists(MsnLists::REVERSE));
}

#[test]
fn test_adl_acknowledgement_is_ignored() {
    let f = fixture();
    let reports = f.connection.on_bytes_received(b"ADL 7 OK\r\n");
    assert_eq!(reports[0], DispatchReport { delivered: 1, failed: 0 });
    assert!(f.book.contacts().is_empty());
}
