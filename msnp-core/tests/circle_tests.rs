// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for circle

mod common;

use std::sync::Arc;

use common::strategies::*;
use msnp_core::*;
use proptest::prelude::*;
use uuid::Uuid;

fn me() -> Owner {
    Owner::new("me@live.com", Uuid::new_v4())
}

fn session(owner: &Owner, processor: Arc<RecordingProcessor>) -> Arc<NotificationSession> {
    let session = Arc::new(NotificationSession::new(processor, owner.clone()));
    session.set_signed_in(true);
    session
}

proptest! {
    #[test]
    fn prop_full_account_resolves_to_same_member(
        account in account_strategy(),
        client_type in resolvable_client_type_strategy(),
    ) {
        let circle = common::circle(&me(), "live.com");
        let member = circle.add_member(&account, client_type);

        let full = circle.member_full_account(&member);
        let short = format!("{}:{}", client_type.code(), account);

        let by_full = circle.get_member(&full, MemberParseOption::ParseAsFullCircleAccount);
        let by_short = circle.get_member(&short, MemberParseOption::ParseAsClientTypeAndAccount);
        prop_assert!(by_full.is_some());
        prop_assert!(Arc::ptr_eq(by_full.as_ref().unwrap(), &member));
        prop_assert!(Arc::ptr_eq(by_short.as_ref().unwrap(), &member));
    }

    #[test]
    fn prop_foreign_circle_address_resolves_nothing(
        account in account_strategy(),
        client_type in resolvable_client_type_strategy(),
    ) {
        let circle = common::circle(&me(), "live.com");
        circle.add_member(&account, client_type);

        let other_abid = format!(
            "{}:{}:{}@live.com",
            Uuid::new_v4(),
            client_type.code(),
            account
        );
        let other_host = format!(
            "{}:{}:{}@other.com",
            circle.address_book_id(),
            client_type.code(),
            account
        );
        prop_assert!(!circle.has_member(&other_abid, MemberParseOption::ParseAsFullCircleAccount));
        prop_assert!(!circle.has_member(&other_host, MemberParseOption::ParseAsFullCircleAccount));
        prop_assert!(circle.remove_member(&other_abid, MemberParseOption::ParseAsFullCircleAccount).is_none());
        prop_assert_eq!(circle.members().len(), 1);
    }
}

#[test]
fn test_circle_contact_lives_in_individual_address_book() {
    let circle = common::circle(&me(), "Live.com");
    let contact = circle.contact();
    assert_eq!(contact.address_book_id(), DEFAULT_ADDRESS_BOOK_ID);
    assert_eq!(contact.client_type(), ClientType::Circle);
    assert_eq!(
        circle.account(),
        format!("{}@live.com", circle.address_book_id())
    );
    assert_eq!(
        circle.routing_address(),
        format!("9:{}@live.com", circle.address_book_id())
    );
    assert_eq!(circle.display_name(), "Test Circle");
    assert_eq!(circle.members().address_book_id(), circle.address_book_id());
}

#[test]
fn test_circle_rejects_unknown_role_and_default_id() {
    assert!(matches!(
        Circle::new(me(), Uuid::new_v4(), "live.com", "Owner", ""),
        Err(MsnpError::Configuration(_))
    ));
    assert!(matches!(
        Circle::new(me(), DEFAULT_ADDRESS_BOOK_ID, "live.com", "Member", ""),
        Err(MsnpError::InvalidOperation(_))
    ));
}

#[test]
fn test_remove_member_by_short_form() {
    let circle = common::circle(&me(), "live.com");
    circle.add_member("Bob@Live.com", ClientType::Passport);
    assert!(circle.has_member("1:bob@live.com", MemberParseOption::ParseAsClientTypeAndAccount));
    assert!(!circle.has_member("32:bob@live.com", MemberParseOption::ParseAsClientTypeAndAccount));
    assert!(!circle.has_member("garbage", MemberParseOption::ParseAsClientTypeAndAccount));

    let removed = circle.remove_member("1:BOB@live.com", MemberParseOption::ParseAsClientTypeAndAccount);
    assert!(removed.is_some());
    assert!(circle.members().is_empty());
}

#[test]
fn test_send_without_session_fails() {
    let circle = common::circle(&me(), "live.com");
    assert!(matches!(circle.send_nudge(), Err(MsnpError::NotSignedIn(_))));
    assert_eq!(circle.segment_counter(), 0);
}

#[test]
fn test_send_while_signed_out_fails() {
    let owner = me();
    let circle = common::circle(&owner, "live.com");
    let processor = Arc::new(RecordingProcessor::new());
    let session = session(&owner, processor.clone());
    session.set_signed_in(false);
    circle.attach_session(session);

    assert!(matches!(circle.send_message("hi"), Err(MsnpError::NotSignedIn(_))));
    assert_eq!(processor.sent_count(), 0);
}

#[test]
fn test_send_while_hidden_fails() {
    let owner = me();
    let circle = common::circle(&owner, "live.com");
    let processor = Arc::new(RecordingProcessor::new());
    circle.attach_session(session(&owner, processor.clone()));

    owner.set_status(PresenceStatus::Hidden);
    assert!(matches!(circle.send_typing_message(), Err(MsnpError::HiddenStatus(_))));
    assert!(matches!(circle.send_nudge(), Err(MsnpError::HiddenStatus(_))));
    assert_eq!(processor.sent_count(), 0);

    owner.set_status(PresenceStatus::Online);
    assert!(circle.send_nudge().is_ok());
    assert_eq!(processor.sent_count(), 1);
}

#[test]
fn test_messages_go_out_as_sdg_with_increasing_segments() {
    common::init_logging();
    let owner = me();
    owner.set_status(PresenceStatus::Online);
    let circle = common::circle(&owner, "live.com");
    let processor = Arc::new(RecordingProcessor::new());
    circle.attach_session(session(&owner, processor.clone()));

    assert_eq!(circle.send_message("hello circle").unwrap(), Some(1));
    assert_eq!(circle.send_nudge().unwrap(), Some(2));
    assert_eq!(circle.send_typing_message().unwrap(), Some(3));

    let sent = processor.sent();
    assert!(sent.iter().all(|c| c.verb() == "SDG"));
    let messages: Vec<MultiMimeMessage> = sent
        .iter()
        .map(|c| MultiMimeMessage::parse(c.payload().unwrap()).unwrap())
        .collect();

    assert_eq!(
        messages.iter().map(|m| m.segment()).collect::<Vec<_>>(),
        vec![Some(1), Some(2), Some(3)]
    );
    assert_eq!(
        messages.iter().map(|m| m.message_type()).collect::<Vec<_>>(),
        vec![
            Some(MessageType::Text),
            Some(MessageType::Nudge),
            Some(MessageType::Typing)
        ]
    );
    assert_eq!(messages[0].body_text(), "hello circle");
    assert_eq!(messages[1].body_text(), "ID: 1\r\n\r\n");
    assert!(messages[2].body().is_empty());

    let expected_to = circle.routing_address();
    for message in &messages {
        assert_eq!(message.to(), Some(expected_to.as_str()));
        assert_eq!(message.from(), Some(owner.endpoint_address().as_str()));
        assert_eq!(message.reliability().get("Stream"), Some("0"));
    }
}

#[test]
fn test_detached_session_stops_sending() {
    let owner = me();
    let circle = common::circle(&owner, "live.com");
    let processor = Arc::new(RecordingProcessor::new());
    circle.attach_session(session(&owner, processor.clone()));
    circle.send_nudge().unwrap();

    circle.detach_session();
    assert!(matches!(circle.send_nudge(), Err(MsnpError::NotSignedIn(_))));
    assert_eq!(processor.sent_count(), 1);
}

#[test]
fn test_circle_list_lookup_and_session_fanout() {
    let owner = me();
    let list = CircleList::new();
    let first = Arc::new(common::circle(&owner, "live.com"));
    let second = Arc::new(common::circle(&owner, "live.com"));
    assert!(list.add(first.clone()));
    assert!(!list.add(first.clone()));
    assert!(list.add(second.clone()));

    assert!(Arc::ptr_eq(&list.get(first.address_book_id()).unwrap(), &first));
    assert!(Arc::ptr_eq(
        &list.get_by_account(&second.account().to_uppercase()).unwrap(),
        &second
    ));

    let processor = Arc::new(RecordingProcessor::new());
    list.attach_session(&session(&owner, processor.clone()));
    first.send_nudge().unwrap();
    second.send_nudge().unwrap();
    assert_eq!(processor.sent_count(), 2);

    assert!(list.remove(first.address_book_id()).is_some());
    assert_eq!(list.len(), 1);
    list.reset();
    assert!(list.is_empty());
}
