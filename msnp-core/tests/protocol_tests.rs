// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for protocol framing and the notification connection

mod common;

use std::sync::Arc;

use common::EventRecorder;
use msnp_core::*;
use parking_lot::Mutex;

/// Records verbs in delivery order.
#[derive(Default)]
struct VerbLog {
    verbs: Mutex<Vec<String>>,
}

impl MessageHandler for VerbLog {
    fn handle_message(&self, _: &dyn MessageProcessor, command: Command) -> Result<(), MsnpError> {
        self.verbs.lock().push(command.verb().to_string());
        Ok(())
    }
}

fn connection() -> (
    NotificationConnection<MockByteTransport>,
    MockByteTransport,
    Arc<VerbLog>,
    EventRecorder,
) {
    let events = Arc::new(EventDispatcher::new());
    let recorder = EventRecorder::attach(&events);
    let dispatcher = Arc::new(MessageDispatcher::new(events));
    let log = Arc::new(VerbLog::default());
    dispatcher.register_handler(log.clone());

    let transport = MockByteTransport::new();
    let config = ClientConfig::default().with_max_payload(64);
    let connection = NotificationConnection::new(transport.clone(), dispatcher, &config);
    (connection, transport, log, recorder)
}

#[test]
fn test_outbound_commands_get_increasing_transaction_ids() {
    common::init_logging();
    let (connection, transport, _, _) = connection();

    assert_eq!(connection.send_message(Command::new("CHG").with_arg("NLN")).unwrap(), Some(1));
    assert_eq!(connection.send_message(Command::new("UUX").with_payload(b"<Data/>".to_vec())).unwrap(), Some(2));
    assert_eq!(connection.send_message(Command::new("PNG")).unwrap(), None);
    assert_eq!(connection.send_message(Command::new("ADL").with_arg("OK")).unwrap(), Some(3));

    let sent = transport.sent();
    assert_eq!(sent[0], b"CHG 1 NLN\r\n".to_vec());
    assert_eq!(sent[1], b"UUX 2 7\r\n<Data/>".to_vec());
    assert_eq!(sent[2], b"PNG\r\n".to_vec());
    assert_eq!(connection.current_transaction_id(), 3);
}

#[test]
fn test_reset_restarts_transaction_ids() {
    let (connection, _, _, _) = connection();
    connection.send_message(Command::new("CHG")).unwrap();
    connection.send_message(Command::new("CHG")).unwrap();
    connection.reset();
    assert_eq!(connection.send_message(Command::new("CHG")).unwrap(), Some(1));
}

#[test]
fn test_send_while_disconnected_fails() {
    let (connection, transport, _, _) = connection();
    transport.set_connected(false);
    assert_eq!(
        connection.send_message(Command::new("CHG")),
        Err(NetworkError::NotConnected)
    );
    assert_eq!(connection.current_transaction_id(), 0);
}

#[test]
fn test_commands_dispatched_in_arrival_order_across_reads() {
    let (connection, _, log, _) = connection();
    connection.on_bytes_received(b"QNG 50\r\nNOT 5\r\nab");
    connection.on_bytes_received(b"cdeFLN 1:a@b.com\r\nUBX 1:a@b.com 0\r\n");

    assert_eq!(*log.verbs.lock(), vec!["QNG", "NOT", "FLN", "UBX"]);
}

#[test]
fn test_parse_failures_are_reported_not_raised() {
    let (connection, _, log, recorder) = connection();
    let reports = connection.on_bytes_received(b"\r\nNOT 100\r\n");

    assert_eq!(reports.len(), 0);
    assert_eq!(
        recorder.count(|e| matches!(e, ClientEvent::ParseFailed { .. })),
        2
    );
    assert!(log.verbs.lock().is_empty());

    // The oversized payload is discarded as it arrives.
    connection.on_bytes_received(&[b'x'; 60]);
    connection.on_bytes_received(&[b'x'; 40]);
    connection.on_bytes_received(b"QNG 2\r\n");
    assert_eq!(*log.verbs.lock(), vec!["QNG"]);
}

#[test]
fn test_framer_round_trip_through_serialize() {
    let command = Command::new("SDG")
        .with_transaction_id(9)
        .with_payload(b"Routing: 1.0\r\n\r\n".to_vec());
    let mut framer = CommandFramer::new(1024);
    framer.feed(&command.serialize());
    assert_eq!(framer.next_command().unwrap(), Some(command));
}

#[test]
fn test_sent_commands_parse_back() {
    let (connection, transport, _, _) = connection();
    connection
        .send_message(Command::new("ADL").with_payload(b"<ml/>".to_vec()))
        .unwrap();
    let sent = transport.sent_commands();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].verb(), "ADL");
    assert_eq!(sent[0].transaction_id(), Some(1));
    assert_eq!(sent[0].payload(), Some(&b"<ml/>"[..]));
}
