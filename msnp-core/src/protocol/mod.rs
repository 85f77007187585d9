// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Module
//!
//! Command framing, transaction ids and handler dispatch for one
//! connection.
//!
//! # Data flow
//!
//! ```text
//! bytes -> CommandFramer -> Command -> MessageDispatcher -> MessageHandler(s)
//! MessageHandler -> MessageProcessor::send_message -> TransactionSequencer -> bytes
//! ```

mod command;
mod dispatcher;
mod encoding;
mod framer;
mod mime;
mod mock;
mod processor;
mod sequencer;

pub use command::{Command, NO_TRANSACTION_VERBS, OUTBOUND_WITHOUT_TRANSACTION, PAYLOAD_VERBS};
pub use dispatcher::{DispatchReport, MessageDispatcher, MessageHandler};
pub use encoding::{percent_decode, percent_encode};
pub use framer::{CommandFramer, MAX_LINE_LEN};
pub use mime::{MessageType, MimeHeaders, MultiMimeMessage};
pub use mock::{MockByteTransport, RecordingProcessor};
pub use processor::{ByteTransport, MessageProcessor, NotificationConnection};
pub use sequencer::TransactionSequencer;
