// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Multi-part MIME envelope carried by `SDG` group messages.
//!
//! ```text
//! Routing: 1.0
//! To: 9:00000000-0000-0000-0009-000000000001@live.com
//! From: 1:me@live.com;epid={...}
//!
//! Reliability: 1.0
//! Stream: 0
//! Segment: 3
//!
//! Messaging: 2.0
//! Content-Length: 5
//! Content-Type: Text/plain; charset=UTF-8
//! Message-Type: Text
//!
//! hello
//! ```

use std::fmt;

use crate::error::ParseError;

const SECTION_BREAK: &[u8] = b"\r\n\r\n";
const TEXT_CONTENT_TYPE: &str = "Text/plain; charset=UTF-8";

/// Value of the `Message-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Text,
    Nudge,
    Typing,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "Text",
            MessageType::Nudge => "Nudge",
            MessageType::Typing => "Control/Typing",
        }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match text.trim() {
            "Text" => Ok(MessageType::Text),
            "Nudge" => Ok(MessageType::Nudge),
            "Control/Typing" => Ok(MessageType::Typing),
            other => Err(ParseError::UnknownValue {
                kind: "message type",
                value: other.into(),
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header block. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeHeaders {
    entries: Vec<(String, String)>,
}

impl MimeHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
    }

    fn parse(block: &str) -> Self {
        let mut headers = MimeHeaders::new();
        for line in block.split("\r\n").filter(|l| !l.is_empty()) {
            if let Some((name, value)) = line.split_once(':') {
                headers.set(name.trim(), value.trim());
            }
        }
        headers
    }
}

/// Routing, reliability and messaging headers followed by a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiMimeMessage {
    routing: MimeHeaders,
    reliability: MimeHeaders,
    messaging: MimeHeaders,
    body: Vec<u8>,
}

impl MultiMimeMessage {
    pub fn new(to: &str, from: &str) -> Self {
        let mut routing = MimeHeaders::new();
        routing.set("Routing", "1.0");
        routing.set("To", to);
        routing.set("From", from);

        let mut reliability = MimeHeaders::new();
        reliability.set("Reliability", "1.0");

        let mut messaging = MimeHeaders::new();
        messaging.set("Messaging", "2.0");

        MultiMimeMessage {
            routing,
            reliability,
            messaging,
            body: Vec::new(),
        }
    }

    /// Plain text message.
    pub fn text(to: &str, from: &str, text: &str) -> Self {
        let mut message = Self::new(to, from);
        message.messaging.set("Content-Type", TEXT_CONTENT_TYPE);
        message.set_message_type(MessageType::Text);
        message.body = text.as_bytes().to_vec();
        message
    }

    pub fn nudge(to: &str, from: &str) -> Self {
        let mut message = Self::new(to, from);
        message.messaging.set("Content-Type", TEXT_CONTENT_TYPE);
        message.set_message_type(MessageType::Nudge);
        message.body = b"ID: 1\r\n\r\n".to_vec();
        message
    }

    /// Typing notification. The body is empty.
    pub fn typing(to: &str, from: &str) -> Self {
        let mut message = Self::new(to, from);
        message.messaging.set("Content-Type", TEXT_CONTENT_TYPE);
        message.set_message_type(MessageType::Typing);
        message
    }

    pub fn with_stream(mut self, stream: u64) -> Self {
        self.reliability.set("Stream", stream.to_string());
        self
    }

    pub fn with_segment(mut self, segment: u64) -> Self {
        self.reliability.set("Segment", segment.to_string());
        self
    }

    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.messaging.set("Message-Type", message_type.as_str());
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.messaging
            .get("Message-Type")
            .and_then(|t| MessageType::parse(t).ok())
    }

    pub fn to(&self) -> Option<&str> {
        self.routing.get("To")
    }

    pub fn from(&self) -> Option<&str> {
        self.routing.get("From")
    }

    pub fn segment(&self) -> Option<u64> {
        self.reliability.get("Segment").and_then(|s| s.parse().ok())
    }

    pub fn routing(&self) -> &MimeHeaders {
        &self.routing
    }

    pub fn reliability(&self) -> &MimeHeaders {
        &self.reliability
    }

    pub fn messaging(&self) -> &MimeHeaders {
        &self.messaging
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Wire bytes. `Content-Length` always reflects the body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut messaging = self.messaging.clone();
        messaging.set("Content-Length", self.body.len().to_string());

        let mut out = Vec::new();
        self.routing.write_to(&mut out);
        self.reliability.write_to(&mut out);
        messaging.write_to(&mut out);
        out.extend_from_slice(&self.body);
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let (routing, rest) = split_section(bytes)?;
        let (reliability, rest) = split_section(rest)?;
        let (messaging, body) = split_section(rest)?;

        let messaging = MimeHeaders::parse(messaging);
        let body = match messaging.get("Content-Length") {
            Some(len) => {
                let len: usize = len
                    .parse()
                    .map_err(|_| ParseError::InvalidPayloadLength(len.to_string()))?;
                if body.len() < len {
                    return Err(ParseError::TruncatedPayload {
                        expected: len,
                        actual: body.len(),
                    });
                }
                body[..len].to_vec()
            }
            None => body.to_vec(),
        };

        Ok(MultiMimeMessage {
            routing: MimeHeaders::parse(routing),
            reliability: MimeHeaders::parse(reliability),
            messaging,
            body,
        })
    }
}

fn split_section(bytes: &[u8]) -> Result<(&str, &[u8]), ParseError> {
    let pos = bytes
        .windows(SECTION_BREAK.len())
        .position(|w| w == SECTION_BREAK)
        .ok_or(ParseError::TruncatedPayload {
            expected: SECTION_BREAK.len(),
            actual: 0,
        })?;
    let head = std::str::from_utf8(&bytes[..pos]).map_err(|_| ParseError::InvalidUtf8)?;
    Ok((head, &bytes[pos + SECTION_BREAK.len()..]))
}
