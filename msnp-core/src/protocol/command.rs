// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Commands
//!
//! A command is a verb, an optional transaction id, ordered arguments and
//! an optional payload:
//!
//! ```text
//! VERB [TrID] arg1 arg2 ... [payload-length]\r\n
//! [payload bytes]
//! ```
//!
//! Whether the second token is a transaction id and whether the last
//! argument is a payload length depends on the verb.

use std::fmt;

use crate::error::ParseError;

/// Verbs whose last argument is the byte length of a trailing payload.
pub const PAYLOAD_VERBS: &[&str] = &[
    "MSG", "UBX", "UUX", "NOT", "GCF", "ADL", "RML", "FQY", "UBN", "UUN", "SDG", "NFY", "PUT",
    "DEL", "IPG",
];

/// Inbound verbs whose first argument is not a transaction id.
pub const NO_TRANSACTION_VERBS: &[&str] = &[
    "NOT", "QNG", "NLN", "FLN", "UBX", "UBN", "MSG", "RNG", "IPG", "NFY", "OUT",
];

/// Outbound verbs sent without a transaction id.
pub const OUTBOUND_WITHOUT_TRANSACTION: &[&str] = &["PNG", "OUT"];

const CRLF: &[u8] = b"\r\n";

/// A parsed or outbound protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    transaction_id: Option<u32>,
    args: Vec<String>,
    payload: Option<Vec<u8>>,
}

impl Command {
    pub fn new(verb: &str) -> Self {
        Command {
            verb: verb.to_ascii_uppercase(),
            transaction_id: None,
            args: Vec::new(),
            payload: None,
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: u32) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn transaction_id(&self) -> Option<u32> {
        self.transaction_id
    }

    pub fn set_transaction_id(&mut self, transaction_id: u32) {
        self.transaction_id = Some(transaction_id);
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Payload decoded as UTF-8 (lossy).
    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }

    /// True for numeric server error replies.
    pub fn is_error(&self) -> bool {
        is_error_verb(&self.verb)
    }

    pub fn error_code(&self) -> Option<u16> {
        if self.is_error() {
            self.verb.parse().ok()
        } else {
            None
        }
    }

    /// True if outbound sends stamp this verb with a transaction id.
    pub fn takes_transaction_id(&self) -> bool {
        !OUTBOUND_WITHOUT_TRANSACTION.contains(&self.verb.as_str())
    }

    /// Wire bytes. A payload's length is appended as the final argument.
    pub fn serialize(&self) -> Vec<u8> {
        let mut header = self.verb.clone();
        if let Some(trid) = self.transaction_id {
            header.push(' ');
            header.push_str(&trid.to_string());
        }
        for arg in &self.args {
            header.push(' ');
            header.push_str(arg);
        }
        if let Some(payload) = &self.payload {
            header.push(' ');
            header.push_str(&payload.len().to_string());
        }

        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(CRLF);
        if let Some(payload) = &self.payload {
            bytes.extend_from_slice(payload);
        }
        bytes
    }

    /// Parses one complete command block. The trailing CRLF of the header
    /// is optional when there is no payload.
    pub fn parse(block: &[u8]) -> Result<Command, ParseError> {
        let (header, rest) = match find_crlf(block) {
            Some(pos) => (&block[..pos], &block[pos + CRLF.len()..]),
            None => (block, &block[block.len()..]),
        };
        let header = std::str::from_utf8(header).map_err(|_| ParseError::InvalidUtf8)?;
        let (mut command, payload_len) = Command::parse_header(header)?;

        if let Some(len) = payload_len {
            if rest.len() < len {
                return Err(ParseError::TruncatedPayload {
                    expected: len,
                    actual: rest.len(),
                });
            }
            command.payload = Some(rest[..len].to_vec());
        }
        Ok(command)
    }

    /// Parses a header line (without CRLF). Returns the command and the
    /// declared payload length, if the verb carries one.
    pub fn parse_header(line: &str) -> Result<(Command, Option<usize>), ParseError> {
        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let verb = tokens.next().ok_or(ParseError::EmptyLine)?;
        let mut args: Vec<String> = tokens.map(str::to_string).collect();

        let error = is_error_verb(verb);
        let mut transaction_id = None;
        if error || !NO_TRANSACTION_VERBS.contains(&verb) {
            if let Some(trid) = args.first().and_then(|a| a.parse::<u32>().ok()) {
                transaction_id = Some(trid);
                args.remove(0);
            }
        }

        let mut payload_len = None;
        if error || PAYLOAD_VERBS.contains(&verb) {
            if let Some(last) = args.last() {
                if last.bytes().all(|b| b.is_ascii_digit()) {
                    let len = last
                        .parse::<usize>()
                        .map_err(|_| ParseError::InvalidPayloadLength(last.clone()))?;
                    payload_len = Some(len);
                    args.pop();
                }
            }
        }

        Ok((
            Command {
                verb: verb.to_string(),
                transaction_id,
                args,
                payload: None,
            },
            payload_len,
        ))
    }

    pub(crate) fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = Some(payload);
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb)?;
        if let Some(trid) = self.transaction_id {
            write!(f, " {}", trid)?;
        }
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Some(payload) = &self.payload {
            write!(f, " [{} bytes]", payload.len())?;
        }
        Ok(())
    }
}

fn is_error_verb(verb: &str) -> bool {
    verb.len() == 3 && verb.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == CRLF)
}
