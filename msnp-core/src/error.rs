// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error Types
//!
//! Unified error type for the client core, plus the parse and network
//! errors raised at the protocol boundary.

use thiserror::Error;

/// Errors raised while framing or parsing protocol text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Command header is not valid UTF-8.
    #[error("command header is not valid UTF-8")]
    InvalidUtf8,

    /// A line carried no verb.
    #[error("empty command line")]
    EmptyLine,

    /// Payload length argument could not be used.
    #[error("invalid payload length '{0}'")]
    InvalidPayloadLength(String),

    /// Payload length exceeds the configured maximum.
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Header line grew past the maximum without a CRLF.
    #[error("header line exceeds maximum of {max} bytes")]
    LineTooLong { max: usize },

    /// Command block ended before its declared payload.
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// Client type code or name is not known.
    #[error("unknown client type '{0}'")]
    UnknownClientType(String),

    /// Account string does not follow the expected encoding.
    #[error("malformed account string '{0}'")]
    MalformedAccount(String),

    /// Enumerated server vocabulary value was not recognized.
    #[error("unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

/// Errors raised by the connection layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Transport is not connected.
    #[error("not connected")]
    NotConnected,

    /// Sending bytes failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Transport was closed by the remote end.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Unified error type for client core operations.
#[derive(Error, Debug)]
pub enum MsnpError {
    /// Operation requires a signed-in session.
    #[error("not signed in: {0}")]
    NotSignedIn(String),

    /// Operation is not allowed while the owner appears offline.
    #[error("cannot {0} while status is Hidden")]
    HiddenStatus(String),

    /// Invalid operation in current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Owner has already been assigned to a contact list.
    #[error("owner already set")]
    OwnerAlreadySet,

    /// Operation is only valid on the individual address book.
    #[error("only the default address book may {0}")]
    NotDefaultAddressBook(String),

    /// Server supplied configuration could not be interpreted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Contact not found.
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    /// A registered handler failed while handling a command.
    #[error("handler {handler} failed on {verb}: {message}")]
    Handler {
        verb: String,
        handler: String,
        message: String,
    },

    /// Parse failure.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Network failure.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure (config files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MsnpError {
    fn from(err: serde_json::Error) -> Self {
        MsnpError::Serialization(err.to_string())
    }
}

/// Result type for client core operations.
pub type MsnpResult<T> = Result<T, MsnpError>;
