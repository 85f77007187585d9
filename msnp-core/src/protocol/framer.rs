// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Streaming Command Framer
//!
//! Socket reads do not align with command boundaries. The framer buffers
//! bytes until a full header line (and its payload, if any) is available.

use super::command::{find_crlf, Command};
use crate::error::ParseError;

/// Longest header line accepted before the framer gives up on it.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Incremental framer over a byte stream.
#[derive(Debug)]
pub struct CommandFramer {
    buffer: Vec<u8>,
    max_payload: usize,
    /// Header parsed, waiting for this many payload bytes.
    pending: Option<(Command, usize)>,
    /// Bytes of a rejected payload still to be discarded.
    skip: usize,
    /// Discarding an overlong line up to its CRLF.
    skip_line: bool,
}

impl CommandFramer {
    pub fn new(max_payload: usize) -> Self {
        CommandFramer {
            buffer: Vec::new(),
            max_payload,
            pending: None,
            skip: 0,
            skip_line: false,
        }
    }

    /// Appends received bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered, not yet framed bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// True if a header was read and its payload is incomplete.
    pub fn awaiting_payload(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops all buffered state (connection reset).
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending = None;
        self.skip = 0;
        self.skip_line = false;
    }

    /// Returns the next complete command.
    ///
    /// `Ok(None)` means more bytes are needed. On `Err` the offending line
    /// has been consumed and the framer can be polled again.
    pub fn next_command(&mut self) -> Result<Option<Command>, ParseError> {
        if self.skip > 0 {
            let n = self.skip.min(self.buffer.len());
            self.buffer.drain(..n);
            self.skip -= n;
            if self.skip > 0 {
                return Ok(None);
            }
        }

        if self.skip_line {
            match find_crlf(&self.buffer) {
                Some(pos) => {
                    self.buffer.drain(..pos + 2);
                    self.skip_line = false;
                }
                None => {
                    self.discard_partial_line();
                    return Ok(None);
                }
            }
        }

        if let Some((_, len)) = &self.pending {
            let len = *len;
            if self.buffer.len() < len {
                return Ok(None);
            }
            let payload: Vec<u8> = self.buffer.drain(..len).collect();
            if let Some((mut command, _)) = self.pending.take() {
                command.set_payload(payload);
                return Ok(Some(command));
            }
        }

        let Some(pos) = find_crlf(&self.buffer) else {
            if self.buffer.len() > MAX_LINE_LEN {
                self.skip_line = true;
                self.discard_partial_line();
                return Err(ParseError::LineTooLong { max: MAX_LINE_LEN });
            }
            return Ok(None);
        };
        let line: Vec<u8> = self.buffer.drain(..pos + 2).collect();
        if pos > MAX_LINE_LEN {
            return Err(ParseError::LineTooLong { max: MAX_LINE_LEN });
        }
        let header = std::str::from_utf8(&line[..pos]).map_err(|_| ParseError::InvalidUtf8)?;
        let (command, payload_len) = Command::parse_header(header)?;

        match payload_len {
            None => Ok(Some(command)),
            Some(len) if len > self.max_payload => {
                self.skip = len;
                Err(ParseError::PayloadTooLarge {
                    size: len,
                    max: self.max_payload,
                })
            }
            Some(len) => {
                self.pending = Some((command, len));
                self.next_command()
            }
        }
    }

    /// Drops buffered bytes of a line being skipped, keeping a trailing CR
    /// so a CRLF split across reads is still found.
    fn discard_partial_line(&mut self) {
        let keep = usize::from(self.buffer.last() == Some(&b'\r'));
        let cut = self.buffer.len() - keep;
        self.buffer.drain(..cut);
    }

    /// Drains every complete command, collecting parse errors alongside.
    pub fn drain(&mut self) -> Vec<Result<Command, ParseError>> {
        let mut out = Vec::new();
        loop {
            match self.next_command() {
                Ok(Some(command)) => out.push(Ok(command)),
                Ok(None) => break,
                Err(err) => out.push(Err(err)),
            }
        }
        out
    }
}
