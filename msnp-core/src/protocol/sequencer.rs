// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transaction id sequencer, one per connection.

use std::sync::atomic::{AtomicU32, Ordering};

/// Issues strictly increasing transaction ids.
///
/// Starts at 0; the first id handed out is 1.
#[derive(Debug, Default)]
pub struct TransactionSequencer {
    current: AtomicU32,
}

impl TransactionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the new id.
    pub fn increase_transaction_id(&self) -> u32 {
        self.current.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Last id handed out (0 if none).
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    /// Back to 0. Only on connection reset.
    pub(crate) fn reset(&self) {
        self.current.store(0, Ordering::SeqCst);
    }
}
