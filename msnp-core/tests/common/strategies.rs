// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies

use msnp_core::{ClientType, MsnLists};
use proptest::prelude::*;

/// Account names in mixed case, so normalization is exercised.
pub fn account_strategy() -> impl Strategy<Value = String> {
    ("[a-zA-Z][a-zA-Z0-9._]{0,11}", "[a-zA-Z]{2,8}", "(com|net|org)")
        .prop_map(|(user, domain, tld)| format!("{}@{}.{}", user, domain, tld))
}

/// Client types a contact account can be resolved under.
pub fn resolvable_client_type_strategy() -> impl Strategy<Value = ClientType> {
    prop_oneof![
        Just(ClientType::Passport),
        Just(ClientType::Email),
        Just(ClientType::Phone),
        Just(ClientType::Lcs),
    ]
}

/// Any client type, circles included.
pub fn client_type_strategy() -> impl Strategy<Value = ClientType> {
    prop_oneof![resolvable_client_type_strategy(), Just(ClientType::Circle)]
}

/// Any membership bitset.
pub fn lists_strategy() -> impl Strategy<Value = MsnLists> {
    (0u8..32).prop_map(MsnLists::from_bits)
}
