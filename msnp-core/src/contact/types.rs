// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact identity vocabulary: client types, list membership, presence.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

/// The individual (default) address book id.
pub const DEFAULT_ADDRESS_BOOK_ID: Uuid = Uuid::nil();

/// Network a contact account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClientType {
    /// Windows Live / passport network.
    Passport,
    /// Office communicator (LCS) network.
    Lcs,
    /// Mobile phone member.
    Phone,
    /// Circle (group address book).
    Circle,
    /// Email-only (federated) member.
    Email,
}

impl ClientType {
    /// Resolution priority for accounts looked up without a client type.
    pub const RESOLUTION_ORDER: [ClientType; 4] = [
        ClientType::Passport,
        ClientType::Email,
        ClientType::Phone,
        ClientType::Lcs,
    ];

    /// Numeric protocol code.
    pub fn code(self) -> u32 {
        match self {
            ClientType::Passport => 1,
            ClientType::Lcs => 2,
            ClientType::Phone => 4,
            ClientType::Circle => 9,
            ClientType::Email => 32,
        }
    }

    /// Maps a numeric protocol code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ClientType::Passport),
            2 => Some(ClientType::Lcs),
            4 => Some(ClientType::Phone),
            9 => Some(ClientType::Circle),
            32 => Some(ClientType::Email),
            _ => None,
        }
    }

    /// Parses a numeric code or a client type name.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if let Ok(code) = text.parse::<u32>() {
            return Self::from_code(code).ok_or_else(|| ParseError::UnknownClientType(text.into()));
        }
        match text.to_ascii_lowercase().as_str() {
            "passport" | "passportmember" => Ok(ClientType::Passport),
            "lcs" => Ok(ClientType::Lcs),
            "phone" | "phonemember" => Ok(ClientType::Phone),
            "circle" | "circlemember" => Ok(ClientType::Circle),
            "email" | "emailmember" => Ok(ClientType::Email),
            _ => Err(ParseError::UnknownClientType(text.into())),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Lowercases and trims an account name.
pub fn normalize_account(account: &str) -> String {
    account.trim().to_lowercase()
}

/// Parses the `clienttype:account` encoding.
pub fn parse_client_type_and_account(text: &str) -> Result<(ClientType, String), ParseError> {
    let (type_part, account) = text
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedAccount(text.into()))?;
    let client_type = ClientType::parse(type_part)?;
    let account = normalize_account(account);
    if account.is_empty() {
        return Err(ParseError::MalformedAccount(text.into()));
    }
    Ok((client_type, account))
}

/// List membership bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MsnLists(u8);

impl MsnLists {
    pub const NONE: MsnLists = MsnLists(0);
    pub const FORWARD: MsnLists = MsnLists(1);
    pub const ALLOWED: MsnLists = MsnLists(2);
    pub const BLOCKED: MsnLists = MsnLists(4);
    pub const REVERSE: MsnLists = MsnLists(8);
    pub const PENDING: MsnLists = MsnLists(16);
    pub const ALL: MsnLists = MsnLists(31);

    pub fn from_bits(bits: u8) -> Self {
        MsnLists(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub fn contains(self, other: MsnLists) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub fn intersects(self, other: MsnLists) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: MsnLists) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MsnLists) {
        self.0 &= !other.0;
    }

    /// Maps a membership role name from the address-book service.
    pub fn from_role(role: &str) -> Result<Self, ParseError> {
        match role.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(Self::FORWARD),
            "allow" | "allowed" => Ok(Self::ALLOWED),
            "block" | "blocked" => Ok(Self::BLOCKED),
            "reverse" => Ok(Self::REVERSE),
            "pending" => Ok(Self::PENDING),
            _ => Err(ParseError::UnknownValue {
                kind: "membership role",
                value: role.into(),
            }),
        }
    }
}

impl BitOr for MsnLists {
    type Output = MsnLists;

    fn bitor(self, rhs: MsnLists) -> MsnLists {
        MsnLists(self.0 | rhs.0)
    }
}

impl BitOrAssign for MsnLists {
    fn bitor_assign(&mut self, rhs: MsnLists) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for MsnLists {
    type Output = MsnLists;

    fn bitand(self, rhs: MsnLists) -> MsnLists {
        MsnLists(self.0 & rhs.0)
    }
}

impl Not for MsnLists {
    type Output = MsnLists;

    fn not(self) -> MsnLists {
        MsnLists(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for MsnLists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(MsnLists, &str); 5] = [
            (MsnLists::FORWARD, "Forward"),
            (MsnLists::ALLOWED, "Allowed"),
            (MsnLists::BLOCKED, "Blocked"),
            (MsnLists::REVERSE, "Reverse"),
            (MsnLists::PENDING, "Pending"),
        ];
        if self.is_empty() {
            return write!(f, "None");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(list, _)| self.contains(*list))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Presence status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresenceStatus {
    #[default]
    Offline,
    Online,
    Busy,
    Idle,
    BeRightBack,
    Away,
    OnThePhone,
    OutToLunch,
    /// Signed in but appearing offline.
    Hidden,
}

impl PresenceStatus {
    /// Three-letter protocol code.
    pub fn code(self) -> &'static str {
        match self {
            PresenceStatus::Offline => "FLN",
            PresenceStatus::Online => "NLN",
            PresenceStatus::Busy => "BSY",
            PresenceStatus::Idle => "IDL",
            PresenceStatus::BeRightBack => "BRB",
            PresenceStatus::Away => "AWY",
            PresenceStatus::OnThePhone => "PHN",
            PresenceStatus::OutToLunch => "LUN",
            PresenceStatus::Hidden => "HDN",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ParseError> {
        match code {
            "FLN" => Ok(PresenceStatus::Offline),
            "NLN" => Ok(PresenceStatus::Online),
            "BSY" => Ok(PresenceStatus::Busy),
            "IDL" => Ok(PresenceStatus::Idle),
            "BRB" => Ok(PresenceStatus::BeRightBack),
            "AWY" => Ok(PresenceStatus::Away),
            "PHN" => Ok(PresenceStatus::OnThePhone),
            "LUN" => Ok(PresenceStatus::OutToLunch),
            "HDN" => Ok(PresenceStatus::Hidden),
            _ => Err(ParseError::UnknownValue {
                kind: "presence status",
                value: code.into(),
            }),
        }
    }
}

/// Unique identity of a contact record: (address book, account, client type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey {
    address_book_id: Uuid,
    account: String,
    client_type: ClientType,
}

impl ContactKey {
    pub fn new(address_book_id: Uuid, account: &str, client_type: ClientType) -> Self {
        ContactKey {
            address_book_id,
            account: normalize_account(account),
            client_type,
        }
    }

    pub fn address_book_id(&self) -> Uuid {
        self.address_book_id
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    /// Key shared by all siblings of this contact.
    pub fn sibling_key(&self) -> SiblingKey {
        SiblingKey::new(self.client_type, &self.account)
    }
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{};via={}",
            self.client_type, self.account, self.address_book_id
        )
    }
}

/// `clienttype:account` key grouping siblings across address books.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiblingKey(String);

impl SiblingKey {
    pub fn new(client_type: ClientType, account: &str) -> Self {
        SiblingKey(format!("{}:{}", client_type.code(), normalize_account(account)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiblingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
