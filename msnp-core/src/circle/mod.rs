// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Circles
//!
//! A circle is a group conversation with its own address book. It appears
//! in the individual address book as a contact of type [`ClientType::Circle`]
//! named `abid@hostdomain`, and keeps its members in a [`ContactList`]
//! scoped to its own address book id.
//!
//! Members are addressed either as `clienttype:account` or, in commands
//! routed through the circle, as `abid:clienttype:account@hostdomain`.

mod list;

pub use list::CircleList;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::contact::{
    parse_client_type_and_account, ClientType, Contact, ContactList, Owner, PresenceStatus,
    DEFAULT_ADDRESS_BOOK_ID,
};
use crate::error::{MsnpError, MsnpResult};
use crate::protocol::{Command, MultiMimeMessage};
use crate::session::NotificationSession;

/// The signed-in user's role in a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircleRole {
    None,
    Admin,
    AssistantAdmin,
    Member,
    /// Invitation sent, not yet accepted.
    StatePendingOutbound,
}

impl CircleRole {
    /// Maps the address-book service vocabulary.
    pub fn parse(text: &str) -> MsnpResult<Self> {
        match text.trim() {
            "None" => Ok(CircleRole::None),
            "Admin" => Ok(CircleRole::Admin),
            "AssistantAdmin" => Ok(CircleRole::AssistantAdmin),
            "Member" => Ok(CircleRole::Member),
            "StatePendingOutbound" => Ok(CircleRole::StatePendingOutbound),
            other => Err(MsnpError::Configuration(format!(
                "unknown circle role '{}'",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircleRole::None => "None",
            CircleRole::Admin => "Admin",
            CircleRole::AssistantAdmin => "AssistantAdmin",
            CircleRole::Member => "Member",
            CircleRole::StatePendingOutbound => "StatePendingOutbound",
        }
    }
}

impl fmt::Display for CircleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a member string is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberParseOption {
    /// `clienttype:account`
    ParseAsClientTypeAndAccount,
    /// `abid:clienttype:account@hostdomain`
    ParseAsFullCircleAccount,
}

/// Splits `abid:clienttype:account@hostdomain`.
///
/// Returns (address book id, client type, account, host domain).
pub fn parse_full_circle_account(text: &str) -> Option<(Uuid, ClientType, String, String)> {
    let (abid, rest) = text.split_once(':')?;
    let (client_type, rest) = rest.split_once(':')?;
    let (account, host_domain) = rest.rsplit_once('@')?;
    let abid = Uuid::parse_str(abid.trim()).ok()?;
    let client_type = ClientType::parse(client_type).ok()?;
    if account.is_empty() || host_domain.is_empty() {
        return None;
    }
    Some((
        abid,
        client_type,
        account.to_lowercase(),
        host_domain.to_lowercase(),
    ))
}

/// A group conversation and its members.
pub struct Circle {
    contact: Arc<Contact>,
    address_book_id: Uuid,
    host_domain: String,
    role: CircleRole,
    members: ContactList,
    segment_counter: AtomicU64,
    me: Owner,
    session: RwLock<Option<Arc<NotificationSession>>>,
}

impl Circle {
    /// Creates a circle for `me`. Fails with a configuration error if the
    /// role text is not part of the service vocabulary.
    pub fn new(
        me: Owner,
        address_book_id: Uuid,
        host_domain: &str,
        role_text: &str,
        display_name: &str,
    ) -> MsnpResult<Self> {
        let role = CircleRole::parse(role_text)?;
        if address_book_id == DEFAULT_ADDRESS_BOOK_ID {
            return Err(MsnpError::InvalidOperation(
                "a circle cannot use the individual address book id".into(),
            ));
        }
        let host_domain = host_domain.trim().to_lowercase();
        let contact = Arc::new(Contact::new(
            DEFAULT_ADDRESS_BOOK_ID,
            &format!("{}@{}", address_book_id, host_domain),
            ClientType::Circle,
        ));
        if !display_name.is_empty() {
            contact.set_display_name(display_name);
        }

        Ok(Circle {
            contact,
            address_book_id,
            host_domain,
            role,
            members: ContactList::new(address_book_id),
            segment_counter: AtomicU64::new(0),
            me,
            session: RwLock::new(None),
        })
    }

    /// The circle's own contact record in the individual address book.
    pub fn contact(&self) -> &Arc<Contact> {
        &self.contact
    }

    pub fn address_book_id(&self) -> Uuid {
        self.address_book_id
    }

    pub fn host_domain(&self) -> &str {
        &self.host_domain
    }

    pub fn role(&self) -> CircleRole {
        self.role
    }

    pub fn display_name(&self) -> String {
        self.contact.display_name()
    }

    pub fn me(&self) -> &Owner {
        &self.me
    }

    pub fn members(&self) -> &ContactList {
        &self.members
    }

    /// `abid@hostdomain`
    pub fn account(&self) -> &str {
        self.contact.account()
    }

    /// `9:abid@hostdomain`, the routing address of the circle.
    pub fn routing_address(&self) -> String {
        format!("{}:{}", ClientType::Circle.code(), self.account())
    }

    pub fn attach_session(&self, session: Arc<NotificationSession>) {
        *self.session.write() = Some(session);
    }

    pub fn detach_session(&self) {
        *self.session.write() = None;
    }

    /// Adds (or returns) a member record in this circle only.
    ///
    /// The member is not registered with a [`ContactManager`], so changes
    /// to its siblings never reach it. Hosts holding an [`AddressBook`] should use
    /// [`AddressBook::add_circle_member`].
    ///
    /// [`ContactManager`]: crate::ContactManager
    /// [`AddressBook`]: crate::AddressBook
    /// [`AddressBook::add_circle_member`]: crate::AddressBook::add_circle_member
    pub fn add_member(&self, account: &str, client_type: ClientType) -> Arc<Contact> {
        self.members.get_or_create(account, client_type)
    }

    pub fn get_member(&self, text: &str, option: MemberParseOption) -> Option<Arc<Contact>> {
        let (client_type, account) = self.resolve_member(text, option)?;
        self.members.get_typed(&account, client_type)
    }

    pub fn has_member(&self, text: &str, option: MemberParseOption) -> bool {
        self.get_member(text, option).is_some()
    }

    pub fn remove_member(&self, text: &str, option: MemberParseOption) -> Option<Arc<Contact>> {
        let (client_type, account) = self.resolve_member(text, option)?;
        self.members.remove(&account, client_type)
    }

    /// `abid:clienttype:account@hostdomain` for a member.
    pub fn member_full_account(&self, member: &Contact) -> String {
        format!(
            "{}:{}:{}@{}",
            self.address_book_id,
            member.client_type().code(),
            member.account(),
            self.host_domain
        )
    }

    /// Next segment number for outbound reliability headers. Starts at 1.
    pub fn increase_segment_counter(&self) -> u64 {
        self.segment_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn segment_counter(&self) -> u64 {
        self.segment_counter.load(Ordering::SeqCst)
    }

    pub fn send_nudge(&self) -> MsnpResult<Option<u32>> {
        let session = self.check_can_send("send a nudge")?;
        let message = MultiMimeMessage::nudge(&self.routing_address(), &self.me.endpoint_address());
        self.send_sdg(&session, message)
    }

    pub fn send_message(&self, text: &str) -> MsnpResult<Option<u32>> {
        let session = self.check_can_send("send a message")?;
        let message =
            MultiMimeMessage::text(&self.routing_address(), &self.me.endpoint_address(), text);
        self.send_sdg(&session, message)
    }

    pub fn send_typing_message(&self) -> MsnpResult<Option<u32>> {
        let session = self.check_can_send("send a typing message")?;
        let message =
            MultiMimeMessage::typing(&self.routing_address(), &self.me.endpoint_address());
        self.send_sdg(&session, message)
    }

    fn check_can_send(&self, action: &str) -> MsnpResult<Arc<NotificationSession>> {
        let session = self.session.read().clone().ok_or_else(|| {
            MsnpError::NotSignedIn(format!(
                "cannot {} to circle {}: no session attached",
                action,
                self.account()
            ))
        })?;
        if !session.is_signed_in() {
            return Err(MsnpError::NotSignedIn(format!(
                "cannot {} to circle {}",
                action,
                self.account()
            )));
        }
        if self.me.status() == PresenceStatus::Hidden {
            return Err(MsnpError::HiddenStatus(action.to_string()));
        }
        Ok(session)
    }

    fn send_sdg(
        &self,
        session: &NotificationSession,
        message: MultiMimeMessage,
    ) -> MsnpResult<Option<u32>> {
        let message = message
            .with_stream(0)
            .with_segment(self.increase_segment_counter());
        let command = Command::new("SDG").with_payload(message.to_bytes());
        session.send(command)
    }

    fn resolve_member(&self, text: &str, option: MemberParseOption) -> Option<(ClientType, String)> {
        match option {
            MemberParseOption::ParseAsClientTypeAndAccount => {
                match parse_client_type_and_account(text) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        tracing::warn!(circle = self.account(), value = text, error = %err, "unparsable member");
                        None
                    }
                }
            }
            MemberParseOption::ParseAsFullCircleAccount => {
                let Some((abid, client_type, account, host_domain)) =
                    parse_full_circle_account(text)
                else {
                    tracing::warn!(circle = self.account(), value = text, "unparsable circle member");
                    return None;
                };
                if abid != self.address_book_id || host_domain != self.host_domain {
                    tracing::debug!(
                        circle = self.account(),
                        value = text,
                        "member addressed to another circle"
                    );
                    return None;
                }
                Some((client_type, account))
            }
        }
    }
}

impl fmt::Debug for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circle")
            .field("account", &self.account())
            .field("role", &self.role)
            .field("members", &self.members.len())
            .field("segment", &self.segment_counter())
            .finish()
    }
}
