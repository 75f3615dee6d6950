//! Typed values carried inside cross-server messages.
//!
//! The payload union is a closed set, encoded with an explicit serde tag so
//! both ends agree on the variant without any reflection. Handlers read the
//! variant they expect through the typed accessors; a mismatch yields
//! `None` and the handler drops the message instead of panicking.

use dominion_core::{TownId, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A pending town membership invitation.
///
/// Travels inside [`Payload::Invite`] and is parked in the receiving
/// server's pending-invite map until the target answers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub town: TownId,
    pub sender: User,
}

impl Invite {
    pub fn new(town: TownId, sender: User) -> Self {
        Self { town, sender }
    }
}

/// The value a [`Message`](super::Message) carries.
///
/// `UuidSet` is reserved for claim-deletion diffs; it is part of the wire
/// contract and versioned with the envelope even though no current handler
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Empty,
    Integer(i64),
    String(String),
    Bool(bool),
    Invite(Invite),
    UuidSet(BTreeSet<Uuid>),
}

impl Payload {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn integer(value: i64) -> Self {
        Self::Integer(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    pub fn invite(invite: Invite) -> Self {
        Self::Invite(invite)
    }

    pub fn uuid_set(uuids: BTreeSet<Uuid>) -> Self {
        Self::UuidSet(uuids)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The integer payload read as a town id.
    pub fn as_town_id(&self) -> Option<TownId> {
        self.as_integer().map(TownId)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_invite(&self) -> Option<&Invite> {
        match self {
            Self::Invite(invite) => Some(invite),
            _ => None,
        }
    }

    pub fn as_uuid_set(&self) -> Option<&BTreeSet<Uuid>> {
        match self {
            Self::UuidSet(uuids) => Some(uuids),
            _ => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Empty
    }
}
