//! Town aggregates and the membership role ladder.
//!
//! A [`Town`] is the unit of cross-server state: every server in a cluster
//! holds a replica of every town, refreshed through update broadcasts. The
//! role ladder here is deliberately small; richer permission systems layer
//! on top of the [`Privilege`] checks the manager performs.

use crate::audit::{Action, Log};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by town aggregate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TownError {
    /// The referenced user is not on the member roster.
    #[error("user {0} is not a member of the town")]
    NotAMember(Uuid),
    /// The town balance cannot cover the requested amount.
    #[error("insufficient funds: requested {requested}, held {held}")]
    InsufficientFunds { requested: i64, held: i64 },
}

/// Opaque storage identifier of a town.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TownId(pub i64);

impl std::fmt::Display for TownId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for TownId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Actions a member may be authorized to perform within their town.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Claim,
    Unclaim,
    Invite,
    Evict,
    Promote,
    Demote,
    Rename,
    Chat,
    LevelUp,
    Withdraw,
}

/// Rung on the town role ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Resident,
    Trustee,
    Mayor,
}

impl Role {
    /// Ordering weight; higher outranks lower.
    pub fn weight(&self) -> u8 {
        match self {
            Role::Resident => 1,
            Role::Trustee => 2,
            Role::Mayor => 3,
        }
    }

    /// The privileges this role grants.
    pub fn privileges(&self) -> &'static [Privilege] {
        match self {
            Role::Resident => &[Privilege::Chat],
            Role::Trustee => &[
                Privilege::Chat,
                Privilege::Claim,
                Privilege::Unclaim,
                Privilege::Invite,
                Privilege::Evict,
            ],
            Role::Mayor => &[
                Privilege::Chat,
                Privilege::Claim,
                Privilege::Unclaim,
                Privilege::Invite,
                Privilege::Evict,
                Privilege::Promote,
                Privilege::Demote,
                Privilege::Rename,
                Privilege::LevelUp,
                Privilege::Withdraw,
            ],
        }
    }

    /// Whether this role grants the privilege.
    pub fn allows(&self, privilege: Privilege) -> bool {
        self.privileges().contains(&privilege)
    }

    /// One step up the ladder. The mayor seat is only reachable through an
    /// ownership transfer, never a promotion.
    pub fn promoted(&self) -> Option<Role> {
        match self {
            Role::Resident => Some(Role::Trustee),
            Role::Trustee | Role::Mayor => None,
        }
    }

    /// One step down the ladder.
    pub fn demoted(&self) -> Option<Role> {
        match self {
            Role::Trustee => Some(Role::Resident),
            Role::Resident | Role::Mayor => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Resident => "resident",
            Role::Trustee => "trustee",
            Role::Mayor => "mayor",
        })
    }
}

/// A user's resolved membership in a town.
///
/// Assembled by lookups; carries everything an authorization gate needs in
/// one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user: User,
    pub town: TownId,
    pub role: Role,
}

impl Member {
    pub fn new(user: User, town: TownId, role: Role) -> Self {
        Self { user, town, role }
    }

    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        self.role.allows(privilege)
    }
}

/// A town: the aggregate every server replicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Town {
    id: TownId,
    name: String,
    color: String,
    members: HashMap<Uuid, Role>,
    log: Log,
    level: u32,
    money: i64,
    claim_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    greeting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    farewell: Option<String>,
}

impl Town {
    /// Creates a level-1 town founded by `creator`, who becomes its mayor.
    ///
    /// The founding is the first entry of the town's audit log, and the
    /// display color is derived from the name so every server renders the
    /// same town the same way without coordination.
    pub fn create(id: TownId, name: impl Into<String>, creator: User) -> Self {
        let name = name.into();
        let color = Self::color_for(&name);
        let mut members = HashMap::new();
        members.insert(creator.uuid, Role::Mayor);
        Self {
            id,
            name,
            color,
            members,
            log: Log::new_town_log(creator),
            level: 1,
            money: 0,
            claim_count: 0,
            bio: None,
            greeting: None,
            farewell: None,
        }
    }

    /// Stable display color for a town name, as a `#rrggbb` string.
    pub fn color_for(name: &str) -> String {
        // FNV-1a keeps the color identical across servers and restarts,
        // which a per-process hasher would not.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in name.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!(
            "#{:02x}{:02x}{:02x}",
            (hash >> 16) as u8,
            (hash >> 8) as u8,
            hash as u8
        )
    }

    pub fn id(&self) -> TownId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn set_bio(&mut self, bio: impl Into<String>) {
        self.bio = Some(bio.into());
    }

    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn set_greeting(&mut self, greeting: impl Into<String>) {
        self.greeting = Some(greeting.into());
    }

    pub fn farewell(&self) -> Option<&str> {
        self.farewell.as_deref()
    }

    pub fn set_farewell(&mut self, farewell: impl Into<String>) {
        self.farewell = Some(farewell.into());
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    pub fn money(&self) -> i64 {
        self.money
    }

    pub fn deposit(&mut self, amount: i64) {
        self.money += amount;
    }

    /// Spends from the town balance, refusing to overdraw.
    pub fn withdraw(&mut self, amount: i64) -> Result<(), TownError> {
        if amount > self.money {
            return Err(TownError::InsufficientFunds {
                requested: amount,
                held: self.money,
            });
        }
        self.money -= amount;
        Ok(())
    }

    pub fn claim_count(&self) -> u32 {
        self.claim_count
    }

    pub fn set_claim_count(&mut self, count: u32) {
        self.claim_count = count;
    }

    /// Member roster as `(uuid, role)` pairs.
    pub fn members(&self) -> impl Iterator<Item = (Uuid, Role)> + '_ {
        self.members.iter().map(|(uuid, role)| (*uuid, *role))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, uuid: Uuid) -> bool {
        self.members.contains_key(&uuid)
    }

    pub fn role_of(&self, uuid: Uuid) -> Option<Role> {
        self.members.get(&uuid).copied()
    }

    /// Adds a member or changes an existing member's role.
    pub fn add_member(&mut self, uuid: Uuid, role: Role) {
        self.members.insert(uuid, role);
    }

    /// Removes a member, returning the role they held.
    pub fn remove_member(&mut self, uuid: Uuid) -> Option<Role> {
        self.members.remove(&uuid)
    }

    /// The current mayor, if the roster has one.
    pub fn mayor(&self) -> Option<Uuid> {
        self.members
            .iter()
            .find(|(_, role)| **role == Role::Mayor)
            .map(|(uuid, _)| *uuid)
    }

    /// Hands the mayor seat to an existing member.
    ///
    /// The outgoing mayor steps down to trustee.
    pub fn transfer_ownership(&mut self, new_mayor: Uuid) -> Result<(), TownError> {
        if !self.is_member(new_mayor) {
            return Err(TownError::NotAMember(new_mayor));
        }
        if let Some(old_mayor) = self.mayor() {
            self.members.insert(old_mayor, Role::Trustee);
        }
        self.members.insert(new_mayor, Role::Mayor);
        Ok(())
    }

    /// Claim budget at the current level.
    pub fn max_claims(&self) -> u32 {
        self.level * 6
    }

    /// Member budget at the current level.
    pub fn max_members(&self) -> u32 {
        self.level * 5
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    /// Appends an action to the town's audit log at the current instant.
    pub fn record(&mut self, action: Action) {
        self.log.log(action);
    }

    /// Replaces the audit log wholesale. Intended for data migration.
    pub fn set_log(&mut self, log: Log) {
        self.log = log;
    }

    /// When the town was founded, taken from the audit log.
    pub fn founded(&self) -> DateTime<Utc> {
        self.log.founded_time()
    }
}
