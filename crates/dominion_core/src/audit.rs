//! Append-only town audit logs.
//!
//! Every town carries a [`Log`]: a time-ordered record of what happened to
//! it, starting with its founding. The founding entry doubles as the
//! town's creation timestamp, so migrations must take care to preserve it
//! (see [`Log::migrated_log`]).

use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of event an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    CreateTown,
    RenameTown,
    ChangeColor,
    UpdateBio,
    UpdateGreeting,
    UpdateFarewell,
    LevelUp,
    TransferOwnership,
    MemberJoin,
    MemberLeave,
    MemberEvicted,
    MemberPromoted,
    MemberDemoted,
    CreateClaim,
    DeleteClaim,
    DeleteAllClaims,
    AdminTakeOver,
    TownDataMigrated,
    DepositMoney,
    WithdrawMoney,
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Who performed the action; `None` for system-originated entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Action {
    /// A system action with no attributed user.
    pub fn of(kind: ActionKind) -> Self {
        Self {
            user: None,
            kind,
            details: None,
        }
    }

    /// An action attributed to a user.
    pub fn by(user: User, kind: ActionKind) -> Self {
        Self {
            user: Some(user),
            kind,
            details: None,
        }
    }

    /// Attaches free-form details (a new name, chunk coordinates, ...).
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A town's append-only, time-ordered audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Log {
    actions: BTreeMap<DateTime<Utc>, Action>,
}

impl Log {
    /// A log with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The log a freshly founded town starts with: exactly one founding
    /// entry, attributed to the creator, stamped now.
    pub fn new_town_log(creator: User) -> Self {
        let mut log = Self::empty();
        log.log(Action::by(creator, ActionKind::CreateTown));
        log
    }

    /// The log for town data imported from another system.
    ///
    /// Seeds a founding entry at the original founding instant so the
    /// town's age survives the migration, then records the migration
    /// itself at the current instant.
    pub fn migrated_log(founded: DateTime<Utc>) -> Self {
        let mut log = Self::empty();
        log.actions.insert(founded, Action::of(ActionKind::CreateTown));
        log.log(Action::of(ActionKind::TownDataMigrated));
        log
    }

    /// Appends an action at the current instant.
    pub fn log(&mut self, action: Action) {
        self.actions.insert(Utc::now(), action);
    }

    /// Entries in chronological order.
    pub fn actions(&self) -> impl Iterator<Item = (DateTime<Utc>, &Action)> {
        self.actions.iter().map(|(time, action)| (*time, action))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// When the town was founded: the timestamp of the first founding
    /// entry, or the current time when the log has none (a safe default
    /// for legacy data rather than an error).
    pub fn founded_time(&self) -> DateTime<Utc> {
        self.actions
            .iter()
            .find(|(_, action)| action.kind == ActionKind::CreateTown)
            .map(|(time, _)| *time)
            .unwrap_or_else(Utc::now)
    }
}
