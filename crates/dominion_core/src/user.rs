//! User identity and stored per-user preferences.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player identity: stable uuid plus the last username seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub name: String,
}

impl User {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Per-user toggles the sync layer consults before delivering messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Receive town notifications (join/leave, renames, level-ups).
    pub town_notifications: bool,
    /// Route chat into town chat instead of global chat.
    pub town_chat_talking: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            town_notifications: true,
            town_chat_talking: false,
        }
    }
}

/// A user as the backing store returns them for offline lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedUser {
    pub user: User,
    #[serde(default)]
    pub preferences: Preferences,
}

impl SavedUser {
    pub fn new(user: User) -> Self {
        Self {
            user,
            preferences: Preferences::default(),
        }
    }
}
