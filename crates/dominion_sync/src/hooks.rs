//! Seams toward the embedding game server.
//!
//! The sync layer never talks to a game engine or a web map directly; it
//! goes through these traits. Implementations live with the embedding and
//! are expected to queue or schedule their own work, which is why the
//! methods here are synchronous and fire-and-forget.

use dominion_core::{Position, Town, TownClaim, User, World};
use uuid::Uuid;

/// A player currently connected to this server.
pub trait OnlineUser: Send + Sync {
    fn user(&self) -> &User;

    fn uuid(&self) -> Uuid {
        self.user().uuid
    }

    fn name(&self) -> &str {
        &self.user().name
    }

    /// Where the player is standing.
    fn position(&self) -> Position;

    /// Delivers a chat line. Implementations queue onto their own
    /// scheduler; failures stay on their side.
    fn send_message(&self, text: &str);

    /// Asks the proxy to move this player to another server. The transfer
    /// rides the player's own connection, so there is nothing to await and
    /// no acknowledgement; the proxy owns the outcome.
    fn connect_to(&self, server: &str);
}

/// Best-effort claim rendering on a web map.
///
/// Implementations swallow their own errors; town operations never fail
/// because a map did.
pub trait MapHook: Send + Sync {
    fn set_claim_marker(&self, claim: &TownClaim, world: &World);

    fn remove_claim_marker(&self, claim: &TownClaim, world: &World);

    /// Drops every marker the town has, across all worlds.
    fn remove_town_markers(&self, town: &Town);

    fn clear_all_markers(&self);
}
