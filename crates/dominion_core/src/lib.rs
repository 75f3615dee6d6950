//! # Dominion Core
//!
//! Data model for the Dominion cross-server town synchronization system:
//! towns and their member rosters, chunk-grid claims grouped per world,
//! append-only audit logs, and user identities.
//!
//! Everything in this crate is plain owned data with invariant-preserving
//! operations. There is no I/O and no async here; the sync layer
//! (`dominion_sync`) owns locking, persistence and broadcasting, and moves
//! these values between servers.
//!
//! ## Key invariants
//!
//! - A chunk holds at most one claim per world ([`ClaimWorld::add_claim`]).
//! - A town's founding time is the first founding entry of its audit log,
//!   and survives data migration ([`Log::migrated_log`]).
//! - The mayor seat changes hands only through an ownership transfer
//!   ([`Town::transfer_ownership`]); promotion stops at trustee.

pub mod audit;
pub mod claim;
pub mod town;
pub mod user;

pub use audit::{Action, ActionKind, Log};
pub use claim::{
    Chunk, Claim, ClaimError, ClaimKind, ClaimWorld, Position, TownClaim, World,
};
pub use town::{Member, Privilege, Role, Town, TownError, TownId};
pub use user::{Preferences, SavedUser, User};
