//! Guarded town operations.
//!
//! Everything that mutates a town goes through here. The pattern is the
//! same everywhere: an authorization guard resolves the actor's
//! membership (refusing with exactly one localized message when it
//! fails), a synchronous editor mutates an owned copy of the aggregate,
//! and [`Manager::update_town_data`] persists, splices the replica cache
//! and broadcasts, in that order. The ordering is load-bearing: remote
//! handlers re-fetch from the store when the broadcast arrives, so the
//! store write must already be visible.

pub mod admin;
pub mod claims;
pub mod towns;

pub use admin::AdminManager;
pub use claims::ClaimsManager;
pub use towns::TownsManager;

use crate::context::Dominion;
use crate::hooks::OnlineUser;
use crate::locales::Locales;
use crate::network::{BrokerError, Message, MessageType, Payload};
use crate::store::StoreError;
use dominion_core::{Chunk, Member, Privilege, Role, Town, TownClaim, TownId, User, World};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Why a town operation did not go through.
///
/// Refusal variants map to exactly one locale key each; infrastructure
/// variants surface through `?` and localize to a generic failure line.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("actor is not in a town")]
    NotInTown,
    #[error("actor is already in a town")]
    AlreadyInTown,
    #[error("actor lacks the {0:?} privilege")]
    NoPrivilege(Privilege),
    #[error("actor is not the town mayor")]
    NotMayor,
    #[error("invalid town name {0:?}")]
    InvalidName(String),
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    #[error("town name {0:?} is taken")]
    NameTaken(String),
    #[error("no town named {0:?}")]
    TownNotFound(String),
    #[error("no user named {0:?}")]
    UserNotFound(String),
    #[error("{0} is not a member of the actor's town")]
    NotInYourTown(String),
    #[error("{0} holds an equal or higher role")]
    RoleTooHigh(String),
    #[error("the role of {0} cannot change further that way")]
    RoleLimit(String),
    #[error("the mayor cannot leave their town")]
    MayorCannotLeave,
    #[error("the town member limit is reached")]
    TownFull,
    #[error("the town claim limit is reached")]
    ClaimLimit,
    #[error("the town is at the level cap")]
    MaxLevel,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("the town balance cannot cover {0}")]
    InsufficientFunds(i64),
    #[error("chunk is not claimed")]
    ChunkNotClaimed,
    #[error("chunk is already claimed by {0}")]
    ChunkClaimed(String),
    #[error("claim belongs to another town")]
    ClaimNotYours,
    #[error("world {0:?} cannot be claimed in")]
    WorldNotClaimable(String),
    #[error("no pending town invite")]
    NoPendingInvite,
    #[error("{0} is already in a town")]
    InviteTargetInTown(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl OpError {
    fn locale(&self) -> (&'static str, Vec<String>) {
        match self {
            Self::NotInTown => ("error_not_in_town", vec![]),
            Self::AlreadyInTown => ("error_already_in_town", vec![]),
            Self::NoPrivilege(_) => ("error_no_privilege", vec![]),
            Self::NotMayor => ("error_not_mayor", vec![]),
            Self::InvalidName(_) => ("error_invalid_name", vec![]),
            Self::InvalidColor(_) => ("error_invalid_color", vec![]),
            Self::NameTaken(_) => ("error_name_taken", vec![]),
            Self::TownNotFound(name) => ("error_town_not_found", vec![name.clone()]),
            Self::UserNotFound(name) => ("error_user_not_found", vec![name.clone()]),
            Self::NotInYourTown(name) => ("error_not_in_your_town", vec![name.clone()]),
            Self::RoleTooHigh(_) => ("error_role_too_high", vec![]),
            Self::RoleLimit(_) => ("error_role_limit", vec![]),
            Self::MayorCannotLeave => ("error_mayor_cannot_leave", vec![]),
            Self::TownFull => ("error_town_full", vec![]),
            Self::ClaimLimit => ("error_claim_limit", vec![]),
            Self::MaxLevel => ("error_max_level", vec![]),
            Self::InvalidAmount => ("error_invalid_amount", vec![]),
            Self::InsufficientFunds(needed) => {
                ("error_insufficient_funds", vec![needed.to_string()])
            }
            Self::ChunkNotClaimed => ("error_chunk_not_claimed", vec![]),
            Self::ChunkClaimed(owner) => ("error_chunk_claimed", vec![owner.clone()]),
            Self::ClaimNotYours => ("error_claim_not_yours", vec![]),
            Self::WorldNotClaimable(world) => {
                ("error_world_not_claimable", vec![world.clone()])
            }
            Self::NoPendingInvite => ("error_no_invite", vec![]),
            Self::InviteTargetInTown(name) => {
                ("error_invite_target_in_town", vec![name.clone()])
            }
            Self::Store(_) | Self::Broker(_) => ("error_internal", vec![]),
        }
    }

    /// The player-facing text for this failure.
    pub fn localized(&self, locales: &Locales) -> String {
        let (key, args) = self.locale();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        locales.get_with(key, &args)
    }
}

/// Entry point to the operation layer; cheap to construct and clone.
#[derive(Clone)]
pub struct Manager {
    node: Arc<Dominion>,
}

impl Manager {
    pub fn new(node: Arc<Dominion>) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &Arc<Dominion> {
        &self.node
    }

    pub fn towns(&self) -> TownsManager {
        TownsManager::new(self.clone())
    }

    pub fn claims(&self) -> ClaimsManager {
        ClaimsManager::new(self.clone())
    }

    pub fn admin(&self) -> AdminManager {
        AdminManager::new(self.clone())
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    /// Delivers the refusal to the actor, once, and propagates it.
    pub(crate) async fn refuse<T>(
        &self,
        actor: &dyn OnlineUser,
        error: OpError,
    ) -> Result<T, OpError> {
        actor.send_message(&error.localized(self.node.locales()));
        debug!(actor = %actor.name(), %error, "refused town operation");
        Err(error)
    }

    /// The actor's membership, or a refusal when they are in no town.
    pub async fn require_member(&self, actor: &dyn OnlineUser) -> Result<Member, OpError> {
        match self.node.user_town(actor.user()).await {
            Some(member) => Ok(member),
            None => self.refuse(actor, OpError::NotInTown).await,
        }
    }

    /// Membership plus a privilege check against the member's role.
    pub async fn require_privilege(
        &self,
        actor: &dyn OnlineUser,
        privilege: Privilege,
    ) -> Result<Member, OpError> {
        let member = self.require_member(actor).await?;
        if member.has_privilege(privilege) {
            Ok(member)
        } else {
            self.refuse(actor, OpError::NoPrivilege(privilege)).await
        }
    }

    /// Membership, requiring the mayor seat.
    pub async fn require_mayor(&self, actor: &dyn OnlineUser) -> Result<Member, OpError> {
        let member = self.require_member(actor).await?;
        if member.role == Role::Mayor {
            Ok(member)
        } else {
            self.refuse(actor, OpError::NotMayor).await
        }
    }

    /// Membership plus ownership of the claim covering `chunk`.
    pub async fn require_claim_owner(
        &self,
        actor: &dyn OnlineUser,
        chunk: Chunk,
        world: &World,
    ) -> Result<(Member, TownClaim), OpError> {
        let member = self.require_member(actor).await?;
        let Some(town_claim) = self.node.claim_at(chunk, world).await else {
            return self.refuse(actor, OpError::ChunkNotClaimed).await;
        };
        if town_claim.town.id() != member.town {
            return self.refuse(actor, OpError::ClaimNotYours).await;
        }
        Ok((member, town_claim))
    }

    /// Resolves a username to a user, preferring the local session list
    /// and falling back to the store.
    pub(crate) async fn resolve_user(
        &self,
        actor: &dyn OnlineUser,
        name: &str,
    ) -> Result<User, OpError> {
        if let Some(online) = self.node.online_user_by_name(name).await {
            return Ok(online.user().clone());
        }
        match self.node.database().get_user(name).await? {
            Some(saved) => Ok(saved.user),
            None => self.refuse(actor, OpError::UserNotFound(name.to_string())).await,
        }
    }

    // ------------------------------------------------------------------
    // The mutation choke point
    // ------------------------------------------------------------------

    /// Persists a town, splices it into the replica cache, and broadcasts
    /// the update to the cluster, strictly in that order.
    ///
    /// Without a connected broker the change stays local, which is the
    /// single-server degradation of a disabled or failed transport.
    pub async fn update_town_data(
        &self,
        actor: &dyn OnlineUser,
        town: Town,
    ) -> Result<Town, OpError> {
        self.node.database().upsert_town(&town).await?;
        self.node.update_cached_town(town.clone()).await;
        if let Some(broker) = self.node.broker().await {
            Message::builder(MessageType::TownUpdate)
                .payload(Payload::integer(town.id().0))
                .target_all()
                .build()
                .send(broker.as_ref(), actor)
                .await?;
        } else {
            debug!(town = %town.id(), "no broker connected; town update stays local");
        }
        Ok(town)
    }

    /// Sends one broker message, quietly doing nothing when cross-server
    /// sync is off.
    pub(crate) async fn broadcast(
        &self,
        actor: &dyn OnlineUser,
        message: Message,
    ) -> Result<(), OpError> {
        if let Some(broker) = self.node.broker().await {
            message.send(broker.as_ref(), actor).await?;
        }
        Ok(())
    }

    /// One localized line to every town member online on this server
    /// whose preferences allow town notifications.
    pub async fn send_town_notification(&self, town: &Town, key: &str, args: &[&str]) {
        for (uuid, _) in town.members() {
            if let Some(user) = self.node.online_user(uuid).await {
                if self.node.user_preferences(uuid).await.town_notifications {
                    user.send_message(&self.node.locales().get_with(key, args));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Edit flows
    // ------------------------------------------------------------------

    /// Applies a synchronous editor to a cached town and runs the
    /// persist/cache/broadcast sequence on the result.
    pub async fn edit_town(
        &self,
        actor: &dyn OnlineUser,
        town_id: TownId,
        editor: impl FnOnce(&mut Town) + Send,
    ) -> Result<Town, OpError> {
        let Some(mut town) = self.node.town(town_id).await else {
            return self
                .refuse(actor, OpError::TownNotFound(town_id.to_string()))
                .await;
        };
        editor(&mut town);
        self.update_town_data(actor, town).await
    }

    /// [`edit_town`](Self::edit_town) on the actor's own town, gated on a
    /// privilege. The editor does not run when the gate refuses.
    pub async fn member_edit_town(
        &self,
        actor: &dyn OnlineUser,
        privilege: Privilege,
        editor: impl FnOnce(&mut Town) + Send,
    ) -> Result<Town, OpError> {
        let member = self.require_privilege(actor, privilege).await?;
        self.edit_town(actor, member.town, editor).await
    }

    /// [`edit_town`](Self::edit_town) on the actor's own town, gated on
    /// the mayor seat. The editor does not run when the gate refuses.
    pub async fn mayor_edit_town(
        &self,
        actor: &dyn OnlineUser,
        editor: impl FnOnce(&mut Town) + Send,
    ) -> Result<Town, OpError> {
        let member = self.require_mayor(actor).await?;
        self.edit_town(actor, member.town, editor).await
    }

    // ------------------------------------------------------------------
    // Deletion cascade (shared by the mayor and admin paths)
    // ------------------------------------------------------------------

    /// Removes a town everywhere: claims first (persisting every world
    /// that changed), then markers, members' notice, the store row, the
    /// replica entry, and finally the deletion broadcast.
    pub(crate) async fn delete_town_cascade(
        &self,
        actor: &dyn OnlineUser,
        town: &Town,
    ) -> Result<(), OpError> {
        let removed = self.node.purge_town_claims(town.id()).await?;
        if let Some(hook) = self.node.map_hook().await {
            hook.remove_town_markers(town);
        }
        self.send_town_notification(town, "town_deleted", &[town.name()]).await;
        self.node.database().delete_town(town.id()).await?;
        self.node.remove_cached_town(town.id()).await;
        self.broadcast(
            actor,
            Message::builder(MessageType::TownDelete)
                .payload(Payload::integer(town.id().0))
                .target_all()
                .build(),
        )
        .await?;
        info!(
            town = %town.id(),
            name = %town.name(),
            claims = removed,
            "deleted town"
        );
        Ok(())
    }
}
