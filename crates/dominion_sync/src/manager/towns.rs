//! Town lifecycle, membership, economy and chat operations.
//!
//! Every public method here follows the same arc: authorize, validate,
//! mutate an owned copy of the town, run it through
//! [`Manager::update_town_data`], then deliver notifications. Secondary
//! broadcasts (renames, level-ups, invites) ride behind the town update
//! so remote replicas are already fresh when the notification lands.

use super::{Manager, OpError};
use crate::context::Dominion;
use crate::hooks::OnlineUser;
use crate::network::{personal_notice, Invite, Message, MessageType, Payload, TargetType};
use dominion_core::{Action, ActionKind, Privilege, Role, Town, TownId, User};
use std::sync::Arc;
use tracing::{debug, info};

/// `\w{1,16}`, the shape every town name must have.
fn valid_town_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 16
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Operations on towns and their membership rosters.
pub struct TownsManager {
    manager: Manager,
}

impl TownsManager {
    pub(super) fn new(manager: Manager) -> Self {
        Self { manager }
    }

    fn node(&self) -> &Arc<Dominion> {
        self.manager.node()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Founds a town with the actor as its mayor.
    pub async fn create_town(
        &self,
        actor: &dyn OnlineUser,
        name: &str,
    ) -> Result<Town, OpError> {
        if self.node().user_town(actor.user()).await.is_some() {
            return self.manager.refuse(actor, OpError::AlreadyInTown).await;
        }
        if !valid_town_name(name) {
            return self
                .manager
                .refuse(actor, OpError::InvalidName(name.to_string()))
                .await;
        }
        if self.node().town_by_name(name).await.is_some() {
            return self
                .manager
                .refuse(actor, OpError::NameTaken(name.to_string()))
                .await;
        }
        let town = self
            .node()
            .database()
            .create_town(name, actor.user())
            .await?;
        let town = self.manager.update_town_data(actor, town).await?;
        actor.send_message(&self.node().locales().get_with("town_created", &[town.name()]));
        info!(town = %town.id(), name = %town.name(), mayor = %actor.name(), "founded town");
        Ok(town)
    }

    /// Deletes the actor's town, claims and all.
    pub async fn delete_town(&self, actor: &dyn OnlineUser) -> Result<(), OpError> {
        let member = self.manager.require_mayor(actor).await?;
        let Some(town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        self.manager.delete_town_cascade(actor, &town).await
    }

    /// Renames the actor's town.
    pub async fn rename_town(
        &self,
        actor: &dyn OnlineUser,
        new_name: &str,
    ) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Rename)
            .await?;
        if !valid_town_name(new_name) {
            return self
                .manager
                .refuse(actor, OpError::InvalidName(new_name.to_string()))
                .await;
        }
        if let Some(existing) = self.node().town_by_name(new_name).await {
            // Recasing your own town's name is fine.
            if existing.id() != member.town {
                return self
                    .manager
                    .refuse(actor, OpError::NameTaken(new_name.to_string()))
                    .await;
            }
        }
        let actor_user = actor.user().clone();
        let name = new_name.to_string();
        let town = self
            .manager
            .edit_town(actor, member.town, move |town| {
                town.set_name(name.clone());
                town.record(Action::by(actor_user, ActionKind::RenameTown).details(name));
            })
            .await?;
        self.manager
            .broadcast(
                actor,
                Message::builder(MessageType::TownRenamed)
                    .payload(Payload::integer(town.id().0))
                    .target_all()
                    .build(),
            )
            .await?;
        self.manager
            .send_town_notification(&town, "town_renamed", &[town.name()])
            .await;
        info!(town = %town.id(), name = %town.name(), "renamed town");
        Ok(town)
    }

    // ------------------------------------------------------------------
    // Cosmetics
    // ------------------------------------------------------------------

    pub async fn set_bio(&self, actor: &dyn OnlineUser, bio: &str) -> Result<Town, OpError> {
        let actor_user = actor.user().clone();
        let text = bio.to_string();
        let town = self
            .manager
            .member_edit_town(actor, Privilege::Rename, move |town| {
                town.set_bio(text.clone());
                town.record(Action::by(actor_user, ActionKind::UpdateBio).details(text));
            })
            .await?;
        actor.send_message(&self.node().locales().get("bio_updated"));
        Ok(town)
    }

    pub async fn set_greeting(
        &self,
        actor: &dyn OnlineUser,
        greeting: &str,
    ) -> Result<Town, OpError> {
        let actor_user = actor.user().clone();
        let text = greeting.to_string();
        let town = self
            .manager
            .member_edit_town(actor, Privilege::Rename, move |town| {
                town.set_greeting(text.clone());
                town.record(Action::by(actor_user, ActionKind::UpdateGreeting).details(text));
            })
            .await?;
        actor.send_message(&self.node().locales().get("greeting_updated"));
        Ok(town)
    }

    pub async fn set_farewell(
        &self,
        actor: &dyn OnlineUser,
        farewell: &str,
    ) -> Result<Town, OpError> {
        let actor_user = actor.user().clone();
        let text = farewell.to_string();
        let town = self
            .manager
            .member_edit_town(actor, Privilege::Rename, move |town| {
                town.set_farewell(text.clone());
                town.record(Action::by(actor_user, ActionKind::UpdateFarewell).details(text));
            })
            .await?;
        actor.send_message(&self.node().locales().get("farewell_updated"));
        Ok(town)
    }

    /// Sets the town's display color, `#rrggbb`.
    pub async fn set_color(&self, actor: &dyn OnlineUser, color: &str) -> Result<Town, OpError> {
        if !valid_color(color) {
            return self
                .manager
                .refuse(actor, OpError::InvalidColor(color.to_string()))
                .await;
        }
        let actor_user = actor.user().clone();
        let value = color.to_string();
        let town = self
            .manager
            .member_edit_town(actor, Privilege::Rename, move |town| {
                town.set_color(value.clone());
                town.record(Action::by(actor_user, ActionKind::ChangeColor).details(value));
            })
            .await?;
        actor.send_message(&self.node().locales().get_with("color_updated", &[color]));
        Ok(town)
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    /// Pays into the town coffers. Any member may deposit.
    pub async fn deposit(&self, actor: &dyn OnlineUser, amount: i64) -> Result<Town, OpError> {
        let member = self.manager.require_member(actor).await?;
        if amount <= 0 {
            return self.manager.refuse(actor, OpError::InvalidAmount).await;
        }
        let actor_user = actor.user().clone();
        let town = self
            .manager
            .edit_town(actor, member.town, move |town| {
                town.deposit(amount);
                town.record(
                    Action::by(actor_user, ActionKind::DepositMoney).details(amount.to_string()),
                );
            })
            .await?;
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("deposit_made", &[&amount.to_string()]),
        );
        Ok(town)
    }

    /// Takes from the town coffers, refusing to overdraw.
    pub async fn withdraw(&self, actor: &dyn OnlineUser, amount: i64) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Withdraw)
            .await?;
        if amount <= 0 {
            return self.manager.refuse(actor, OpError::InvalidAmount).await;
        }
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        if town.withdraw(amount).is_err() {
            return self
                .manager
                .refuse(actor, OpError::InsufficientFunds(amount))
                .await;
        }
        town.record(
            Action::by(actor.user().clone(), ActionKind::WithdrawMoney)
                .details(amount.to_string()),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("withdrawal_made", &[&amount.to_string()]),
        );
        Ok(town)
    }

    /// Spends town money to raise the town level, unlocking more claims
    /// and member slots.
    pub async fn level_up(&self, actor: &dyn OnlineUser) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::LevelUp)
            .await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        let levels = &self.node().settings().levels;
        if town.level() >= levels.max_level {
            return self.manager.refuse(actor, OpError::MaxLevel).await;
        }
        let cost = levels.cost(town.level() + 1);
        if town.withdraw(cost).is_err() {
            return self
                .manager
                .refuse(actor, OpError::InsufficientFunds(cost))
                .await;
        }
        town.set_level(town.level() + 1);
        town.record(
            Action::by(actor.user().clone(), ActionKind::LevelUp)
                .details(format!("level {}", town.level())),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .broadcast(
                actor,
                Message::builder(MessageType::TownLevelUp)
                    .payload(Payload::integer(town.id().0))
                    .target_all()
                    .build(),
            )
            .await?;
        self.manager
            .send_town_notification(
                &town,
                "town_level_up",
                &[town.name(), &town.level().to_string()],
            )
            .await;
        info!(town = %town.id(), level = town.level(), "town leveled up");
        Ok(town)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Hands the mayor seat to another member; the actor steps down to
    /// trustee.
    pub async fn transfer_ownership(
        &self,
        actor: &dyn OnlineUser,
        target_name: &str,
    ) -> Result<Town, OpError> {
        let member = self.manager.require_mayor(actor).await?;
        let target = self.manager.resolve_user(actor, target_name).await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        if town.transfer_ownership(target.uuid).is_err() {
            return self
                .manager
                .refuse(actor, OpError::NotInYourTown(target.name.clone()))
                .await;
        }
        town.record(
            Action::by(actor.user().clone(), ActionKind::TransferOwnership)
                .details(target.name.clone()),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .broadcast(
                actor,
                Message::builder(MessageType::TownTransferred)
                    .payload(Payload::integer(town.id().0))
                    .target_all()
                    .build(),
            )
            .await?;
        self.manager
            .send_town_notification(&town, "town_transferred", &[actor.name(), town.name()])
            .await;
        info!(town = %town.id(), new_mayor = %target.name, "transferred town ownership");
        Ok(town)
    }

    /// Invites a player to the actor's town.
    ///
    /// A target on this server gets the invite directly; one elsewhere in
    /// the cluster gets it as a player-directed message, handled by
    /// whichever server hosts them.
    pub async fn invite_member(
        &self,
        actor: &dyn OnlineUser,
        target_name: &str,
    ) -> Result<(), OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Invite)
            .await?;
        let Some(town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        if town.member_count() as u32 >= town.max_members() {
            return self.manager.refuse(actor, OpError::TownFull).await;
        }
        let target = self.manager.resolve_user(actor, target_name).await?;
        if self.node().user_town(&target).await.is_some() {
            return self
                .manager
                .refuse(actor, OpError::InviteTargetInTown(target.name))
                .await;
        }
        let invite = Invite::new(town.id(), actor.user().clone());
        if let Some(local) = self.node().online_user(target.uuid).await {
            self.handle_inbound_invite(local, invite).await;
        } else if self.node().broker().await.is_some() {
            self.manager
                .broadcast(
                    actor,
                    Message::builder(MessageType::TownInviteRequest)
                        .payload(Payload::invite(invite))
                        .target(target.name.clone(), TargetType::Player)
                        .build(),
                )
                .await?;
        } else {
            // Standalone node and the target is not here.
            return self
                .manager
                .refuse(actor, OpError::UserNotFound(target.name))
                .await;
        }
        actor.send_message(&self.node().locales().get_with("invite_sent", &[&target.name]));
        info!(town = %town.id(), target = %target.name, "sent town invite");
        Ok(())
    }

    /// Delivers and parks an invite for a player on this server. Shared
    /// by the local invite path and the cross-server request handler.
    pub(crate) async fn handle_inbound_invite(
        &self,
        receiver: Arc<dyn OnlineUser>,
        invite: Invite,
    ) {
        let town_name = match self.node().town(invite.town).await {
            Some(town) => town.name().to_string(),
            None => format!("town {}", invite.town),
        };
        receiver.send_message(
            &self
                .node()
                .locales()
                .get_with("invite_received", &[&invite.sender.name, &town_name]),
        );
        debug!(target = %receiver.name(), town = %invite.town, "parked town invite");
        self.node().add_invite(receiver.uuid(), invite).await;
    }

    /// Accepts the actor's pending invite and joins them as a resident.
    pub async fn accept_invite(&self, actor: &dyn OnlineUser) -> Result<Town, OpError> {
        if self.node().user_town(actor.user()).await.is_some() {
            return self.manager.refuse(actor, OpError::AlreadyInTown).await;
        }
        let Some(invite) = self.node().take_invite(actor.uuid()).await else {
            return self.manager.refuse(actor, OpError::NoPendingInvite).await;
        };
        let Some(mut town) = self.node().town(invite.town).await else {
            // The town went away while the invite sat unanswered.
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(invite.town.to_string()))
                .await;
        };
        if town.member_count() as u32 >= town.max_members() {
            return self.manager.refuse(actor, OpError::TownFull).await;
        }
        town.add_member(actor.uuid(), Role::Resident);
        town.record(Action::by(actor.user().clone(), ActionKind::MemberJoin));
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .send_town_notification(&town, "town_member_joined", &[actor.name()])
            .await;
        self.manager
            .broadcast(
                actor,
                Message::builder(MessageType::TownInviteReply)
                    .payload(Payload::bool(true))
                    .target(invite.sender.name.clone(), TargetType::Player)
                    .build(),
            )
            .await?;
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("invite_accepted", &[town.name()]),
        );
        info!(town = %town.id(), member = %actor.name(), "invite accepted");
        Ok(town)
    }

    /// Declines the actor's pending invite, telling the inviter.
    pub async fn decline_invite(&self, actor: &dyn OnlineUser) -> Result<(), OpError> {
        let Some(invite) = self.node().take_invite(actor.uuid()).await else {
            return self.manager.refuse(actor, OpError::NoPendingInvite).await;
        };
        if let Some(sender) = self.node().online_user(invite.sender.uuid).await {
            sender.send_message(
                &self
                    .node()
                    .locales()
                    .get_with("invite_declined_by", &[actor.name()]),
            );
        } else {
            self.manager
                .broadcast(
                    actor,
                    Message::builder(MessageType::TownInviteReply)
                        .payload(Payload::bool(false))
                        .target(invite.sender.name.clone(), TargetType::Player)
                        .build(),
                )
                .await?;
        }
        actor.send_message(&self.node().locales().get("invite_declined"));
        Ok(())
    }

    /// Leaves the actor's town. The mayor must transfer or delete first.
    pub async fn leave_town(&self, actor: &dyn OnlineUser) -> Result<(), OpError> {
        let member = self.manager.require_member(actor).await?;
        if member.role == Role::Mayor {
            return self.manager.refuse(actor, OpError::MayorCannotLeave).await;
        }
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        town.remove_member(actor.uuid());
        town.record(Action::by(actor.user().clone(), ActionKind::MemberLeave));
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .send_town_notification(&town, "member_left", &[actor.name()])
            .await;
        actor.send_message(&self.node().locales().get_with("town_left", &[town.name()]));
        info!(town = %town.id(), member = %actor.name(), "member left town");
        Ok(())
    }

    /// Evicts a lower-ranked member from the actor's town.
    pub async fn evict(&self, actor: &dyn OnlineUser, target_name: &str) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Evict)
            .await?;
        let target = self.manager.resolve_user(actor, target_name).await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        let Some(target_role) = town.role_of(target.uuid) else {
            return self
                .manager
                .refuse(actor, OpError::NotInYourTown(target.name.clone()))
                .await;
        };
        if target_role.weight() >= member.role.weight() {
            return self
                .manager
                .refuse(actor, OpError::RoleTooHigh(target.name.clone()))
                .await;
        }
        town.remove_member(target.uuid);
        town.record(
            Action::by(actor.user().clone(), ActionKind::MemberEvicted)
                .details(target.name.clone()),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .send_town_notification(&town, "member_evicted", &[&target.name])
            .await;
        self.notify_member(actor, &target, MessageType::TownEvicted, town.id())
            .await?;
        info!(town = %town.id(), target = %target.name, "evicted member");
        Ok(town)
    }

    /// Moves a lower-ranked member one step up the role ladder.
    pub async fn promote(
        &self,
        actor: &dyn OnlineUser,
        target_name: &str,
    ) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Promote)
            .await?;
        let target = self.manager.resolve_user(actor, target_name).await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        let Some(current) = town.role_of(target.uuid) else {
            return self
                .manager
                .refuse(actor, OpError::NotInYourTown(target.name.clone()))
                .await;
        };
        if current.weight() >= member.role.weight() {
            return self
                .manager
                .refuse(actor, OpError::RoleTooHigh(target.name.clone()))
                .await;
        }
        let Some(next) = current.promoted() else {
            return self
                .manager
                .refuse(actor, OpError::RoleLimit(target.name.clone()))
                .await;
        };
        town.add_member(target.uuid, next);
        town.record(
            Action::by(actor.user().clone(), ActionKind::MemberPromoted)
                .details(format!("{} to {next}", target.name)),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .send_town_notification(
                &town,
                "member_promoted",
                &[&target.name, &next.to_string()],
            )
            .await;
        self.notify_member(actor, &target, MessageType::TownPromoted, town.id())
            .await?;
        info!(town = %town.id(), target = %target.name, role = %next, "promoted member");
        Ok(town)
    }

    /// Moves a lower-ranked member one step down the role ladder.
    pub async fn demote(
        &self,
        actor: &dyn OnlineUser,
        target_name: &str,
    ) -> Result<Town, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Demote)
            .await?;
        let target = self.manager.resolve_user(actor, target_name).await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        let Some(current) = town.role_of(target.uuid) else {
            return self
                .manager
                .refuse(actor, OpError::NotInYourTown(target.name.clone()))
                .await;
        };
        if current.weight() >= member.role.weight() {
            return self
                .manager
                .refuse(actor, OpError::RoleTooHigh(target.name.clone()))
                .await;
        }
        let Some(next) = current.demoted() else {
            return self
                .manager
                .refuse(actor, OpError::RoleLimit(target.name.clone()))
                .await;
        };
        town.add_member(target.uuid, next);
        town.record(
            Action::by(actor.user().clone(), ActionKind::MemberDemoted)
                .details(format!("{} to {next}", target.name)),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        self.manager
            .send_town_notification(
                &town,
                "member_demoted",
                &[&target.name, &next.to_string()],
            )
            .await;
        self.notify_member(actor, &target, MessageType::TownDemoted, town.id())
            .await?;
        info!(town = %town.id(), target = %target.name, role = %next, "demoted member");
        Ok(town)
    }

    /// Tells a member what just happened to them: directly when they are
    /// on this server, as a player-directed message otherwise.
    ///
    /// Must run after the town update so role lookups see the new roster.
    async fn notify_member(
        &self,
        actor: &dyn OnlineUser,
        target: &User,
        kind: MessageType,
        town: TownId,
    ) -> Result<(), OpError> {
        if let Some(local) = self.node().online_user(target.uuid).await {
            if let Some(text) = personal_notice(self.node(), kind, town, local.as_ref()).await {
                local.send_message(&text);
            }
            return Ok(());
        }
        self.manager
            .broadcast(
                actor,
                Message::builder(kind)
                    .payload(Payload::integer(town.0))
                    .target(target.name.clone(), TargetType::Player)
                    .build(),
            )
            .await
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    /// Says something in town chat, here and on every other server.
    pub async fn send_chat_message(
        &self,
        actor: &dyn OnlineUser,
        text: &str,
    ) -> Result<(), OpError> {
        let member = self.manager.require_privilege(actor, Privilege::Chat).await?;
        let Some(town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        self.relay_chat(&town, actor.name(), text).await;
        self.manager
            .broadcast(
                actor,
                Message::builder(MessageType::TownChatMessage)
                    .payload(Payload::string(text))
                    .target_all()
                    .build(),
            )
            .await?;
        Ok(())
    }

    /// Delivers one town chat line to the town's members on this server.
    pub(crate) async fn relay_chat(&self, town: &Town, sender_name: &str, text: &str) {
        let line = self
            .node()
            .locales()
            .get_with("town_chat_format", &[town.name(), sender_name, text]);
        for (uuid, _) in town.members() {
            if let Some(user) = self.node().online_user(uuid).await {
                user.send_message(&line);
            }
        }
    }
}
