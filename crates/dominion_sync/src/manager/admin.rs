//! Cluster administrator operations.
//!
//! These bypass the membership gates: an administrator acts on any town
//! by name without being a member of it. Embeddings decide who gets to
//! call them; nothing here checks an operator permission.

use super::{Manager, OpError};
use crate::context::Dominion;
use crate::hooks::OnlineUser;
use crate::network::{Message, MessageType, Payload};
use dominion_core::{Action, ActionKind, Role, Town};
use std::sync::Arc;
use tracing::info;

/// Administrative town operations.
pub struct AdminManager {
    manager: Manager,
}

impl AdminManager {
    pub(super) fn new(manager: Manager) -> Self {
        Self { manager }
    }

    fn node(&self) -> &Arc<Dominion> {
        self.manager.node()
    }

    /// Deletes any town by name, claims and all.
    pub async fn delete_town(
        &self,
        actor: &dyn OnlineUser,
        town_name: &str,
    ) -> Result<(), OpError> {
        let Some(town) = self.node().town_by_name(town_name).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(town_name.to_string()))
                .await;
        };
        self.manager.delete_town_cascade(actor, &town).await?;
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("admin_town_deleted", &[town.name()]),
        );
        info!(
            town = %town.id(),
            name = %town.name(),
            admin = %actor.name(),
            "admin deleted town"
        );
        Ok(())
    }

    /// Seats the actor as mayor of any town; the sitting mayor steps down
    /// to trustee. The actor must not already be in a town.
    pub async fn take_over_town(
        &self,
        actor: &dyn OnlineUser,
        town_name: &str,
    ) -> Result<Town, OpError> {
        if self.node().user_town(actor.user()).await.is_some() {
            return self.manager.refuse(actor, OpError::AlreadyInTown).await;
        }
        let Some(mut town) = self.node().town_by_name(town_name).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(town_name.to_string()))
                .await;
        };
        if let Some(old_mayor) = town.mayor() {
            town.add_member(old_mayor, Role::Trustee);
        }
        town.add_member(actor.uuid(), Role::Mayor);
        town.record(Action::by(actor.user().clone(), ActionKind::AdminTakeOver));
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
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("admin_town_taken_over", &[town.name()]),
        );
        info!(town = %town.id(), admin = %actor.name(), "admin took over town");
        Ok(town)
    }
}
