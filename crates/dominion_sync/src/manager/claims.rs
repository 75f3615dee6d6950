//! Chunk claim operations.
//!
//! Claims live in per-world registries; the owning town's `claim_count`
//! is denormalized onto the town so budget checks and remote renderers
//! never need the registries. Both sides persist on every change, claims
//! first, so a failure in between leaves a town that under-counts rather
//! than claims nobody owns.

use super::{Manager, OpError};
use crate::context::Dominion;
use crate::hooks::OnlineUser;
use dominion_core::{Action, ActionKind, Claim, Position, Privilege, TownClaim};
use std::sync::Arc;
use tracing::info;

/// Operations on town claims.
pub struct ClaimsManager {
    manager: Manager,
}

impl ClaimsManager {
    pub(super) fn new(manager: Manager) -> Self {
        Self { manager }
    }

    fn node(&self) -> &Arc<Dominion> {
        self.manager.node()
    }

    /// Claims the chunk at `position` for the actor's town.
    pub async fn create_claim(
        &self,
        actor: &dyn OnlineUser,
        position: &Position,
    ) -> Result<TownClaim, OpError> {
        let member = self
            .manager
            .require_privilege(actor, Privilege::Claim)
            .await?;
        let world = &position.world;
        if !self.node().is_world_registered(world).await {
            return self
                .manager
                .refuse(actor, OpError::WorldNotClaimable(world.name.clone()))
                .await;
        }
        let chunk = position.chunk();
        if let Some(existing) = self.node().claim_at(chunk, world).await {
            return self
                .manager
                .refuse(actor, OpError::ChunkClaimed(existing.town.name().to_string()))
                .await;
        }
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        if town.claim_count() >= town.max_claims() {
            return self.manager.refuse(actor, OpError::ClaimLimit).await;
        }
        // The first claim in a world creates its registry.
        let mut registry = match self.node().claim_world(world).await {
            Some(registry) => registry,
            None => self.node().database().create_claim_world(world).await?,
        };
        let claim = Claim::at(chunk);
        if registry.add_claim(town.id(), claim.clone()).is_err() {
            // Another claim slipped in between the lookup and here.
            return self
                .manager
                .refuse(actor, OpError::ChunkClaimed("another town".to_string()))
                .await;
        }
        self.node()
            .database()
            .upsert_claim_world(world, &registry)
            .await?;
        self.node().update_claim_world(world.clone(), registry).await;
        town.set_claim_count(town.claim_count() + 1);
        town.record(
            Action::by(actor.user().clone(), ActionKind::CreateClaim).details(chunk.to_string()),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        let town_claim = TownClaim::new(town, claim);
        if let Some(hook) = self.node().map_hook().await {
            hook.set_claim_marker(&town_claim, world);
        }
        actor.send_message(&self.node().locales().get_with(
            "claim_created",
            &[&chunk.to_string(), town_claim.town.name()],
        ));
        info!(
            town = %town_claim.town.id(),
            chunk = %chunk,
            world = %world.name,
            "created claim"
        );
        Ok(town_claim)
    }

    /// Removes the claim covering `position`, which must belong to the
    /// actor's town.
    pub async fn delete_claim(
        &self,
        actor: &dyn OnlineUser,
        position: &Position,
    ) -> Result<(), OpError> {
        self.manager
            .require_privilege(actor, Privilege::Unclaim)
            .await?;
        let world = &position.world;
        let chunk = position.chunk();
        let (member, town_claim) = self
            .manager
            .require_claim_owner(actor, chunk, world)
            .await?;
        let Some(mut registry) = self.node().claim_world(world).await else {
            return self.manager.refuse(actor, OpError::ChunkNotClaimed).await;
        };
        registry.remove_claim(member.town, chunk);
        self.node()
            .database()
            .upsert_claim_world(world, &registry)
            .await?;
        self.node().update_claim_world(world.clone(), registry).await;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        town.set_claim_count(town.claim_count().saturating_sub(1));
        town.record(
            Action::by(actor.user().clone(), ActionKind::DeleteClaim).details(chunk.to_string()),
        );
        self.manager.update_town_data(actor, town).await?;
        if let Some(hook) = self.node().map_hook().await {
            hook.remove_claim_marker(&town_claim, world);
        }
        actor.send_message(
            &self
                .node()
                .locales()
                .get_with("claim_deleted", &[&chunk.to_string()]),
        );
        info!(town = %member.town, chunk = %chunk, world = %world.name, "deleted claim");
        Ok(())
    }

    /// Removes every claim of the actor's town, across all cached worlds.
    pub async fn delete_all_claims(&self, actor: &dyn OnlineUser) -> Result<usize, OpError> {
        let member = self.manager.require_mayor(actor).await?;
        let Some(mut town) = self.node().town(member.town).await else {
            return self
                .manager
                .refuse(actor, OpError::TownNotFound(member.town.to_string()))
                .await;
        };
        let removed = self.node().purge_town_claims(town.id()).await?;
        if let Some(hook) = self.node().map_hook().await {
            hook.remove_town_markers(&town);
        }
        town.set_claim_count(0);
        town.record(
            Action::by(actor.user().clone(), ActionKind::DeleteAllClaims)
                .details(removed.to_string()),
        );
        let town = self.manager.update_town_data(actor, town).await?;
        actor.send_message(&self.node().locales().get_with(
            "claims_deleted_all",
            &[&removed.to_string(), town.name()],
        ));
        info!(town = %town.id(), removed, "deleted all town claims");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Database, MemoryDatabase};
    use crate::testing::{test_node, RecordingBroker, RecordingMapHook, TestUser};
    use crate::network::MessageType;
    use dominion_core::{Role, SavedUser, TownId, World};

    struct Fixture {
        node: Arc<Dominion>,
        db: Arc<MemoryDatabase>,
        broker: Arc<RecordingBroker>,
        hook: Arc<RecordingMapHook>,
        mayor: Arc<TestUser>,
        resident: Arc<TestUser>,
    }

    impl Fixture {
        fn claims(&self) -> ClaimsManager {
            self.node.manager().claims()
        }

        async fn cached_town(&self) -> dominion_core::Town {
            self.node.town(TownId(1)).await.unwrap()
        }
    }

    fn in_chunk(x: i32, z: i32) -> Position {
        Position::at(
            f64::from(x * 16) + 4.0,
            64.0,
            f64::from(z * 16) + 4.0,
            World::named("world"),
        )
    }

    /// One town with mayor Wil and resident Toby, hosting the "world"
    /// world, no claims yet.
    async fn fixture() -> Fixture {
        let (node, db) = test_node("alpha");
        let mayor = TestUser::new("Wil");
        let resident = TestUser::new("Toby");
        let mut town = db.create_town("Rathaus", mayor.user()).await.unwrap();
        town.add_member(resident.uuid(), Role::Resident);
        db.upsert_town(&town).await.unwrap();
        db.add_user(SavedUser::new(mayor.user().clone())).await;
        db.add_user(SavedUser::new(resident.user().clone())).await;
        node.load_data(vec![World::named("world")]).await.unwrap();
        node.register_user(mayor.clone()).await;
        node.register_user(resident.clone()).await;
        let broker = RecordingBroker::new(node.clone());
        node.connect_broker(broker.clone()).await.unwrap();
        let hook = Arc::new(RecordingMapHook::default());
        node.attach_map_hook(hook.clone()).await;
        Fixture {
            node,
            db,
            broker,
            hook,
            mayor,
            resident,
        }
    }

    #[tokio::test]
    async fn first_claim_creates_the_registry_and_marks_the_map() {
        let f = fixture().await;
        assert!(f.node.claim_world(&World::named("world")).await.is_none());

        let town_claim = f
            .claims()
            .create_claim(f.mayor.as_ref(), &in_chunk(0, 0))
            .await
            .unwrap();

        assert_eq!(town_claim.claim.chunk, dominion_core::Chunk::at(0, 0));
        let registry = f.node.claim_world(&World::named("world")).await.unwrap();
        assert_eq!(registry.claim_count(), 1);
        assert_eq!(
            f.db.get_claim_world(&World::named("world"))
                .await
                .unwrap()
                .unwrap()
                .claim_count(),
            1
        );
        assert_eq!(f.cached_town().await.claim_count(), 1);
        assert_eq!(f.hook.events(), vec!["set (0, 0) in world".to_string()]);
        assert!(f
            .mayor
            .messages()
            .iter()
            .any(|m| m.contains("Claimed chunk (0, 0)")));
        // The claim travels to the cluster as a town update.
        assert!(f
            .broker
            .sent()
            .iter()
            .any(|m| m.message_type == MessageType::TownUpdate));
    }

    #[tokio::test]
    async fn claims_refuse_unhosted_worlds_and_taken_chunks() {
        let f = fixture().await;

        let elsewhere = Position::at(0.0, 64.0, 0.0, World::named("somewhere_else"));
        let result = f.claims().create_claim(f.mayor.as_ref(), &elsewhere).await;
        assert!(matches!(result, Err(OpError::WorldNotClaimable(_))));

        f.claims()
            .create_claim(f.mayor.as_ref(), &in_chunk(0, 0))
            .await
            .unwrap();
        // Another position within the same chunk.
        let same_chunk = Position::at(15.0, 64.0, 15.0, World::named("world"));
        let result = f.claims().create_claim(f.mayor.as_ref(), &same_chunk).await;
        assert!(matches!(result, Err(OpError::ChunkClaimed(owner)) if owner == "Rathaus"));

        // A resident holds no claim privilege.
        let result = f
            .claims()
            .create_claim(f.resident.as_ref(), &in_chunk(1, 0))
            .await;
        assert!(matches!(result, Err(OpError::NoPrivilege(Privilege::Claim))));
    }

    #[tokio::test]
    async fn claim_budget_tracks_town_level() {
        let f = fixture().await;
        // Level 1 allows six claims.
        for x in 0..6 {
            f.claims()
                .create_claim(f.mayor.as_ref(), &in_chunk(x, 0))
                .await
                .unwrap();
        }
        let result = f
            .claims()
            .create_claim(f.mayor.as_ref(), &in_chunk(6, 0))
            .await;
        assert!(matches!(result, Err(OpError::ClaimLimit)));
        assert_eq!(f.cached_town().await.claim_count(), 6);
    }

    #[tokio::test]
    async fn delete_claim_checks_ownership() {
        let f = fixture().await;
        f.claims()
            .create_claim(f.mayor.as_ref(), &in_chunk(0, 0))
            .await
            .unwrap();

        // A second town claims next door.
        let ada = TestUser::new("Ada");
        f.db.add_user(SavedUser::new(ada.user().clone())).await;
        f.node.register_user(ada.clone()).await;
        f.node
            .manager()
            .towns()
            .create_town(ada.as_ref(), "Atrium")
            .await
            .unwrap();
        f.claims()
            .create_claim(ada.as_ref(), &in_chunk(5, 5))
            .await
            .unwrap();

        // Unclaimed chunk.
        let result = f.claims().delete_claim(f.mayor.as_ref(), &in_chunk(9, 9)).await;
        assert!(matches!(result, Err(OpError::ChunkNotClaimed)));

        // Someone else's chunk.
        let result = f.claims().delete_claim(f.mayor.as_ref(), &in_chunk(5, 5)).await;
        assert!(matches!(result, Err(OpError::ClaimNotYours)));
        assert_eq!(f.mayor.messages().len(), 3); // claim feedback + two refusals

        // The owner's own chunk goes away everywhere.
        f.claims()
            .delete_claim(f.mayor.as_ref(), &in_chunk(0, 0))
            .await
            .unwrap();
        let registry = f.node.claim_world(&World::named("world")).await.unwrap();
        assert!(registry.claim_at(dominion_core::Chunk::at(0, 0)).is_none());
        assert_eq!(f.cached_town().await.claim_count(), 0);
        assert_eq!(
            f.db.get_claim_world(&World::named("world"))
                .await
                .unwrap()
                .unwrap()
                .claim_at(dominion_core::Chunk::at(0, 0)),
            None
        );
        assert!(f
            .hook
            .events()
            .contains(&"remove (0, 0) in world".to_string()));
    }

    #[tokio::test]
    async fn delete_all_claims_is_a_mayor_operation() {
        let f = fixture().await;
        for x in 0..3 {
            f.claims()
                .create_claim(f.mayor.as_ref(), &in_chunk(x, 0))
                .await
                .unwrap();
        }

        let result = f.claims().delete_all_claims(f.resident.as_ref()).await;
        assert!(matches!(result, Err(OpError::NotMayor)));

        let removed = f.claims().delete_all_claims(f.mayor.as_ref()).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(
            f.node
                .claim_world(&World::named("world"))
                .await
                .unwrap()
                .claim_count(),
            0
        );
        assert_eq!(f.cached_town().await.claim_count(), 0);
        assert!(f
            .hook
            .events()
            .contains(&"remove_town Rathaus".to_string()));
        assert!(f
            .mayor
            .messages()
            .iter()
            .any(|m| m.contains("Removed all 3 claims")));
    }
}
