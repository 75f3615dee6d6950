//! The backing store every server in a cluster shares.
//!
//! Replicas converge because update handlers re-read aggregates from here;
//! the store is the source of truth and the caches are views of it. SQL
//! implementations live in embedding crates; [`MemoryDatabase`] is the
//! reference implementation used by tests and the mirror node.

use async_trait::async_trait;
use dominion_core::{ClaimWorld, SavedUser, Town, TownId, User, World};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors surfaced by a backing store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence operations the sync layer needs.
///
/// All town mutation flows persist here before broadcasting, so remote
/// handlers that re-fetch always observe the new state.
#[async_trait]
pub trait Database: Send + Sync {
    /// Creates a town, minting its id. The creator becomes the mayor.
    async fn create_town(&self, name: &str, creator: &User) -> Result<Town, StoreError>;

    async fn get_town(&self, id: TownId) -> Result<Option<Town>, StoreError>;

    /// Every town in the cluster; used to warm a replica at startup.
    async fn get_all_towns(&self) -> Result<Vec<Town>, StoreError>;

    async fn upsert_town(&self, town: &Town) -> Result<(), StoreError>;

    async fn delete_town(&self, id: TownId) -> Result<(), StoreError>;

    /// Creates the claim registry for a world, minting its id.
    async fn create_claim_world(&self, world: &World) -> Result<ClaimWorld, StoreError>;

    async fn get_claim_world(&self, world: &World) -> Result<Option<ClaimWorld>, StoreError>;

    async fn upsert_claim_world(
        &self,
        world: &World,
        claims: &ClaimWorld,
    ) -> Result<(), StoreError>;

    /// Looks a user up by name, case-insensitively.
    async fn get_user(&self, name: &str) -> Result<Option<SavedUser>, StoreError>;
}

/// In-memory store keyed the same way the SQL schemas are.
#[derive(Default)]
pub struct MemoryDatabase {
    towns: RwLock<HashMap<TownId, Town>>,
    claim_worlds: RwLock<HashMap<String, ClaimWorld>>,
    users: RwLock<HashMap<String, SavedUser>>,
    next_town_id: AtomicI64,
    next_world_id: AtomicI64,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user record, as a login would.
    pub async fn add_user(&self, saved: SavedUser) {
        self.users
            .write()
            .await
            .insert(saved.user.name.to_lowercase(), saved);
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn create_town(&self, name: &str, creator: &User) -> Result<Town, StoreError> {
        let id = TownId(self.next_town_id.fetch_add(1, Ordering::SeqCst) + 1);
        let town = Town::create(id, name, creator.clone());
        self.towns.write().await.insert(id, town.clone());
        Ok(town)
    }

    async fn get_town(&self, id: TownId) -> Result<Option<Town>, StoreError> {
        Ok(self.towns.read().await.get(&id).cloned())
    }

    async fn get_all_towns(&self) -> Result<Vec<Town>, StoreError> {
        Ok(self.towns.read().await.values().cloned().collect())
    }

    async fn upsert_town(&self, town: &Town) -> Result<(), StoreError> {
        self.towns.write().await.insert(town.id(), town.clone());
        Ok(())
    }

    async fn delete_town(&self, id: TownId) -> Result<(), StoreError> {
        self.towns.write().await.remove(&id);
        Ok(())
    }

    async fn create_claim_world(&self, world: &World) -> Result<ClaimWorld, StoreError> {
        let id = self.next_world_id.fetch_add(1, Ordering::SeqCst) + 1;
        let claims = ClaimWorld::new(id);
        self.claim_worlds
            .write()
            .await
            .insert(world.name.clone(), claims.clone());
        Ok(claims)
    }

    async fn get_claim_world(&self, world: &World) -> Result<Option<ClaimWorld>, StoreError> {
        Ok(self.claim_worlds.read().await.get(&world.name).cloned())
    }

    async fn upsert_claim_world(
        &self,
        world: &World,
        claims: &ClaimWorld,
    ) -> Result<(), StoreError> {
        self.claim_worlds
            .write()
            .await
            .insert(world.name.clone(), claims.clone());
        Ok(())
    }

    async fn get_user(&self, name: &str) -> Result<Option<SavedUser>, StoreError> {
        Ok(self.users.read().await.get(&name.to_lowercase()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn town_ids_are_minted_monotonically() {
        let db = MemoryDatabase::new();
        let creator = User::new(Uuid::new_v4(), "Wil");
        let first = db.create_town("Rathaus", &creator).await.unwrap();
        let second = db.create_town("Atrium", &creator).await.unwrap();
        assert!(second.id() > first.id());
        assert_eq!(db.get_town(first.id()).await.unwrap().unwrap().name(), "Rathaus");
    }

    #[tokio::test]
    async fn user_lookup_is_case_insensitive() {
        let db = MemoryDatabase::new();
        let user = User::new(Uuid::new_v4(), "Wil");
        db.add_user(SavedUser::new(user.clone())).await;
        let found = db.get_user("wIL").await.unwrap().unwrap();
        assert_eq!(found.user, user);
        assert!(db.get_user("Toby").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_towns_stop_resolving() {
        let db = MemoryDatabase::new();
        let town = db
            .create_town("Rathaus", &User::new(Uuid::new_v4(), "Wil"))
            .await
            .unwrap();
        db.delete_town(town.id()).await.unwrap();
        assert!(db.get_town(town.id()).await.unwrap().is_none());
        assert!(db.get_all_towns().await.unwrap().is_empty());
    }
}
