//! The per-server sync context.
//!
//! One [`Dominion`] exists per game server. It owns the replica caches,
//! the session registry and the broker slot; every other piece of the
//! crate reaches shared state through it. All caches are lock-guarded
//! stores behind `tokio::sync::RwLock`; nothing hands out a raw `&mut`
//! across an await point, and no lock is held while persisting or
//! broadcasting.

use crate::config::{BrokerType, Settings};
use crate::hooks::{MapHook, OnlineUser};
use crate::locales::Locales;
use crate::manager::Manager;
use crate::network::channel::{ChannelBroker, ChannelHub};
use crate::network::redis::RedisBroker;
use crate::network::{Broker, BrokerError};
use crate::network::payload::Invite;
use crate::store::{Database, StoreError};
use dominion_core::{
    Chunk, ClaimWorld, Member, Preferences, Town, TownClaim, TownId, User, World,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Shared state and collaborators of one cluster node.
pub struct Dominion {
    settings: Settings,
    locales: Locales,
    database: Arc<dyn Database>,
    towns: RwLock<HashMap<TownId, Town>>,
    claim_worlds: RwLock<HashMap<World, ClaimWorld>>,
    worlds: RwLock<Vec<World>>,
    online: RwLock<HashMap<Uuid, Arc<dyn OnlineUser>>>,
    preferences: RwLock<HashMap<Uuid, Preferences>>,
    invites: RwLock<HashMap<Uuid, Invite>>,
    broker: RwLock<Option<Arc<dyn Broker>>>,
    map_hook: RwLock<Option<Arc<dyn MapHook>>>,
}

impl Dominion {
    pub fn new(settings: Settings, locales: Locales, database: Arc<dyn Database>) -> Arc<Self> {
        Arc::new(Self {
            settings,
            locales,
            database,
            towns: RwLock::new(HashMap::new()),
            claim_worlds: RwLock::new(HashMap::new()),
            worlds: RwLock::new(Vec::new()),
            online: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
            invites: RwLock::new(HashMap::new()),
            broker: RwLock::new(None),
            map_hook: RwLock::new(None),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    /// This server's unique name within the cluster.
    pub fn server_name(&self) -> &str {
        &self.settings.server.name
    }

    /// The operation layer, bound to this context.
    pub fn manager(self: &Arc<Self>) -> Manager {
        Manager::new(self.clone())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Warms the replica caches from the backing store.
    ///
    /// `worlds` are the worlds this server hosts; claim registries are
    /// loaded for the ones that already have claims, and the rest are
    /// created lazily on their first claim.
    pub async fn load_data(&self, worlds: Vec<World>) -> Result<(), StoreError> {
        let towns = self.database.get_all_towns().await?;
        let town_count = towns.len();
        {
            let mut cache = self.towns.write().await;
            cache.clear();
            for town in towns {
                cache.insert(town.id(), town);
            }
        }

        let mut claim_count = 0;
        for world in &worlds {
            if let Some(claims) = self.database.get_claim_world(world).await? {
                claim_count += claims.claim_count();
                self.claim_worlds.write().await.insert(world.clone(), claims);
            }
        }
        *self.worlds.write().await = worlds;

        info!(towns = town_count, claims = claim_count, "loaded town data");
        Ok(())
    }

    /// Connects the broker transport selected in settings.
    ///
    /// `hub` supplies the shared fan-out for the channel transport; every
    /// node of an in-process cluster must hold a clone of the same hub.
    /// When cross-server sync is disabled this does nothing and the node
    /// runs standalone. An initialization failure is returned rather than
    /// escalated: the caller may keep running with cross-server features
    /// off, which is the intended degradation.
    pub async fn initialize_network(
        self: &Arc<Self>,
        hub: Option<ChannelHub>,
    ) -> Result<(), BrokerError> {
        if !self.settings.cross_server {
            info!("cross-server sync is disabled; running standalone");
            return Ok(());
        }
        let broker: Arc<dyn Broker> = match self.settings.broker.kind {
            BrokerType::Channel => {
                Arc::new(ChannelBroker::new(self.clone(), hub.unwrap_or_default()))
            }
            BrokerType::Redis => Arc::new(RedisBroker::new(
                self.clone(),
                self.settings.broker.redis.clone(),
            )),
        };
        self.connect_broker(broker).await
    }

    /// Initializes and attaches a broker built elsewhere.
    ///
    /// Embeddings with their own transport (a proxy plugin channel, for
    /// instance) implement [`Broker`] and attach it here instead of going
    /// through [`initialize_network`](Self::initialize_network).
    pub async fn connect_broker(&self, broker: Arc<dyn Broker>) -> Result<(), BrokerError> {
        broker.initialize().await?;
        *self.broker.write().await = Some(broker);
        Ok(())
    }

    /// The connected broker, when cross-server sync is up.
    pub async fn broker(&self) -> Option<Arc<dyn Broker>> {
        self.broker.read().await.clone()
    }

    /// Closes the broker and detaches it.
    pub async fn shutdown(&self) {
        if let Some(broker) = self.broker.write().await.take() {
            broker.close().await;
        }
        info!("sync context shut down");
    }

    // ------------------------------------------------------------------
    // Town replica cache
    // ------------------------------------------------------------------

    pub async fn town(&self, id: TownId) -> Option<Town> {
        self.towns.read().await.get(&id).cloned()
    }

    pub async fn town_by_name(&self, name: &str) -> Option<Town> {
        self.towns
            .read()
            .await
            .values()
            .find(|town| town.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub async fn cached_towns(&self) -> Vec<Town> {
        self.towns.read().await.values().cloned().collect()
    }

    /// Replaces or inserts a town in the replica. Keyed by id, so applying
    /// the same snapshot twice is a no-op.
    pub async fn update_cached_town(&self, town: Town) {
        self.towns.write().await.insert(town.id(), town);
    }

    pub async fn remove_cached_town(&self, id: TownId) -> Option<Town> {
        self.towns.write().await.remove(&id)
    }

    /// The membership of a user, if they are in any town.
    pub async fn user_town(&self, user: &User) -> Option<Member> {
        self.towns.read().await.values().find_map(|town| {
            town.role_of(user.uuid)
                .map(|role| Member::new(user.clone(), town.id(), role))
        })
    }

    // ------------------------------------------------------------------
    // Claim registries
    // ------------------------------------------------------------------

    /// Worlds this server hosts.
    pub async fn worlds(&self) -> Vec<World> {
        self.worlds.read().await.clone()
    }

    pub async fn is_world_registered(&self, world: &World) -> bool {
        self.worlds.read().await.contains(world)
    }

    pub async fn claim_world(&self, world: &World) -> Option<ClaimWorld> {
        self.claim_worlds.read().await.get(world).cloned()
    }

    pub async fn update_claim_world(&self, world: World, claims: ClaimWorld) {
        self.claim_worlds.write().await.insert(world, claims);
    }

    /// Resolves the claim covering a chunk against its owning town.
    pub async fn claim_at(&self, chunk: Chunk, world: &World) -> Option<TownClaim> {
        let found = {
            let registries = self.claim_worlds.read().await;
            registries.get(world).and_then(|registry| {
                registry
                    .claim_at(chunk)
                    .map(|(town, claim)| (town, claim.clone()))
            })
        };
        let (town_id, claim) = found?;
        let town = self.town(town_id).await?;
        Some(TownClaim::new(town, claim))
    }

    /// Removes a town's claims from every cached world, persisting each
    /// world that actually changed. Returns how many claims went away.
    pub async fn purge_town_claims(&self, town: TownId) -> Result<usize, StoreError> {
        let changed: Vec<(World, ClaimWorld, usize)> = {
            let mut registries = self.claim_worlds.write().await;
            registries
                .iter_mut()
                .filter_map(|(world, registry)| {
                    let removed = registry.remove_town_claims(town);
                    (removed > 0).then(|| (world.clone(), registry.clone(), removed))
                })
                .collect()
        };

        let mut total = 0;
        for (world, registry, removed) in changed {
            self.database.upsert_claim_world(&world, &registry).await?;
            debug!(town = %town, world = %world.name, removed, "purged town claims");
            total += removed;
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Sessions, preferences and invites
    // ------------------------------------------------------------------

    /// Registers a player session. Called by the embedding on join.
    pub async fn register_user(&self, user: Arc<dyn OnlineUser>) {
        self.online.write().await.insert(user.uuid(), user);
    }

    /// Drops a player session and any invite parked for them.
    pub async fn unregister_user(&self, uuid: Uuid) {
        self.online.write().await.remove(&uuid);
        self.invites.write().await.remove(&uuid);
    }

    pub async fn online_user(&self, uuid: Uuid) -> Option<Arc<dyn OnlineUser>> {
        self.online.read().await.get(&uuid).cloned()
    }

    pub async fn online_user_by_name(&self, name: &str) -> Option<Arc<dyn OnlineUser>> {
        self.online
            .read()
            .await
            .values()
            .find(|user| user.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub async fn online_users(&self) -> Vec<Arc<dyn OnlineUser>> {
        self.online.read().await.values().cloned().collect()
    }

    pub async fn user_preferences(&self, uuid: Uuid) -> Preferences {
        self.preferences
            .read()
            .await
            .get(&uuid)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set_user_preferences(&self, uuid: Uuid, preferences: Preferences) {
        self.preferences.write().await.insert(uuid, preferences);
    }

    /// Parks an invite for a player until they answer it. A newer invite
    /// replaces an older one.
    pub async fn add_invite(&self, target: Uuid, invite: Invite) {
        self.invites.write().await.insert(target, invite);
    }

    pub async fn pending_invite(&self, target: Uuid) -> Option<Invite> {
        self.invites.read().await.get(&target).cloned()
    }

    /// Consumes a pending invite.
    pub async fn take_invite(&self, target: Uuid) -> Option<Invite> {
        self.invites.write().await.remove(&target)
    }

    // ------------------------------------------------------------------
    // Map hook
    // ------------------------------------------------------------------

    pub async fn attach_map_hook(&self, hook: Arc<dyn MapHook>) {
        *self.map_hook.write().await = Some(hook);
    }

    pub async fn map_hook(&self) -> Option<Arc<dyn MapHook>> {
        self.map_hook.read().await.clone()
    }
}
