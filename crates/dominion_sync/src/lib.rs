//! # Dominion Sync
//!
//! Cross-server town state synchronization for clustered game servers.
//! Each server in a cluster runs one [`Dominion`] node: it holds replica
//! caches of every town and claim registry, persists changes to a shared
//! backing store, and exchanges small JSON envelopes with its peers over
//! a pluggable message broker so that every replica converges on what the
//! store holds.
//!
//! ## Core ideas
//!
//! - **Store-authoritative convergence**: messages carry ids, not state.
//!   A receiving node re-fetches the aggregate from the shared store, so
//!   duplicate or reordered deliveries settle on the same result.
//! - **Persist, cache, broadcast**: every mutation goes through one choke
//!   point that writes the store first, refreshes the local replica
//!   second, and tells the cluster last.
//! - **Guarded operations**: player-facing operations authorize through
//!   role and privilege gates that refuse with exactly one localized
//!   message, keeping failure behavior uniform across every command.
//! - **Pluggable transport**: the [`Broker`](network::Broker) trait
//!   hides the wire. An in-process channel hub serves tests and
//!   single-process clusters; Redis pub/sub serves real deployments;
//!   embeddings may bring their own.
//!
//! ## Quick start
//!
//! ```no_run
//! use dominion_sync::{Dominion, Locales, MemoryDatabase, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut settings = Settings::default();
//!     settings.server.name = "alpha".to_string();
//!
//!     let database = Arc::new(MemoryDatabase::new());
//!     let node = Dominion::new(settings, Locales::default(), database);
//!     node.load_data(Vec::new()).await?;
//!     node.initialize_network(None).await?;
//!
//!     // Wire the embedding's player sessions in via `register_user`,
//!     // then drive operations through `node.manager()`.
//!     node.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod hooks;
pub mod locales;
pub mod manager;
pub mod network;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{BrokerSettings, BrokerType, ClusterSettings, LevelSettings, RedisSettings, ServerSettings, Settings};
pub use context::Dominion;
pub use hooks::{MapHook, OnlineUser};
pub use locales::Locales;
pub use manager::{AdminManager, ClaimsManager, Manager, OpError, TownsManager};
pub use network::channel::{ChannelBroker, ChannelHub};
pub use network::redis::RedisBroker;
pub use network::{Broker, BrokerError, Invite, Message, MessageType, Payload, TargetType};
pub use store::{Database, MemoryDatabase, StoreError};
