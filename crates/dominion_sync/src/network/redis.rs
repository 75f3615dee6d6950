//! Redis pub/sub transport.
//!
//! Every node of a cluster publishes to and subscribes on the same
//! subchannel, named after the cluster id and wire protocol version.
//! Publishing rides a multiplexed connection; inbound frames arrive on a
//! dedicated pub/sub connection pumped by a background task.
//!
//! There is no reconnect loop. A node that cannot reach Redis at startup
//! reports the failure and runs with cross-server features disabled,
//! which is the intended degradation for a broken transport.

use super::{receive_frame, subchannel, Broker, BrokerError};
use crate::config::RedisSettings;
use crate::context::Dominion;
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Broker binding one node to a Redis-backed cluster.
pub struct RedisBroker {
    node: Arc<Dominion>,
    settings: RedisSettings,
    connection: RwLock<Option<MultiplexedConnection>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RedisBroker {
    pub fn new(node: Arc<Dominion>, settings: RedisSettings) -> Self {
        Self {
            node,
            settings,
            connection: RwLock::new(None),
            pump: Mutex::new(None),
        }
    }

    fn channel(&self) -> String {
        subchannel(&self.node.settings().cluster.id)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    fn node(&self) -> &Arc<Dominion> {
        &self.node
    }

    async fn initialize(&self) -> Result<(), BrokerError> {
        let channel = self.channel();
        let client = redis::Client::open(self.settings.url.as_str())?;
        let connection = client.get_multiplexed_async_connection().await?;
        *self.connection.write().await = Some(connection);

        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&channel).await?;
        let node = self.node.clone();
        let pump = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(message) = stream.next().await {
                match message.get_payload::<Vec<u8>>() {
                    Ok(frame) => receive_frame(&node, &frame).await,
                    Err(error) => warn!(%error, "dropping unreadable redis frame"),
                }
            }
            debug!("redis subscription stream ended");
        });
        *self.pump.lock().await = Some(pump);

        info!(channel = %channel, "connected to redis message broker");
        Ok(())
    }

    async fn publish(&self, frame: Vec<u8>) -> Result<(), BrokerError> {
        let Some(mut connection) = self.connection.read().await.clone() else {
            return Err(BrokerError::NotConnected);
        };
        let _: () = connection.publish(self.channel(), frame).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        self.connection.write().await.take();
        debug!("redis broker closed");
    }
}
