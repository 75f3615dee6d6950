//! In-process channel transport.
//!
//! Nodes sharing one [`ChannelHub`] form a cluster inside a single
//! process. The hub is a plain broadcast fan-out: every published frame
//! reaches every subscriber, the publisher included, which makes this the
//! transport of choice for exercising the full send/receive/suppress path
//! in tests and for single-process deployments.

use super::{receive_frame, Broker, BrokerError};
use crate::context::Dominion;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared fan-out connecting the nodes of an in-process cluster.
///
/// Clones refer to the same hub; one hub corresponds to one cluster.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    tx: broadcast::Sender<Vec<u8>>,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }

    fn publish(&self, frame: Vec<u8>) {
        // No subscribers just means no other node is up yet.
        let _ = self.tx.send(frame);
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Broker binding one node to a [`ChannelHub`].
pub struct ChannelBroker {
    node: Arc<Dominion>,
    hub: ChannelHub,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelBroker {
    pub fn new(node: Arc<Dominion>, hub: ChannelHub) -> Self {
        Self {
            node,
            hub,
            pump: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Broker for ChannelBroker {
    fn node(&self) -> &Arc<Dominion> {
        &self.node
    }

    async fn initialize(&self) -> Result<(), BrokerError> {
        let mut rx = self.hub.subscribe();
        let node = self.node.clone();
        let pump = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(frame) => receive_frame(&node, &frame).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "channel hub receiver lagged; frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("channel hub pump stopped");
        });
        *self.pump.lock().await = Some(pump);
        info!(
            cluster = %self.node.settings().cluster.id,
            "connected to in-process channel hub"
        );
        Ok(())
    }

    async fn publish(&self, frame: Vec<u8>) -> Result<(), BrokerError> {
        self.hub.publish(frame);
        Ok(())
    }

    async fn close(&self) {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        debug!("channel broker closed");
    }
}
