//! The cross-server message envelope.

use super::payload::Payload;
use super::{Broker, BrokerError};
use crate::hooks::OnlineUser;
use serde::{Deserialize, Serialize};

/// Every kind of message a cluster node exchanges.
///
/// The set is closed and versioned with the wire protocol; a node running
/// an older protocol never sees these frames because the subchannel name
/// embeds the version. `Unknown` absorbs types introduced by a newer peer
/// on the same version (a bug, but one that must not take the node down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    TownDelete,
    TownUpdate,
    TownInviteRequest,
    TownInviteReply,
    TownChatMessage,
    TownLevelUp,
    TownRenamed,
    TownTransferred,
    TownDemoted,
    TownPromoted,
    TownEvicted,
    #[serde(other)]
    Unknown,
}

/// Whether a message is addressed to a player or to a server.
///
/// Player-directed messages carry the username and are acted on by
/// whichever server currently hosts that player; server-directed messages
/// name a server or the [`Message::TARGET_ALL`] broadcast sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Player,
    Server,
}

/// One message envelope as it travels between servers.
///
/// `source_server` is stamped on send and is what receivers use to drop
/// their own broadcasts (every transport echoes). `sender` is the username
/// of the acting player, kept as plain text so receivers can resolve it
/// against their own user store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub source_server: String,
    pub sender: String,
    pub target: String,
    pub target_type: TargetType,
    #[serde(default)]
    pub payload: Payload,
}

impl Message {
    /// Broadcast sentinel for server-directed messages.
    pub const TARGET_ALL: &'static str = "ALL";

    /// Starts building a message of the given type.
    ///
    /// The target defaults to an all-servers broadcast and the payload to
    /// [`Payload::Empty`]; origin fields are stamped by the broker on send.
    pub fn builder(message_type: MessageType) -> MessageBuilder {
        MessageBuilder {
            message_type,
            target: Self::TARGET_ALL.to_string(),
            target_type: TargetType::Server,
            payload: Payload::Empty,
        }
    }

    /// Whether this message is an all-servers broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.target_type == TargetType::Server && self.target == Self::TARGET_ALL
    }

    /// Stamps origin fields and hands the message to the broker.
    pub async fn send(
        self,
        broker: &dyn Broker,
        sender: &dyn OnlineUser,
    ) -> Result<(), BrokerError> {
        broker.send(self, sender).await
    }
}

/// Builder for [`Message`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message_type: MessageType,
    target: String,
    target_type: TargetType,
    payload: Payload,
}

impl MessageBuilder {
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Addresses the message at a single player or server by name.
    pub fn target(mut self, target: impl Into<String>, target_type: TargetType) -> Self {
        self.target = target.into();
        self.target_type = target_type;
        self
    }

    /// Addresses the message at every server in the cluster.
    pub fn target_all(mut self) -> Self {
        self.target = Message::TARGET_ALL.to_string();
        self.target_type = TargetType::Server;
        self
    }

    pub fn build(self) -> Message {
        Message {
            message_type: self.message_type,
            source_server: String::new(),
            sender: String::new(),
            target: self.target,
            target_type: self.target_type,
            payload: self.payload,
        }
    }
}
