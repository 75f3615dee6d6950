//! Cross-server messaging: broker transports and inbound dispatch.
//!
//! A node publishes JSON message envelopes to its cluster and applies the
//! envelopes other nodes publish. Both directions go through the
//! [`Broker`] trait, so the transport (in-process channel hub, Redis
//! pub/sub, or one supplied by the embedding) is chosen at startup without
//! touching any message logic.
//!
//! Every transport echoes broadcasts back at the sender, so inbound
//! handling drops messages stamped with the node's own server name before
//! doing anything else. Handlers re-fetch authoritative state from the
//! backing store rather than trusting message contents, which keeps them
//! idempotent under duplicate delivery.

pub mod channel;
pub mod message;
pub mod payload;
pub mod redis;

pub use message::{Message, MessageType, TargetType};
pub use payload::{Invite, Payload};

use crate::context::Dominion;
use crate::hooks::OnlineUser;
use async_trait::async_trait;
use dominion_core::{Town, TownId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Wire protocol revision; part of the subchannel name, so nodes speaking
/// different revisions never see each other's frames.
pub const PROTOCOL_VERSION: u32 = 1;

/// The pub/sub channel a cluster communicates on.
pub fn subchannel(cluster_id: &str) -> String {
    format!("dominion:{cluster_id}/{PROTOCOL_VERSION}")
}

/// Errors raised while connecting or publishing through a broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(#[from] ::redis::RedisError),
    #[error("message encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("broker is not connected")]
    NotConnected,
}

/// A message transport binding this node to its cluster.
///
/// Implementations provide connectivity (`initialize`, `publish`,
/// `close`); the message semantics (origin stamping, inbound dispatch)
/// are shared and live in the provided methods.
#[async_trait]
pub trait Broker: Send + Sync {
    /// The node this broker serves.
    fn node(&self) -> &Arc<Dominion>;

    /// Connects the transport and starts pumping inbound frames.
    async fn initialize(&self) -> Result<(), BrokerError>;

    /// Publishes one encoded envelope to the cluster.
    async fn publish(&self, frame: Vec<u8>) -> Result<(), BrokerError>;

    /// Stops the inbound pump and releases the transport.
    async fn close(&self);

    /// Stamps the envelope's origin fields and publishes it.
    async fn send(
        &self,
        mut message: Message,
        sender: &dyn OnlineUser,
    ) -> Result<(), BrokerError> {
        message.source_server = self.node().server_name().to_string();
        message.sender = sender.name().to_string();
        debug!(
            message_type = ?message.message_type,
            target = %message.target,
            "publishing message"
        );
        let frame = serde_json::to_vec(&message)?;
        self.publish(frame).await
    }

    /// Applies one inbound message to local state.
    ///
    /// `receiver` is the locally online player a player-directed message
    /// addresses, resolved by the transport before calling in.
    async fn handle(&self, receiver: Option<Arc<dyn OnlineUser>>, message: Message) {
        dispatch(self.node(), receiver, message).await;
    }

    /// Asks the proxy to move a player to another server. Fire-and-forget:
    /// the request rides the player's own connection and the proxy owns
    /// the outcome.
    async fn change_server(&self, user: &dyn OnlineUser, server: &str) {
        debug!(user = %user.name(), server, "requesting proxy transfer");
        user.connect_to(server);
    }
}

/// Decodes a raw frame, resolves its receiver and dispatches it.
///
/// Undecodable frames are warned about and dropped; frames addressed to a
/// different server by name are not ours to act on.
pub(crate) async fn receive_frame(node: &Arc<Dominion>, frame: &[u8]) {
    let message: Message = match serde_json::from_slice(frame) {
        Ok(message) => message,
        Err(error) => {
            warn!(%error, "dropping undecodable message frame");
            return;
        }
    };
    let receiver = match message.target_type {
        TargetType::Player => node.online_user_by_name(&message.target).await,
        TargetType::Server => {
            if message.target != Message::TARGET_ALL && message.target != node.server_name() {
                return;
            }
            None
        }
    };
    dispatch(node, receiver, message).await;
}

/// The inbound dispatch table.
///
/// Handlers never send further messages and never panic on bad input: a
/// payload of the wrong variant is warned about and dropped, and an
/// aggregate the store no longer has degrades to a warning.
pub(crate) async fn dispatch(
    node: &Arc<Dominion>,
    receiver: Option<Arc<dyn OnlineUser>>,
    message: Message,
) {
    // Every transport echoes our own broadcasts back; drop them before
    // they can re-apply local effects.
    if message.source_server == node.server_name() {
        return;
    }
    debug!(
        message_type = ?message.message_type,
        source = %message.source_server,
        target = %message.target,
        "handling inbound message"
    );

    let manager = node.manager();
    match message.message_type {
        MessageType::TownDelete => {
            let Some(town_id) = message.payload.as_town_id() else {
                return warn_payload(&message);
            };
            // Notify members and drop markers while the roster is still
            // known, then evict the replica and sweep the claims.
            if let Some(town) = node.town(town_id).await {
                manager
                    .send_town_notification(&town, "town_deleted", &[town.name()])
                    .await;
                if let Some(hook) = node.map_hook().await {
                    hook.remove_town_markers(&town);
                }
            }
            node.remove_cached_town(town_id).await;
            match node.purge_town_claims(town_id).await {
                Ok(removed) => {
                    debug!(town = %town_id, removed, "cleared deleted town's claims")
                }
                Err(error) => {
                    error!(town = %town_id, %error, "failed to persist claim removal")
                }
            }
        }
        MessageType::TownUpdate => {
            let Some(town_id) = message.payload.as_town_id() else {
                return warn_payload(&message);
            };
            // The store is authoritative; the payload only names the town.
            match node.database().get_town(town_id).await {
                Ok(Some(town)) => {
                    debug!(town = %town_id, "refreshed town from store");
                    node.update_cached_town(town).await;
                }
                Ok(None) => {
                    warn!(town = %town_id, "town update for a town the store no longer has")
                }
                Err(error) => {
                    warn!(town = %town_id, %error, "could not re-fetch updated town")
                }
            }
        }
        MessageType::TownInviteRequest => {
            let Some(receiver) = receiver else {
                return; // the addressed player is not on this server
            };
            let Some(invite) = message.payload.as_invite().cloned() else {
                return warn_payload(&message);
            };
            manager.towns().handle_inbound_invite(receiver, invite).await;
        }
        MessageType::TownInviteReply => {
            let Some(receiver) = receiver else {
                return;
            };
            let Some(accepted) = message.payload.as_bool() else {
                return warn_payload(&message);
            };
            if accepted {
                // The receiver is the original inviter; tell their town.
                if let Some(member) = node.user_town(receiver.user()).await {
                    if let Some(town) = node.town(member.town).await {
                        manager
                            .send_town_notification(
                                &town,
                                "town_member_joined",
                                &[&message.sender],
                            )
                            .await;
                    }
                }
            } else {
                receiver.send_message(
                    &node
                        .locales()
                        .get_with("invite_declined_by", &[&message.sender]),
                );
            }
        }
        MessageType::TownChatMessage => {
            let Some(text) = message.payload.as_string() else {
                return warn_payload(&message);
            };
            match node.database().get_user(&message.sender).await {
                Ok(Some(saved)) => {
                    if let Some(member) = node.user_town(&saved.user).await {
                        if let Some(town) = node.town(member.town).await {
                            manager.towns().relay_chat(&town, &saved.user.name, text).await;
                        }
                    } else {
                        debug!(sender = %message.sender, "dropping town chat from a non-member");
                    }
                }
                Ok(None) => warn!(sender = %message.sender, "town chat from unknown user"),
                Err(error) => warn!(%error, "could not resolve town chat sender"),
            }
        }
        MessageType::TownLevelUp => {
            town_notification(node, &manager, &message, |town| {
                (
                    "town_level_up",
                    vec![town.name().to_string(), town.level().to_string()],
                )
            })
            .await;
        }
        MessageType::TownRenamed => {
            town_notification(node, &manager, &message, |town| {
                ("town_renamed", vec![town.name().to_string()])
            })
            .await;
        }
        MessageType::TownTransferred => {
            let sender = message.sender.clone();
            town_notification(node, &manager, &message, move |town| {
                ("town_transferred", vec![sender, town.name().to_string()])
            })
            .await;
        }
        MessageType::TownDemoted | MessageType::TownPromoted | MessageType::TownEvicted => {
            let Some(receiver) = receiver else {
                return;
            };
            let Some(town_id) = message.payload.as_town_id() else {
                return warn_payload(&message);
            };
            if let Some(text) =
                personal_notice(node, message.message_type, town_id, receiver.as_ref()).await
            {
                receiver.send_message(&text);
            }
        }
        MessageType::Unknown => {
            error!(
                source = %message.source_server,
                "received message of unrecognized type"
            );
        }
    }
}

/// Resolves the town named by an integer payload and sends one localized
/// notification to its local members.
async fn town_notification(
    node: &Arc<Dominion>,
    manager: &crate::manager::Manager,
    message: &Message,
    compose: impl FnOnce(&Town) -> (&'static str, Vec<String>) + Send,
) {
    let Some(town_id) = message.payload.as_town_id() else {
        return warn_payload(message);
    };
    let Some(town) = node.town(town_id).await else {
        warn!(town = %town_id, "notification for a town not in the replica");
        return;
    };
    let (key, args) = compose(&town);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    manager.send_town_notification(&town, key, &args).await;
}

/// The localized line an eviction or role-change notice delivers to its
/// addressed player. Used both for inbound messages and for targets who
/// turn out to be on the acting server. `None` for other message types.
pub(crate) async fn personal_notice(
    node: &Arc<Dominion>,
    kind: MessageType,
    town_id: TownId,
    receiver: &dyn OnlineUser,
) -> Option<String> {
    let town = node.town(town_id).await;
    let town_name = town
        .as_ref()
        .map(|town| town.name().to_string())
        .unwrap_or_else(|| format!("town {town_id}"));
    let text = match kind {
        MessageType::TownEvicted => node.locales().get_with("you_evicted", &[&town_name]),
        MessageType::TownPromoted | MessageType::TownDemoted => {
            let role = town
                .as_ref()
                .and_then(|town| town.role_of(receiver.uuid()))
                .map(|role| role.to_string())
                .unwrap_or_else(|| "member".to_string());
            let key = if kind == MessageType::TownPromoted {
                "you_promoted"
            } else {
                "you_demoted"
            };
            node.locales().get_with(key, &[&role, &town_name])
        }
        _ => return None,
    };
    Some(text)
}

fn warn_payload(message: &Message) {
    warn!(
        message_type = ?message.message_type,
        source = %message.source_server,
        "dropping message with unexpected payload"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use crate::testing::{test_node, RecordingMapHook, TestUser};
    use dominion_core::{Claim, Chunk, ClaimWorld, Preferences, Role, User, World};
    use std::collections::BTreeSet;

    /// Seeds a node with one cached town (id 1, two members), a claim
    /// world holding that town's claims, and both members online.
    async fn seeded_node(
        server: &str,
    ) -> (
        Arc<Dominion>,
        Arc<crate::store::MemoryDatabase>,
        Arc<TestUser>,
        Arc<TestUser>,
    ) {
        let (node, db) = test_node(server);
        let mayor = TestUser::new("Wil");
        let resident = TestUser::new("Toby");

        let mut town = db.create_town("Rathaus", mayor.user()).await.unwrap();
        town.add_member(resident.uuid(), Role::Resident);
        db.upsert_town(&town).await.unwrap();
        db.add_user(dominion_core::SavedUser::new(mayor.user().clone()))
            .await;
        db.add_user(dominion_core::SavedUser::new(resident.user().clone()))
            .await;

        let world = World::named("world");
        let mut claims = ClaimWorld::new(1);
        claims.add_claim(town.id(), Claim::at(Chunk::at(0, 0))).unwrap();
        claims.add_claim(town.id(), Claim::at(Chunk::at(1, 0))).unwrap();
        db.upsert_claim_world(&world, &claims).await.unwrap();

        node.load_data(vec![world]).await.unwrap();
        node.register_user(mayor.clone()).await;
        node.register_user(resident.clone()).await;
        (node, db, mayor, resident)
    }

    fn from_server(source: &str, message_type: MessageType, payload: Payload) -> Message {
        let mut message = Message::builder(message_type).payload(payload).build();
        message.source_server = source.to_string();
        message.sender = "Wil".to_string();
        message
    }

    #[tokio::test]
    async fn own_messages_are_dropped_for_every_type() {
        let (node, db, mayor, resident) = seeded_node("alpha").await;
        // Make the store diverge from the cache so a handler that runs
        // would visibly change state.
        let mut changed = db.get_town(TownId(1)).await.unwrap().unwrap();
        changed.set_name("Changed");
        db.upsert_town(&changed).await.unwrap();

        let invite = Invite::new(TownId(1), mayor.user().clone());
        let cases = vec![
            (MessageType::TownDelete, Payload::integer(1)),
            (MessageType::TownUpdate, Payload::integer(1)),
            (MessageType::TownInviteRequest, Payload::invite(invite)),
            (MessageType::TownInviteReply, Payload::bool(true)),
            (MessageType::TownChatMessage, Payload::string("hi")),
            (MessageType::TownLevelUp, Payload::integer(1)),
            (MessageType::TownRenamed, Payload::integer(1)),
            (MessageType::TownTransferred, Payload::integer(1)),
            (MessageType::TownDemoted, Payload::integer(1)),
            (MessageType::TownPromoted, Payload::integer(1)),
            (MessageType::TownEvicted, Payload::integer(1)),
            (MessageType::Unknown, Payload::uuid_set(BTreeSet::new())),
        ];
        for (message_type, payload) in cases {
            let receiver = Some(resident.clone() as Arc<dyn crate::hooks::OnlineUser>);
            dispatch(&node, receiver, from_server("alpha", message_type, payload)).await;
        }

        // Nothing observable happened: the stale cache entry survived, the
        // claims survived, nobody was messaged, no invite was parked.
        let town = node.town(TownId(1)).await.unwrap();
        assert_eq!(town.name(), "Rathaus");
        let claims = node.claim_world(&World::named("world")).await.unwrap();
        assert_eq!(claims.claim_count(), 2);
        assert!(mayor.messages().is_empty());
        assert!(resident.messages().is_empty());
        assert!(node.pending_invite(resident.uuid()).await.is_none());
    }

    #[tokio::test]
    async fn town_update_refetches_and_is_idempotent() {
        let (node, db, _, _) = seeded_node("alpha").await;
        let mut renamed = db.get_town(TownId(1)).await.unwrap().unwrap();
        renamed.set_name("Atrium");
        db.upsert_town(&renamed).await.unwrap();

        let update = from_server("beta", MessageType::TownUpdate, Payload::integer(1));
        dispatch(&node, None, update.clone()).await;
        assert_eq!(node.town(TownId(1)).await.unwrap().name(), "Atrium");

        // A duplicate delivery converges to the same state.
        dispatch(&node, None, update).await;
        assert_eq!(node.town(TownId(1)).await.unwrap().name(), "Atrium");
        assert_eq!(node.cached_towns().await.len(), 1);
    }

    #[tokio::test]
    async fn town_update_for_vanished_town_keeps_the_replica() {
        let (node, db, _, _) = seeded_node("alpha").await;
        db.delete_town(TownId(1)).await.unwrap();

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownUpdate, Payload::integer(1)),
        )
        .await;

        // Warned and left alone; deletion travels as TOWN_DELETE instead.
        assert!(node.town(TownId(1)).await.is_some());
    }

    #[tokio::test]
    async fn town_delete_clears_replica_and_every_world() {
        let (node, db, _, resident) = seeded_node("alpha").await;

        // A second world with a claim of town 1 and one of town 2.
        let other = db
            .create_town("Atrium", &User::new(uuid::Uuid::new_v4(), "Ada"))
            .await
            .unwrap();
        let nether = World::new("nether", "nether");
        let mut claims = ClaimWorld::new(2);
        claims.add_claim(TownId(1), Claim::at(Chunk::at(8, 8))).unwrap();
        claims.add_claim(other.id(), Claim::at(Chunk::at(9, 9))).unwrap();
        db.upsert_claim_world(&nether, &claims).await.unwrap();
        node.load_data(vec![World::named("world"), nether.clone()])
            .await
            .unwrap();
        node.register_user(resident.clone()).await;

        let hook = Arc::new(RecordingMapHook::default());
        node.attach_map_hook(hook.clone()).await;

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownDelete, Payload::integer(1)),
        )
        .await;

        assert!(node.town(TownId(1)).await.is_none());
        assert_eq!(
            node.claim_world(&World::named("world")).await.unwrap().claim_count(),
            0
        );
        let nether_claims = node.claim_world(&nether).await.unwrap();
        assert_eq!(nether_claims.claim_count(), 1);
        assert!(nether_claims.claim_at(Chunk::at(9, 9)).is_some());

        // Changed worlds were persisted.
        assert_eq!(
            db.get_claim_world(&World::named("world")).await.unwrap().unwrap().claim_count(),
            0
        );
        assert_eq!(
            db.get_claim_world(&nether).await.unwrap().unwrap().claim_count(),
            1
        );

        // Members were told once and the markers went away.
        let deleted_notice = resident
            .messages()
            .iter()
            .filter(|m| m.contains("deleted"))
            .count();
        assert_eq!(deleted_notice, 1);
        assert_eq!(hook.events(), vec!["remove_town Rathaus".to_string()]);
    }

    #[tokio::test]
    async fn town_delete_with_no_claims_is_still_clean() {
        let (node, db) = test_node("alpha");
        let town = db
            .create_town("Rathaus", &User::new(uuid::Uuid::new_v4(), "Wil"))
            .await
            .unwrap();
        node.load_data(vec![]).await.unwrap();
        assert!(node.town(town.id()).await.is_some());

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownDelete, Payload::integer(town.id().0)),
        )
        .await;
        assert!(node.town(town.id()).await.is_none());
    }

    #[tokio::test]
    async fn wrong_payload_variant_is_dropped() {
        let (node, _, mayor, _) = seeded_node("alpha").await;

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownDelete, Payload::string("1")),
        )
        .await;
        dispatch(
            &node,
            Some(mayor.clone()),
            from_server("beta", MessageType::TownInviteReply, Payload::integer(1)),
        )
        .await;

        assert!(node.town(TownId(1)).await.is_some());
        assert!(mayor.messages().is_empty());
    }

    #[tokio::test]
    async fn invite_request_parks_invite_for_present_receiver() {
        let (node, _, mayor, _) = seeded_node("alpha").await;
        let newcomer = TestUser::new("Ada");
        node.register_user(newcomer.clone()).await;

        let invite = Invite::new(TownId(1), mayor.user().clone());
        dispatch(
            &node,
            Some(newcomer.clone()),
            from_server("beta", MessageType::TownInviteRequest, Payload::invite(invite.clone())),
        )
        .await;

        assert_eq!(node.pending_invite(newcomer.uuid()).await, Some(invite));
        assert_eq!(newcomer.messages().len(), 1);
        assert!(newcomer.messages()[0].contains("Rathaus"));
    }

    #[tokio::test]
    async fn invite_request_without_receiver_is_dropped() {
        let (node, _, mayor, _) = seeded_node("alpha").await;
        let invite = Invite::new(TownId(1), mayor.user().clone());
        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownInviteRequest, Payload::invite(invite)),
        )
        .await;
        // Nobody home: nothing parked anywhere.
        assert!(node.pending_invite(mayor.uuid()).await.is_none());
    }

    #[tokio::test]
    async fn chat_relays_to_local_members_only() {
        let (node, db, mayor, resident) = seeded_node("alpha").await;
        let outsider = TestUser::new("Ada");
        node.register_user(outsider.clone()).await;
        db.add_user(dominion_core::SavedUser::new(mayor.user().clone()))
            .await;

        let mut chat = from_server("beta", MessageType::TownChatMessage, Payload::string("hello"));
        chat.sender = mayor.name().to_string();
        dispatch(&node, None, chat).await;

        assert_eq!(resident.messages().len(), 1);
        assert!(resident.messages()[0].contains("hello"));
        assert!(resident.messages()[0].contains("Wil"));
        assert!(outsider.messages().is_empty());
    }

    #[tokio::test]
    async fn level_up_notifies_members_with_current_level() {
        let (node, db, _, resident) = seeded_node("alpha").await;
        let mut town = db.get_town(TownId(1)).await.unwrap().unwrap();
        town.set_level(3);
        db.upsert_town(&town).await.unwrap();
        // The TOWN_UPDATE that precedes the notification on the wire.
        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownUpdate, Payload::integer(1)),
        )
        .await;

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownLevelUp, Payload::integer(1)),
        )
        .await;

        let messages = resident.messages();
        assert!(messages.iter().any(|m| m.contains("level 3")), "{messages:?}");
    }

    #[tokio::test]
    async fn notification_preferences_gate_delivery() {
        let (node, _, _, resident) = seeded_node("alpha").await;
        node.set_user_preferences(
            resident.uuid(),
            Preferences {
                town_notifications: false,
                ..Preferences::default()
            },
        )
        .await;

        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownRenamed, Payload::integer(1)),
        )
        .await;
        assert!(resident.messages().is_empty());
    }

    #[tokio::test]
    async fn eviction_notice_reaches_the_addressed_player() {
        let (node, _, _, resident) = seeded_node("alpha").await;
        dispatch(
            &node,
            Some(resident.clone()),
            from_server("beta", MessageType::TownEvicted, Payload::integer(1)),
        )
        .await;
        let messages = resident.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("evicted"));
        assert!(messages[0].contains("Rathaus"));
    }

    #[tokio::test]
    async fn promotion_notice_names_the_new_role() {
        let (node, db, _, resident) = seeded_node("alpha").await;
        let mut town = db.get_town(TownId(1)).await.unwrap().unwrap();
        town.add_member(resident.uuid(), Role::Trustee);
        db.upsert_town(&town).await.unwrap();
        dispatch(
            &node,
            None,
            from_server("beta", MessageType::TownUpdate, Payload::integer(1)),
        )
        .await;

        dispatch(
            &node,
            Some(resident.clone()),
            from_server("beta", MessageType::TownPromoted, Payload::integer(1)),
        )
        .await;
        let messages = resident.messages();
        assert!(messages.iter().any(|m| m.contains("trustee")), "{messages:?}");
    }

    #[tokio::test]
    async fn frames_for_other_servers_are_ignored() {
        let (node, db, _, _) = seeded_node("alpha").await;
        let mut renamed = db.get_town(TownId(1)).await.unwrap().unwrap();
        renamed.set_name("Atrium");
        db.upsert_town(&renamed).await.unwrap();

        let mut message = from_server("beta", MessageType::TownUpdate, Payload::integer(1));
        message.target = "gamma".to_string();
        let frame = serde_json::to_vec(&message).unwrap();
        receive_frame(&node, &frame).await;
        assert_eq!(node.town(TownId(1)).await.unwrap().name(), "Rathaus");

        // The broadcast sentinel does reach us.
        message.target = Message::TARGET_ALL.to_string();
        let frame = serde_json::to_vec(&message).unwrap();
        receive_frame(&node, &frame).await;
        assert_eq!(node.town(TownId(1)).await.unwrap().name(), "Atrium");
    }

    #[tokio::test]
    async fn undecodable_frames_are_dropped() {
        let (node, _, _, _) = seeded_node("alpha").await;
        receive_frame(&node, b"{not json").await;
        assert!(node.town(TownId(1)).await.is_some());
    }

    #[tokio::test]
    async fn unknown_type_has_no_effect() {
        let (node, _, mayor, resident) = seeded_node("alpha").await;
        dispatch(
            &node,
            None,
            from_server("beta", MessageType::Unknown, Payload::empty()),
        )
        .await;
        assert!(mayor.messages().is_empty());
        assert!(resident.messages().is_empty());
    }

    #[test]
    fn subchannel_embeds_cluster_and_protocol() {
        assert_eq!(subchannel("main"), format!("dominion:main/{PROTOCOL_VERSION}"));
        assert_ne!(subchannel("main"), subchannel("other"));
    }
}
