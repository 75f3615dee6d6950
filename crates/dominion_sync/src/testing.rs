//! Test doubles shared by the crate's unit tests.

use crate::config::Settings;
use crate::context::Dominion;
use crate::hooks::{MapHook, OnlineUser};
use crate::locales::Locales;
use crate::network::message::Message;
use crate::network::{Broker, BrokerError};
use crate::store::{Database, MemoryDatabase};
use async_trait::async_trait;
use dominion_core::{Position, Town, TownClaim, User, World};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A scripted player that records everything delivered to it.
pub(crate) struct TestUser {
    user: User,
    position: Mutex<Position>,
    messages: Mutex<Vec<String>>,
    transfers: Mutex<Vec<String>>,
}

impl TestUser {
    pub fn new(name: &str) -> Arc<Self> {
        Self::at(name, Position::at(0.0, 64.0, 0.0, World::named("world")))
    }

    pub fn at(name: &str, position: Position) -> Arc<Self> {
        Arc::new(Self {
            user: User::new(Uuid::new_v4(), name),
            position: Mutex::new(position),
            messages: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
        })
    }

    pub fn move_to(&self, position: Position) {
        *self.position.lock().unwrap() = position;
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn transfers(&self) -> Vec<String> {
        self.transfers.lock().unwrap().clone()
    }
}

impl OnlineUser for TestUser {
    fn user(&self) -> &User {
        &self.user
    }

    fn position(&self) -> Position {
        self.position.lock().unwrap().clone()
    }

    fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn connect_to(&self, server: &str) {
        self.transfers.lock().unwrap().push(server.to_string());
    }
}

/// A map hook that records marker calls as readable event strings.
#[derive(Default)]
pub(crate) struct RecordingMapHook {
    events: Mutex<Vec<String>>,
}

impl RecordingMapHook {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl MapHook for RecordingMapHook {
    fn set_claim_marker(&self, claim: &TownClaim, world: &World) {
        self.events
            .lock()
            .unwrap()
            .push(format!("set {} in {}", claim.claim.chunk, world.name));
    }

    fn remove_claim_marker(&self, claim: &TownClaim, world: &World) {
        self.events
            .lock()
            .unwrap()
            .push(format!("remove {} in {}", claim.claim.chunk, world.name));
    }

    fn remove_town_markers(&self, town: &Town) {
        self.events
            .lock()
            .unwrap()
            .push(format!("remove_town {}", town.name()));
    }

    fn clear_all_markers(&self) {
        self.events.lock().unwrap().push("clear_all".to_string());
    }
}

/// A broker that records sent messages instead of publishing them, noting
/// what the store held at the moment of each send. Lets tests pin the
/// persist-before-broadcast ordering.
pub(crate) struct RecordingBroker {
    node: Arc<Dominion>,
    sent: Mutex<Vec<Message>>,
    store_names_at_send: Mutex<Vec<Option<String>>>,
}

impl RecordingBroker {
    pub fn new(node: Arc<Dominion>) -> Arc<Self> {
        Arc::new(Self {
            node,
            sent: Mutex::new(Vec::new()),
            store_names_at_send: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// For each send carrying a town id, the name the store returned for
    /// that town at send time.
    pub fn store_names_at_send(&self) -> Vec<Option<String>> {
        self.store_names_at_send.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    fn node(&self) -> &Arc<Dominion> {
        &self.node
    }

    async fn initialize(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn publish(&self, _frame: Vec<u8>) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn send(
        &self,
        mut message: Message,
        sender: &dyn OnlineUser,
    ) -> Result<(), BrokerError> {
        message.source_server = self.node.server_name().to_string();
        message.sender = sender.name().to_string();
        if let Some(id) = message.payload.as_town_id() {
            let name = self
                .node
                .database()
                .get_town(id)
                .await
                .ok()
                .flatten()
                .map(|town| town.name().to_string());
            self.store_names_at_send.lock().unwrap().push(name);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) {}
}

/// Settings for an in-process test node.
pub(crate) fn test_settings(server: &str) -> Settings {
    let mut settings = Settings::default();
    settings.server.name = server.to_string();
    settings.cluster.id = "test".to_string();
    settings
}

/// A node backed by a fresh in-memory store. The concrete store handle is
/// returned alongside so tests can seed users directly.
pub(crate) fn test_node(server: &str) -> (Arc<Dominion>, Arc<MemoryDatabase>) {
    let database = Arc::new(MemoryDatabase::new());
    let node = Dominion::new(
        test_settings(server),
        Locales::default(),
        database.clone() as Arc<dyn Database>,
    );
    (node, database)
}
