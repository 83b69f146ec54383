//! Common test utilities - DeskTest fixture for seeding a room

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gmdesk::dice::{DiceRoll, ScriptedDice};
use gmdesk::room::Room;
use gmdesk::sheet::SheetSession;
use gmdesk::store::{
    CollectionPath, DocPath, Document, DocumentGateway, Fields, MemoryGateway, SqliteGateway,
};
use gmdesk::tracker::TurnTracker;
use serde_json::Value;

pub const ROOM: &str = "r1";

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("fields must be a JSON object")
}

/// A room in a fresh store, with scripted dice
pub struct DeskTest {
    pub gateway: Arc<dyn DocumentGateway>,
    /// Set when backed by memory, for fault injection
    pub memory: Option<Arc<MemoryGateway>>,
    pub room: Room,
    pub dice: Arc<ScriptedDice>,
}

impl DeskTest {
    pub fn memory() -> Self {
        Self::memory_with_dice(ScriptedDice::fixed(10))
    }

    pub fn memory_with_dice(dice: ScriptedDice) -> Self {
        let memory = Arc::new(MemoryGateway::new());
        Self {
            gateway: memory.clone(),
            memory: Some(memory),
            room: Room::new(ROOM).unwrap(),
            dice: Arc::new(dice),
        }
    }

    pub async fn sqlite(path: &str, dice: ScriptedDice) -> Self {
        let gateway = SqliteGateway::open(Some(path))
            .await
            .expect("Failed to open database");
        Self {
            gateway: Arc::new(gateway),
            memory: None,
            room: Room::new(ROOM).unwrap(),
            dice: Arc::new(dice),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.memory
            .as_ref()
            .expect("fault injection needs the memory gateway")
            .fail_writes(fail);
    }

    pub fn fail_reads(&self, collection: Option<CollectionPath>) {
        self.memory
            .as_ref()
            .expect("fault injection needs the memory gateway")
            .fail_reads(collection);
    }

    pub async fn character(&self, id: &str, value: Value) {
        self.gateway
            .set(&self.room.character(id).unwrap(), fields(value))
            .await
            .expect("Failed to seed character");
    }

    pub async fn report(&self, attacker: &str, id: &str, value: Value) -> DocPath {
        let path = self.room.reports(attacker).unwrap().doc(id).unwrap();
        self.gateway
            .set(&path, fields(value))
            .await
            .expect("Failed to seed report");
        path
    }

    pub async fn bonus(&self, character_name: &str, id: &str, value: Value) -> DocPath {
        let path = self.room.bonuses(character_name).unwrap().doc(id).unwrap();
        self.gateway
            .set(&path, fields(value))
            .await
            .expect("Failed to seed bonus");
        path
    }

    pub async fn active_turn(&self, id: &str) {
        self.gateway
            .set(
                self.room.settings(),
                fields(serde_json::json!({ "tour_joueur": id })),
            )
            .await
            .expect("Failed to seed settings");
    }

    pub async fn user(&self, uid: &str) {
        let path = CollectionPath::parse("users").unwrap().doc(uid).unwrap();
        self.gateway
            .set(&path, fields(serde_json::json!({ "room_id": ROOM })))
            .await
            .expect("Failed to seed user");
    }

    pub async fn doc(&self, path: &DocPath) -> Option<Document> {
        self.gateway.get(path).await.expect("Failed to read document")
    }

    pub async fn field(&self, path: &DocPath, key: &str) -> Option<Value> {
        self.doc(path).await.and_then(|d| d.get(key).cloned())
    }

    pub async fn tracker(&self) -> TurnTracker {
        TurnTracker::open(
            self.gateway.clone(),
            self.room.clone(),
            self.dice.clone(),
            DiceRoll::d20(),
        )
        .await
        .expect("Failed to open tracker")
    }

    pub async fn sheet(&self) -> SheetSession {
        SheetSession::open(
            self.gateway.clone(),
            self.room.clone(),
            self.dice.clone(),
            DiceRoll::d8(),
        )
        .await
        .expect("Failed to open sheet")
    }
}

/// Await a future that should resolve promptly
pub async fn soon<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out waiting for a change")
}
