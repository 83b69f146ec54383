//! Rooms and where their documents live
//!
//! Layout of a room `r`:
//! - `cartes/r/characters/{id}` - character documents
//! - `cartes/r/settings/general` - room settings (active-turn pointer)
//! - `cartes/r/combat/{attacker}/rapport/{id}` - pending attack reports
//! - `Bonus/r/{character name}/{id}` - bonus records

use thiserror::Error;
use tracing::debug;

use crate::schema::UserProfile;
use crate::store::{CollectionPath, DocPath, DocumentGateway, GatewayError, PathError};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user {0} has not joined a room")]
    NoRoom(String),

    #[error("invalid room path: {0}")]
    Path(#[from] PathError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A game room (map) and its document paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: String,
    root: DocPath,
    characters: CollectionPath,
    settings: DocPath,
}

impl Room {
    pub fn new(id: &str) -> Result<Self, PathError> {
        let root = CollectionPath::parse("cartes")?.doc(id)?;
        let characters = root.collection("characters")?;
        let settings = root.collection("settings")?.doc("general")?;
        Ok(Self {
            id: id.to_string(),
            root,
            characters,
            settings,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn characters(&self) -> &CollectionPath {
        &self.characters
    }

    pub fn character(&self, id: &str) -> Result<DocPath, PathError> {
        self.characters.doc(id)
    }

    pub fn settings(&self) -> &DocPath {
        &self.settings
    }

    /// Attack reports filed by one attacker
    pub fn reports(&self, attacker_id: &str) -> Result<CollectionPath, PathError> {
        self.root
            .collection("combat")?
            .doc(attacker_id)?
            .collection("rapport")
    }

    /// Bonus records of one character, keyed by display name
    pub fn bonuses(&self, character_name: &str) -> Result<CollectionPath, PathError> {
        CollectionPath::parse("Bonus")?
            .doc(&self.id)?
            .collection(character_name)
    }
}

/// Look up the room a user has joined (`users/{uid}.room_id`)
pub async fn resolve_room(gateway: &dyn DocumentGateway, uid: &str) -> Result<Room, RoomError> {
    let path = CollectionPath::parse("users")?.doc(uid)?;
    let doc = gateway
        .get(&path)
        .await?
        .ok_or_else(|| RoomError::UserNotFound(uid.to_string()))?;

    let room_id = UserProfile::from_document(&doc)
        .room_id
        .ok_or_else(|| RoomError::NoRoom(uid.to_string()))?;

    debug!("User {} is in room {}", uid, room_id);
    Ok(Room::new(&room_id)?)
}
