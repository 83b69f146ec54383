//! Room-level settings and user profiles

use serde_json::Value;

use super::string_field;
use crate::store::{Document, Fields};

/// Field holding the active-turn pointer
pub const ACTIVE_TURN_FIELD: &str = "tour_joueur";

/// `cartes/{room}/settings/general`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSettings {
    /// Id of the combatant whose turn it is
    pub active_turn: Option<String>,
}

impl RoomSettings {
    pub fn from_document(doc: Option<&Document>) -> Self {
        Self {
            active_turn: doc.and_then(|d| string_field(d.get(ACTIVE_TURN_FIELD))),
        }
    }

    /// Partial update moving the active-turn pointer
    pub fn active_turn_fields(id: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(ACTIVE_TURN_FIELD.to_string(), Value::from(id));
        fields
    }
}

/// `users/{uid}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub room_id: Option<String>,
}

impl UserProfile {
    pub fn from_document(doc: &Document) -> Self {
        // Older profiles store the room as a number
        let room_id = match doc.get("room_id") {
            Some(Value::Number(n)) => Some(n.to_string()),
            other => string_field(other),
        };
        Self { room_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocPath;
    use serde_json::json;

    fn document(path: &str, value: serde_json::Value) -> Document {
        Document::new(
            DocPath::parse(path).unwrap(),
            value.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn test_settings() {
        let doc = document("cartes/r1/settings/general", json!({"tour_joueur": "c2"}));
        assert_eq!(
            RoomSettings::from_document(Some(&doc)).active_turn.as_deref(),
            Some("c2")
        );
        assert_eq!(RoomSettings::from_document(None), RoomSettings::default());

        let empty = document("cartes/r1/settings/general", json!({"tour_joueur": ""}));
        assert!(RoomSettings::from_document(Some(&empty)).active_turn.is_none());
    }

    #[test]
    fn test_active_turn_fields() {
        let fields = RoomSettings::active_turn_fields("c3");
        assert_eq!(fields["tour_joueur"], json!("c3"));
    }

    #[test]
    fn test_user_profile_room() {
        let doc = document("users/u1", json!({"room_id": "r1"}));
        assert_eq!(UserProfile::from_document(&doc).room_id.as_deref(), Some("r1"));

        let numeric = document("users/u2", json!({"room_id": 42}));
        assert_eq!(UserProfile::from_document(&numeric).room_id.as_deref(), Some("42"));

        let none = document("users/u3", json!({}));
        assert!(UserProfile::from_document(&none).room_id.is_none());
    }
}
