//! Character documents, seen as combatants or as full sheets

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::{int_field, string_field, Stat, UNKNOWN_NAME};
use crate::store::{Document, Fields};

/// Stored `type` value marking a player character
pub const PLAYER_TYPE: &str = "joueurs";

/// Stored `type` value for everything else
pub const NON_PLAYER_TYPE: &str = "pnj";

/// Who controls a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    Player,
    #[default]
    NonPlayer,
}

impl Category {
    fn from_field(value: Option<&Value>) -> Self {
        match value.and_then(|v| v.as_str()) {
            Some(PLAYER_TYPE) => Category::Player,
            _ => Category::NonPlayer,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Player => f.write_str(PLAYER_TYPE),
            Category::NonPlayer => f.write_str(NON_PLAYER_TYPE),
        }
    }
}

/// Avatar shown for characters without an image
pub fn placeholder_avatar(name: Option<&str>) -> String {
    let initial = name
        .and_then(|n| n.chars().next())
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!("/placeholder.svg?height=40&width=40&text={}", initial)
}

/// A participant in the turn tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Current hit points
    pub hp: i64,
    /// Base initiative modifier (`INIT`)
    pub init_modifier: i64,
    /// Last rolled initiative total (`currentInit`)
    pub current_init: i64,
    /// Human-readable breakdown of the last roll, e.g. `2+10=12`
    pub init_details: Option<String>,
    pub category: Category,
}

impl Combatant {
    pub fn from_document(doc: &Document) -> Self {
        let name = string_field(doc.get("Nomperso"));
        let avatar =
            string_field(doc.get("imageURL")).unwrap_or_else(|| placeholder_avatar(name.as_deref()));

        Self {
            id: doc.id().to_string(),
            name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            avatar,
            hp: int_field(doc.get(Stat::Pv.field())),
            init_modifier: int_field(doc.get(Stat::Init.field())),
            current_init: int_field(doc.get("currentInit")),
            init_details: string_field(doc.get("initDetails")),
            category: Category::from_field(doc.get("type")),
        }
    }
}

/// Full character sheet as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub id: String,
    /// Display name; bonus collections are keyed by it
    pub name: String,
    pub level: Option<i64>,
    pub profile: Option<String>,
    pub race: Option<String>,
    /// Height in centimeters
    pub height: Option<i64>,
    /// Weight in kilograms
    pub weight: Option<i64>,
    pub image_url: Option<String>,
    pub category: Category,
    stats: BTreeMap<Stat, i64>,
}

impl CharacterRecord {
    pub fn from_document(doc: &Document) -> Self {
        let optional_int = |key: &str| doc.get(key).map(|v| int_field(Some(v)));

        let stats = Stat::EDITABLE
            .iter()
            .map(|stat| (*stat, int_field(doc.get(stat.field()))))
            .collect();

        Self {
            id: doc.id().to_string(),
            name: string_field(doc.get("Nomperso")).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            level: optional_int("niveau"),
            profile: string_field(doc.get("Profile")),
            race: string_field(doc.get("Race")),
            height: optional_int("Taille"),
            weight: optional_int("Poids"),
            image_url: string_field(doc.get("imageURL")),
            category: Category::from_field(doc.get("type")),
            stats,
        }
    }

    /// Stored (base) value of a stat, missing = 0
    pub fn stat(&self, stat: Stat) -> i64 {
        self.stats.get(&stat).copied().unwrap_or(0)
    }

    pub fn set_stat(&mut self, stat: Stat, value: i64) {
        self.stats.insert(stat, value);
    }

    pub fn is_player(&self) -> bool {
        self.category == Category::Player
    }

    /// Fields for a partial update of the given stats
    pub fn stat_fields(&self, stats: &[Stat]) -> Fields {
        stats
            .iter()
            .map(|stat| (stat.field().to_string(), Value::from(self.stat(*stat))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocPath;
    use serde_json::json;

    fn document(id: &str, value: serde_json::Value) -> Document {
        Document::new(
            DocPath::parse(&format!("cartes/r1/characters/{}", id)).unwrap(),
            value.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn test_combatant_full_document() {
        let doc = document(
            "c1",
            json!({
                "Nomperso": "Aria",
                "imageURL": "https://img/aria.png",
                "PV": 18,
                "INIT": "3",
                "currentInit": 14,
                "initDetails": "3+11=14",
                "type": "joueurs"
            }),
        );

        let c = Combatant::from_document(&doc);
        assert_eq!(c.id, "c1");
        assert_eq!(c.name, "Aria");
        assert_eq!(c.avatar, "https://img/aria.png");
        assert_eq!(c.hp, 18);
        assert_eq!(c.init_modifier, 3);
        assert_eq!(c.current_init, 14);
        assert_eq!(c.init_details.as_deref(), Some("3+11=14"));
        assert_eq!(c.category, Category::Player);
    }

    #[test]
    fn test_combatant_defaults() {
        let c = Combatant::from_document(&document("x", json!({"PV": "absent"})));
        assert_eq!(c.name, UNKNOWN_NAME);
        assert_eq!(c.avatar, "/placeholder.svg?height=40&width=40&text=?");
        assert_eq!(c.hp, 0);
        assert_eq!(c.init_modifier, 0);
        assert_eq!(c.current_init, 0);
        assert!(c.init_details.is_none());
        assert_eq!(c.category, Category::NonPlayer);
    }

    #[test]
    fn test_placeholder_uses_initial() {
        let c = Combatant::from_document(&document("g", json!({"Nomperso": "Gobelin"})));
        assert_eq!(c.avatar, "/placeholder.svg?height=40&width=40&text=G");
    }

    #[test]
    fn test_character_record() {
        let doc = document(
            "c1",
            json!({
                "Nomperso": "Aria",
                "niveau": 3,
                "Race": "Elfe",
                "Taille": 172,
                "CON": "14",
                "PV": 20,
                "PV_Max": 24,
                "type": "joueurs"
            }),
        );

        let record = CharacterRecord::from_document(&doc);
        assert_eq!(record.name, "Aria");
        assert_eq!(record.level, Some(3));
        assert_eq!(record.race.as_deref(), Some("Elfe"));
        assert_eq!(record.height, Some(172));
        assert!(record.weight.is_none());
        assert_eq!(record.stat(Stat::Con), 14);
        assert_eq!(record.stat(Stat::PvMax), 24);
        assert_eq!(record.stat(Stat::Dex), 0);
        assert!(record.is_player());
    }

    #[test]
    fn test_stat_fields() {
        let mut record = CharacterRecord::from_document(&document("c1", json!({})));
        record.set_stat(Stat::Pv, 9);
        record.set_stat(Stat::PvMax, 9);

        let fields = record.stat_fields(&[Stat::Pv, Stat::PvMax]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["PV"], json!(9));
        assert_eq!(fields["PV_Max"], json!(9));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Player.to_string(), "joueurs");
        assert_eq!(Category::NonPlayer.to_string(), "pnj");
    }
}
