//! Pending attack reports
//!
//! Reports are written by the combat-resolution flow under
//! `cartes/{room}/combat/{attacker}/rapport/{report}` and consumed here once
//! damage is applied or the attacker's turn ends.

use super::{int_field, string_field, truthy, UNKNOWN_NAME};
use crate::store::{DocPath, Document};

/// A resolved attack waiting for the game master
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub id: String,
    /// Where the report is stored, for deletion
    pub path: DocPath,
    /// Display name of the target (`cible_nom`)
    pub target_name: String,
    /// Attack roll total (`attaque_result`)
    pub attack_roll: i64,
    /// Weapon used (`arme_utilisée`)
    pub weapon: String,
    /// Whether the attack landed (`réussite`)
    pub success: bool,
    pub kind: String,
    /// Rolled damage (`degat_result`)
    pub damage: i64,
    /// Attacker character id (`attaquant`)
    pub attacker: String,
    /// Target character id (`cible`)
    pub target: String,
}

impl AttackReport {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id().to_string(),
            path: doc.path.clone(),
            target_name: string_field(doc.get("cible_nom"))
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            attack_roll: int_field(doc.get("attaque_result")),
            weapon: string_field(doc.get("arme_utilisée"))
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            success: truthy(doc.get("réussite")),
            kind: string_field(doc.get("type")).unwrap_or_else(|| "N/A".to_string()),
            damage: int_field(doc.get("degat_result")),
            attacker: string_field(doc.get("attaquant")).unwrap_or_default(),
            target: string_field(doc.get("cible")).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> Document {
        Document::new(
            DocPath::parse("cartes/r1/combat/a/rapport/rep1").unwrap(),
            value.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn test_full_report() {
        let report = AttackReport::from_document(&document(json!({
            "cible_nom": "Gobelin",
            "attaque_result": 17,
            "arme_utilisée": "Épée longue",
            "réussite": true,
            "type": "Contact",
            "degat_result": 6,
            "attaquant": "a",
            "cible": "g"
        })));

        assert_eq!(report.id, "rep1");
        assert_eq!(report.target_name, "Gobelin");
        assert_eq!(report.attack_roll, 17);
        assert_eq!(report.weapon, "Épée longue");
        assert!(report.success);
        assert_eq!(report.kind, "Contact");
        assert_eq!(report.damage, 6);
        assert_eq!(report.attacker, "a");
        assert_eq!(report.target, "g");
    }

    #[test]
    fn test_report_defaults() {
        let report = AttackReport::from_document(&document(json!({})));
        assert_eq!(report.target_name, UNKNOWN_NAME);
        assert_eq!(report.weapon, UNKNOWN_NAME);
        assert_eq!(report.kind, "N/A");
        assert_eq!(report.damage, 0);
        assert!(!report.success);
        assert!(report.attacker.is_empty());
        assert!(report.target.is_empty());
    }
}
