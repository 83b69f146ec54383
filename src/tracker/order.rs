//! Turn order rules
//!
//! Pure list operations over combatants; the session decides when to apply
//! them and what to persist.

use crate::dice::{DiceRoll, DiceSource};
use crate::schema::Combatant;
use crate::store::Document;

/// Sort descending by current initiative; ties keep their relative order
pub fn sort_by_initiative(order: &mut [Combatant]) {
    order.sort_by(|a, b| b.current_init.cmp(&a.current_init));
}

/// Move the active combatant to the front, leaving the others in place
///
/// Does nothing when there is no active id or it is not in the list.
pub fn promote_active(order: &mut Vec<Combatant>, active: Option<&str>) {
    let Some(active) = active else {
        return;
    };
    if let Some(index) = order.iter().position(|c| c.id == active) {
        if index > 0 {
            let combatant = order.remove(index);
            order.insert(0, combatant);
        }
    }
}

/// Build the turn order from a characters snapshot
pub fn build_order(docs: &[Document], active: Option<&str>) -> Vec<Combatant> {
    let mut order: Vec<Combatant> = docs.iter().map(Combatant::from_document).collect();
    sort_by_initiative(&mut order);
    promote_active(&mut order, active);
    order
}

/// Breakdown shown next to a combatant, e.g. `2+10=12`
pub fn initiative_details(modifier: i64, roll: i64, total: i64) -> String {
    format!("{}+{}={}", modifier, roll, total)
}

/// Roll initiative for everyone and return the new order
///
/// Each combatant rolls the initiative die and adds its `INIT` modifier.
/// The result is sorted by total; the active pointer is not consulted, the
/// top roller goes first.
pub fn roll_initiative(
    combatants: &[Combatant],
    die: &DiceRoll,
    dice: &dyn DiceSource,
) -> Vec<Combatant> {
    let mut rolled: Vec<Combatant> = combatants
        .iter()
        .map(|c| {
            let roll = die.roll_with(dice).total;
            let total = c.init_modifier.saturating_add(roll);
            Combatant {
                current_init: total,
                init_details: Some(initiative_details(c.init_modifier, roll, total)),
                ..c.clone()
            }
        })
        .collect();
    sort_by_initiative(&mut rolled);
    rolled
}

/// Move `id` to the back of the order; returns false if it is not present
pub fn send_to_back(order: &mut Vec<Combatant>, id: &str) -> bool {
    match order.iter().position(|c| c.id == id) {
        Some(index) => {
            let combatant = order.remove(index);
            order.push(combatant);
            true
        }
        None => false,
    }
}
