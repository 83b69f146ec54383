//! Level-up hit point roll

use super::ability_modifier;
use crate::dice::{DiceRoll, DiceSource};

/// A rolled but not yet confirmed level-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUpRoll {
    /// Raw die result
    pub roll: i64,
    /// Constitution modifier added to the roll
    pub con_modifier: i64,
    /// Change to maximum hit points
    pub increase: i64,
}

impl LevelUpRoll {
    /// Maximum (and current) hit points once confirmed
    pub fn new_max(&self, old_max: i64) -> i64 {
        old_max.saturating_add(self.increase)
    }
}

/// Roll the hit die and add the constitution modifier
///
/// `con_base` is the stored constitution score; active bonuses do not apply.
pub fn roll_level_up(con_base: i64, die: &DiceRoll, dice: &dyn DiceSource) -> LevelUpRoll {
    let roll = die.roll_with(dice).total;
    let con_modifier = ability_modifier(con_base);
    LevelUpRoll {
        roll,
        con_modifier,
        increase: roll.saturating_add(con_modifier),
    }
}
