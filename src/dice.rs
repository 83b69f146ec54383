//! Dice rolling
//!
//! Parses and rolls dice notation like "1d20", "1d8", "2d6+3". Rolls go
//! through a [`DiceSource`] so tests can script exact results.

use std::collections::VecDeque;
use std::str::FromStr;

use parking_lot::Mutex;
use rand::Rng;

/// Source of single die results
pub trait DiceSource: Send + Sync {
    /// Roll one die, returning a value in `1..=sides`
    fn roll_die(&self, sides: u32) -> u32;
}

/// Thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDice;

impl DiceSource for SystemDice {
    fn roll_die(&self, sides: u32) -> u32 {
        rand::rng().random_range(1..=sides.max(1))
    }
}

/// Replays a fixed sequence of results, then keeps returning the fallback
///
/// Results are clamped into `1..=sides` of the die being rolled.
#[derive(Debug)]
pub struct ScriptedDice {
    rolls: Mutex<VecDeque<u32>>,
    fallback: u32,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
            fallback: 1,
        }
    }

    /// Always roll the same value
    pub fn fixed(value: u32) -> Self {
        Self {
            rolls: Mutex::new(VecDeque::new()),
            fallback: value,
        }
    }

    /// Results not consumed yet
    pub fn remaining(&self) -> usize {
        self.rolls.lock().len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&self, sides: u32) -> u32 {
        let next = self.rolls.lock().pop_front().unwrap_or(self.fallback);
        next.clamp(1, sides.max(1))
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

/// Result of rolling a [`DiceRoll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    /// Individual die results
    pub dice: Vec<u32>,
    /// Sum of dice plus the notation modifier
    pub total: i64,
}

impl DiceRoll {
    /// Create a new dice roll
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// A single d20, used for initiative
    pub fn d20() -> Self {
        Self::new(1, 20, 0)
    }

    /// A single d8, used for level-up hit points
    pub fn d8() -> Self {
        Self::new(1, 8, 0)
    }

    /// Roll against a dice source
    pub fn roll_with(&self, source: &dyn DiceSource) -> RollOutcome {
        let dice: Vec<u32> = (0..self.count)
            .map(|_| source.roll_die(self.sides))
            .collect();
        let sum: i64 = dice.iter().map(|d| i64::from(*d)).sum();

        RollOutcome {
            dice,
            total: sum + i64::from(self.modifier),
        }
    }

    /// Roll with the system RNG and return the total
    pub fn roll(&self) -> i64 {
        self.roll_with(&SystemDice).total
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i64 {
        i64::from(self.count) + i64::from(self.modifier)
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i64 {
        i64::from(self.count) * i64::from(self.sides) + i64::from(self.modifier)
    }
}

impl FromStr for DiceRoll {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, String> {
    let notation = notation.trim().to_lowercase();

    let d_pos = notation.find('d').ok_or("Missing 'd' in dice notation")?;

    // "d8" means "1d8"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| format!("Invalid dice count: {}", count_str))?
    };

    if count == 0 {
        return Err("Dice count must be at least 1".to_string());
    }

    let rest = &notation[d_pos + 1..];

    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| format!("Invalid modifier: {}", mod_str))?;
        (&rest[..plus_pos], modifier)
    } else if let Some(minus_pos) = rest.rfind('-').filter(|pos| *pos > 0) {
        // Keep the minus sign with the modifier
        let mod_str = &rest[minus_pos..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| format!("Invalid modifier: {}", mod_str))?;
        (&rest[..minus_pos], modifier)
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| format!("Invalid die sides: {}", sides_str))?;

    if sides == 0 {
        return Err("Die sides must be at least 1".to_string());
    }

    Ok(DiceRoll {
        count,
        sides,
        modifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let roll = parse_dice("1d20").unwrap();
        assert_eq!(roll, DiceRoll::d20());
    }

    #[test]
    fn test_parse_with_modifiers() {
        assert_eq!(parse_dice("1d20+5").unwrap(), DiceRoll::new(1, 20, 5));
        assert_eq!(parse_dice("3d8-2").unwrap(), DiceRoll::new(3, 8, -2));
    }

    #[test]
    fn test_parse_implicit_one_and_whitespace() {
        assert_eq!(parse_dice("  D8 ").unwrap(), DiceRoll::d8());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_dice("abc").is_err());
        assert!(parse_dice("2d").is_err());
        assert!(parse_dice("d").is_err());
        assert!(parse_dice("0d6").is_err());
        assert!(parse_dice("2d0").is_err());
        assert!(parse_dice("1d6+x").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceRoll::new(2, 6, 0).to_string(), "2d6");
        assert_eq!(DiceRoll::new(1, 20, 5).to_string(), "1d20+5");
        assert_eq!(DiceRoll::new(3, 8, -2).to_string(), "3d8-2");
    }

    #[test]
    fn test_system_dice_bounds() {
        let roll = DiceRoll::d20();
        for _ in 0..200 {
            let result = roll.roll();
            assert!((roll.min()..=roll.max()).contains(&result), "{} out of range", result);
        }
    }

    #[test]
    fn test_scripted_dice() {
        let dice = ScriptedDice::new([10, 3]);
        assert_eq!(DiceRoll::d20().roll_with(&dice).total, 10);
        assert_eq!(dice.remaining(), 1);

        let outcome = DiceRoll::new(1, 20, 2).roll_with(&dice);
        assert_eq!(outcome.dice, vec![3]);
        assert_eq!(outcome.total, 5);

        // Exhausted: fallback of 1
        assert_eq!(DiceRoll::d20().roll_with(&dice).total, 1);
    }

    #[test]
    fn test_scripted_dice_clamps_to_die() {
        let dice = ScriptedDice::new([25, 0]);
        assert_eq!(DiceRoll::d8().roll_with(&dice).total, 8);
        assert_eq!(DiceRoll::d8().roll_with(&dice).total, 1);
    }

    #[test]
    fn test_fixed_dice() {
        let dice = ScriptedDice::fixed(5);
        let outcome = DiceRoll::new(3, 6, 0).roll_with(&dice);
        assert_eq!(outcome.dice, vec![5, 5, 5]);
        assert_eq!(outcome.total, 15);
    }
}
