//! Character statistics and their stored field names

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A numeric statistic on a character document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stat {
    /// Strength
    For,
    /// Dexterity
    Dex,
    /// Constitution
    Con,
    /// Intelligence
    Int,
    /// Wisdom
    Sag,
    /// Charisma
    Cha,
    /// Initiative modifier
    Init,
    /// Current hit points
    Pv,
    /// Maximum hit points
    PvMax,
    Defense,
    /// Melee attack
    Contact,
    /// Magic attack
    Magie,
    /// Ranged attack
    Distance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stat: {0}")]
pub struct UnknownStat(pub String);

impl Stat {
    /// The six ability scores, in sheet order
    pub const ABILITIES: [Stat; 6] = [Stat::For, Stat::Dex, Stat::Con, Stat::Int, Stat::Sag, Stat::Cha];

    /// Stats that bonus records can modify (maximum hit points cannot)
    pub const BONUSABLE: [Stat; 12] = [
        Stat::Cha,
        Stat::Con,
        Stat::Contact,
        Stat::Dex,
        Stat::Defense,
        Stat::Distance,
        Stat::For,
        Stat::Init,
        Stat::Int,
        Stat::Magie,
        Stat::Pv,
        Stat::Sag,
    ];

    /// Fields offered by the edit form, in form order
    pub const EDITABLE: [Stat; 13] = [
        Stat::Pv,
        Stat::PvMax,
        Stat::Defense,
        Stat::Contact,
        Stat::Magie,
        Stat::Distance,
        Stat::Init,
        Stat::For,
        Stat::Dex,
        Stat::Con,
        Stat::Sag,
        Stat::Int,
        Stat::Cha,
    ];

    /// Field name in stored documents
    pub fn field(&self) -> &'static str {
        match self {
            Stat::For => "FOR",
            Stat::Dex => "DEX",
            Stat::Con => "CON",
            Stat::Int => "INT",
            Stat::Sag => "SAG",
            Stat::Cha => "CHA",
            Stat::Init => "INIT",
            Stat::Pv => "PV",
            Stat::PvMax => "PV_Max",
            Stat::Defense => "Defense",
            Stat::Contact => "Contact",
            Stat::Magie => "Magie",
            Stat::Distance => "Distance",
        }
    }

    pub fn is_ability(&self) -> bool {
        Self::ABILITIES.contains(self)
    }

    pub fn is_bonusable(&self) -> bool {
        *self != Stat::PvMax
    }
}

impl FromStr for Stat {
    type Err = UnknownStat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "for" | "str" => Ok(Stat::For),
            "dex" => Ok(Stat::Dex),
            "con" => Ok(Stat::Con),
            "int" => Ok(Stat::Int),
            "sag" | "wis" => Ok(Stat::Sag),
            "cha" => Ok(Stat::Cha),
            "init" => Ok(Stat::Init),
            "pv" | "hp" => Ok(Stat::Pv),
            "pv_max" | "pvmax" | "hp_max" => Ok(Stat::PvMax),
            "defense" | "def" => Ok(Stat::Defense),
            "contact" => Ok(Stat::Contact),
            "magie" => Ok(Stat::Magie),
            "distance" => Ok(Stat::Distance),
            _ => Err(UnknownStat(s.to_string())),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}
