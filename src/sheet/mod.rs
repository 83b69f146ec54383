//! Player character sheet
//!
//! - Displayed stats: stored base value plus active bonuses
//! - Ability modifiers
//! - Edit form for the stored values
//! - Level-up roll with a separate confirmation step
//! - Racial abilities lookup

mod ability;
mod bonus;
mod form;
mod level;
mod races;
mod session;

pub use ability::{ability_modifier, format_modifier};
pub use bonus::BonusSet;
pub use form::EditForm;
pub use level::{roll_level_up, LevelUpRoll};
pub use races::{CatalogError, RaceCatalog, NO_ABILITIES, NO_RACE};
pub use session::{AbilityScore, SheetEvent, SheetSession};

use thiserror::Error;

use crate::store::{GatewayError, PathError};

/// Character sheet errors
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("no character selected")]
    NoSelection,

    #[error("no player character with id {0}")]
    UnknownCharacter(String),

    #[error("roll the level-up die before confirming")]
    NoPendingRoll,

    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("persistence failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
