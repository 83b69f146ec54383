//! Combat dashboard
//!
//! Implements the game master's turn tracker:
//! - Initiative rolls and descending turn order
//! - Turn rotation with an active-turn pointer persisted per room
//! - Hit point adjustment and attack report damage
//! - Live refresh from character and report subscriptions

mod hp;
mod order;
mod session;

pub use hp::adjust_hp;
pub use order::{
    build_order, initiative_details, promote_active, roll_initiative, send_to_back,
    sort_by_initiative,
};
pub use session::{TrackerEvent, TurnTracker};

use thiserror::Error;

use crate::store::{GatewayError, PathError};

/// Turn tracker errors
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("need at least {needed} combatants, have {have}")]
    TooFewCombatants { needed: usize, have: usize },

    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("persistence failed: {0}")]
    Gateway(#[from] GatewayError),
}
