//! gmdesk - game master's desk
//!
//! Combat dashboard and character sheet for a tabletop RPG room, over a
//! document store.

pub mod dice;
pub mod room;
pub mod schema;
pub mod sheet;
pub mod store;
pub mod tracker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use dice::{DiceRoll, DiceSource, SystemDice};
use room::{resolve_room, RoomError};
use sheet::{RaceCatalog, SheetError, SheetSession};
use store::{DocumentGateway, GatewayError, SqliteGateway};
use tracker::{TrackerError, TurnTracker};

/// State before and after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

impl<T> Change<T> {
    pub fn new(before: T, after: T) -> Self {
        Self { before, after }
    }
}

impl<T: PartialEq> Change<T> {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid dice notation for {field}: {reason}")]
    Dice { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Desk configuration
///
/// Layered: defaults, then an optional TOML file, then `GMDESK_*`
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// SQLite database file; None = in-memory
    pub db_path: Option<String>,
    pub initiative_die: String,
    pub level_up_die: String,
    /// Racial abilities catalog (JSON)
    pub races_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            initiative_die: "1d20".to_string(),
            level_up_die: "1d8".to_string(),
            races_path: None,
        }
    }
}

impl Config {
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed("GMDESK_"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(file).extract()?;
        config.initiative_roll()?;
        config.level_up_roll()?;
        Ok(config)
    }

    pub fn initiative_roll(&self) -> Result<DiceRoll, ConfigError> {
        dice::parse_dice(&self.initiative_die).map_err(|reason| ConfigError::Dice {
            field: "initiative_die",
            reason,
        })
    }

    pub fn level_up_roll(&self) -> Result<DiceRoll, ConfigError> {
        dice::parse_dice(&self.level_up_die).map_err(|reason| ConfigError::Dice {
            field: "level_up_die",
            reason,
        })
    }
}

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Opens sessions for users against one store
pub struct Desk {
    config: Config,
    gateway: Arc<dyn DocumentGateway>,
    dice: Arc<dyn DiceSource>,
}

impl Desk {
    /// Open the configured SQLite store with system dice
    pub async fn open(config: Config) -> Result<Self, DeskError> {
        let gateway = SqliteGateway::open(config.db_path.as_deref()).await?;
        info!(
            "gmdesk using {}",
            config.db_path.as_deref().unwrap_or("in-memory database")
        );
        Self::with_gateway(config, Arc::new(gateway), Arc::new(SystemDice))
    }

    pub fn with_gateway(
        config: Config,
        gateway: Arc<dyn DocumentGateway>,
        dice: Arc<dyn DiceSource>,
    ) -> Result<Self, DeskError> {
        config.initiative_roll()?;
        config.level_up_roll()?;
        Ok(Self {
            config,
            gateway,
            dice,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> Arc<dyn DocumentGateway> {
        self.gateway.clone()
    }

    /// Combat dashboard for the room `uid` has joined
    pub async fn tracker(&self, uid: &str) -> Result<TurnTracker, DeskError> {
        let room = resolve_room(self.gateway.as_ref(), uid).await?;
        let tracker = TurnTracker::open(
            self.gateway.clone(),
            room,
            self.dice.clone(),
            self.config.initiative_roll()?,
        )
        .await?;
        Ok(tracker)
    }

    /// Character sheet for the room `uid` has joined
    pub async fn sheet(&self, uid: &str) -> Result<SheetSession, DeskError> {
        let room = resolve_room(self.gateway.as_ref(), uid).await?;
        let sheet = SheetSession::open(
            self.gateway.clone(),
            room,
            self.dice.clone(),
            self.config.level_up_roll()?,
        )
        .await?;
        Ok(sheet)
    }

    /// Racial abilities catalog, empty when none is configured
    pub fn races(&self) -> Result<RaceCatalog, DeskError> {
        match &self.config.races_path {
            Some(path) => Ok(RaceCatalog::load(path).map_err(SheetError::from)?),
            None => Ok(RaceCatalog::default()),
        }
    }
}
