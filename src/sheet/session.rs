//! Character sheet session
//!
//! Holds the room's player characters, the current selection and a live
//! bonus subscription for it. Characters are read once on open; bonuses
//! refresh through [`SheetSession::pending_changes`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ability_modifier, roll_level_up, BonusSet, EditForm, LevelUpRoll, RaceCatalog, SheetError};
use crate::dice::{DiceRoll, DiceSource};
use crate::room::Room;
use crate::schema::{CharacterRecord, Stat};
use crate::store::{subscribe, DocumentGateway, Fields, Subscription};
use crate::Change;

/// What a call to [`SheetSession::pending_changes`] refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEvent {
    BonusesChanged,
    /// Nothing selected, or the subscription is gone
    Closed,
}

/// One ability as displayed on the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityScore {
    pub stat: Stat,
    pub base: i64,
    pub bonus: i64,
    /// `base + bonus`
    pub value: i64,
    pub modifier: i64,
}

pub struct SheetSession {
    gateway: Arc<dyn DocumentGateway>,
    room: Room,
    dice: Arc<dyn DiceSource>,
    level_up_die: DiceRoll,
    characters: Vec<CharacterRecord>,
    selected: Option<usize>,
    bonuses: BonusSet,
    bonus_sub: Option<Subscription>,
    pending_level_up: Option<LevelUpRoll>,
}

impl std::fmt::Debug for SheetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetSession")
            .field("room", &self.room.id())
            .field("characters", &self.characters.len())
            .field("selected", &self.selected().map(|c| &c.id))
            .finish()
    }
}

impl SheetSession {
    /// Load the room's player characters and select the first one
    pub async fn open(
        gateway: Arc<dyn DocumentGateway>,
        room: Room,
        dice: Arc<dyn DiceSource>,
        level_up_die: DiceRoll,
    ) -> Result<Self, SheetError> {
        let docs = gateway.list(room.characters()).await?;
        let characters: Vec<CharacterRecord> = docs
            .iter()
            .map(CharacterRecord::from_document)
            .filter(CharacterRecord::is_player)
            .collect();

        let mut session = Self {
            gateway,
            room,
            dice,
            level_up_die,
            characters,
            selected: None,
            bonuses: BonusSet::default(),
            bonus_sub: None,
            pending_level_up: None,
        };

        if !session.characters.is_empty() {
            session.select_index(0).await?;
        }

        info!(
            "Opened character sheet for room {} with {} player characters",
            session.room.id(),
            session.characters.len()
        );
        Ok(session)
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn characters(&self) -> &[CharacterRecord] {
        &self.characters
    }

    pub fn selected(&self) -> Option<&CharacterRecord> {
        self.selected.and_then(|i| self.characters.get(i))
    }

    fn require_selected(&self) -> Result<&CharacterRecord, SheetError> {
        self.selected().ok_or(SheetError::NoSelection)
    }

    /// Switch to another player character
    pub async fn select(&mut self, id: &str) -> Result<&CharacterRecord, SheetError> {
        let index = self
            .characters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| SheetError::UnknownCharacter(id.to_string()))?;
        self.select_index(index).await?;
        self.require_selected()
    }

    async fn select_index(&mut self, index: usize) -> Result<(), SheetError> {
        if let Some(mut sub) = self.bonus_sub.take() {
            sub.close();
        }
        self.selected = Some(index);
        self.pending_level_up = None;
        self.bonuses = BonusSet::default();

        let name = self.characters[index].name.clone();
        let collection = match self.room.bonuses(&name) {
            Ok(collection) => collection,
            Err(e) => {
                // Name cannot key a bonus collection; show base values only
                warn!(
                    "No bonuses for {} in room {}: {}",
                    name,
                    self.room.id(),
                    e
                );
                return Ok(());
            }
        };
        let mut sub = subscribe(self.gateway.clone(), collection);
        if let Some(snapshot) = sub.next_snapshot().await {
            self.bonuses = BonusSet::from_documents(&snapshot?);
        }
        self.bonus_sub = Some(sub);

        debug!("Selected {} in room {}", name, self.room.id());
        Ok(())
    }

    /// Wait for the bonus collection to change and re-aggregate it
    pub async fn pending_changes(&mut self) -> Result<SheetEvent, SheetError> {
        let Some(sub) = self.bonus_sub.as_mut() else {
            return Ok(SheetEvent::Closed);
        };
        match sub.next_snapshot().await {
            Some(Ok(docs)) => {
                self.bonuses = BonusSet::from_documents(&docs);
                Ok(SheetEvent::BonusesChanged)
            }
            Some(Err(e)) => {
                warn!("Bonus refresh failed in room {}: {}", self.room.id(), e);
                Err(e.into())
            }
            None => Ok(SheetEvent::Closed),
        }
    }

    pub fn bonuses(&self) -> &BonusSet {
        &self.bonuses
    }

    /// Stored value plus active bonuses; 0 with nothing selected
    pub fn displayed(&self, stat: Stat) -> i64 {
        self.selected()
            .map(|c| c.stat(stat).saturating_add(self.bonuses.get(stat)))
            .unwrap_or(0)
    }

    /// The six abilities with their displayed values and modifiers
    pub fn ability_scores(&self) -> Vec<AbilityScore> {
        Stat::ABILITIES
            .iter()
            .map(|stat| {
                let base = self.selected().map(|c| c.stat(*stat)).unwrap_or(0);
                let bonus = self.bonuses.get(*stat);
                let value = base.saturating_add(bonus);
                AbilityScore {
                    stat: *stat,
                    base,
                    bonus,
                    value,
                    modifier: ability_modifier(value),
                }
            })
            .collect()
    }

    pub fn begin_edit(&self) -> Result<EditForm, SheetError> {
        Ok(EditForm::from_record(self.require_selected()?))
    }

    /// Write the form to the selected character and mirror it locally
    pub async fn save(&mut self, form: &EditForm) -> Result<Change<CharacterRecord>, SheetError> {
        let index = self.selected.ok_or(SheetError::NoSelection)?;
        let before = self.characters[index].clone();
        let path = self.room.character(&before.id)?;

        if let Err(e) = self.gateway.update(&path, form.fields()).await {
            warn!("Failed to save character {}: {}", before.id, e);
            return Err(e.into());
        }

        form.apply_to(&mut self.characters[index]);
        info!("Saved character {} in room {}", before.id, self.room.id());
        Ok(Change::new(before, self.characters[index].clone()))
    }

    /// Roll the level-up die; nothing is written until confirmed
    pub fn roll_level_up(&mut self) -> Result<LevelUpRoll, SheetError> {
        let con = self.require_selected()?.stat(Stat::Con);
        let rolled = roll_level_up(con, &self.level_up_die, self.dice.as_ref());
        self.pending_level_up = Some(rolled);
        debug!(
            "Level-up roll {} + {} = {}",
            rolled.roll, rolled.con_modifier, rolled.increase
        );
        Ok(rolled)
    }

    pub fn pending_level_up(&self) -> Option<&LevelUpRoll> {
        self.pending_level_up.as_ref()
    }

    pub fn cancel_level_up(&mut self) {
        self.pending_level_up = None;
    }

    /// Commit the pending roll: maximum and current hit points both become
    /// the old maximum plus the increase
    ///
    /// Returns the maximum hit points before and after. On a failed write
    /// the roll stays pending.
    pub async fn confirm_level_up(&mut self) -> Result<Change<i64>, SheetError> {
        let index = self.selected.ok_or(SheetError::NoSelection)?;
        let rolled = self.pending_level_up.ok_or(SheetError::NoPendingRoll)?;

        let character = &self.characters[index];
        let before = character.stat(Stat::PvMax);
        let after = rolled.new_max(before);
        let path = self.room.character(&character.id)?;

        let mut fields = Fields::new();
        fields.insert(Stat::PvMax.field().to_string(), Value::from(after));
        fields.insert(Stat::Pv.field().to_string(), Value::from(after));

        if let Err(e) = self.gateway.update(&path, fields).await {
            warn!("Failed to level up {}: {}", self.characters[index].id, e);
            return Err(e.into());
        }

        let character = &mut self.characters[index];
        character.set_stat(Stat::PvMax, after);
        character.set_stat(Stat::Pv, after);
        self.pending_level_up = None;

        info!(
            "Leveled up {}: max hit points {} -> {}",
            character.name, before, after
        );
        Ok(Change::new(before, after))
    }

    pub fn race_abilities(&self, catalog: &RaceCatalog) -> Result<Vec<String>, SheetError> {
        Ok(catalog.abilities(self.require_selected()?.race.as_deref()))
    }

    /// Tear down the bonus subscription
    pub fn close(&mut self) {
        if let Some(mut sub) = self.bonus_sub.take() {
            sub.close();
        }
        info!("Closed character sheet for room {}", self.room.id());
    }
}
