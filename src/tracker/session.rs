//! Turn tracker session
//!
//! One [`TurnTracker`] per open dashboard. It owns the in-memory turn order,
//! the subscriptions feeding it, and the write path back to the store.
//! Failed writes are logged and returned; the in-memory order is not rolled
//! back except for initiative rolls, which are all-or-nothing.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{adjust_hp, build_order, order, send_to_back, TrackerError};
use crate::dice::{DiceRoll, DiceSource};
use crate::room::Room;
use crate::schema::{AttackReport, Combatant, RoomSettings, Stat};
use crate::store::{
    subscribe, Document, DocumentGateway, Fields, GatewayError, Subscription, WriteOp,
};
use crate::Change;

/// What a call to [`TurnTracker::pending_changes`] refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    CharactersChanged,
    ReportsChanged,
    /// The subscriptions are gone; no further events will arrive
    Closed,
}

enum Feed {
    Characters,
    Reports,
}

/// Game master's view of one room
pub struct TurnTracker {
    gateway: Arc<dyn DocumentGateway>,
    room: Room,
    dice: Arc<dyn DiceSource>,
    initiative_die: DiceRoll,
    order: Vec<Combatant>,
    /// Last known active-turn pointer
    active_turn: Option<String>,
    /// Pending reports of the combatant at the head of the order
    reports: Vec<AttackReport>,
    characters_sub: Subscription,
    reports_sub: Option<Subscription>,
}

impl std::fmt::Debug for TurnTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnTracker")
            .field("room", &self.room.id())
            .field("combatants", &self.order.len())
            .field("active_turn", &self.active_turn)
            .finish()
    }
}

async fn next_report_snapshot(
    sub: &mut Option<Subscription>,
) -> Option<Result<Vec<Document>, GatewayError>> {
    match sub {
        Some(sub) => sub.next_snapshot().await,
        None => std::future::pending().await,
    }
}

fn initiative_fields(combatant: &Combatant) -> Fields {
    let mut fields = Fields::new();
    fields.insert("currentInit".to_string(), Value::from(combatant.current_init));
    fields.insert(
        "initDetails".to_string(),
        Value::from(combatant.init_details.clone().unwrap_or_default()),
    );
    fields
}

impl TurnTracker {
    /// Open the dashboard for a room
    ///
    /// Reads the active-turn pointer, subscribes to the room's characters and
    /// to the reports of whoever is first in the order.
    pub async fn open(
        gateway: Arc<dyn DocumentGateway>,
        room: Room,
        dice: Arc<dyn DiceSource>,
        initiative_die: DiceRoll,
    ) -> Result<Self, TrackerError> {
        let settings = gateway.get(room.settings()).await?;
        let active_turn = RoomSettings::from_document(settings.as_ref()).active_turn;
        let characters_sub = subscribe(gateway.clone(), room.characters().clone());

        let mut tracker = Self {
            gateway,
            room,
            dice,
            initiative_die,
            order: Vec::new(),
            active_turn,
            reports: Vec::new(),
            characters_sub,
            reports_sub: None,
        };

        if let Some(snapshot) = tracker.characters_sub.next_snapshot().await {
            tracker.apply_characters(&snapshot?).await?;
        }

        info!(
            "Opened turn tracker for room {} with {} combatants",
            tracker.room.id(),
            tracker.order.len()
        );
        Ok(tracker)
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Current turn order, active combatant first
    pub fn order(&self) -> &[Combatant] {
        &self.order
    }

    /// Combatant whose turn it is
    pub fn active(&self) -> Option<&Combatant> {
        self.order.first()
    }

    /// Last known active-turn pointer
    pub fn active_turn(&self) -> Option<&str> {
        self.active_turn.as_deref()
    }

    pub fn combatant(&self, id: &str) -> Option<&Combatant> {
        self.order.iter().find(|c| c.id == id)
    }

    /// Pending attack reports of the active combatant
    pub fn reports(&self) -> &[AttackReport] {
        &self.reports
    }

    pub fn reports_for(&self, attacker_id: &str) -> Vec<&AttackReport> {
        self.reports
            .iter()
            .filter(|r| r.attacker == attacker_id)
            .collect()
    }

    fn head_id(&self) -> Option<String> {
        self.order.first().map(|c| c.id.clone())
    }

    /// Wait for the next change from either subscription and apply it
    pub async fn pending_changes(&mut self) -> Result<TrackerEvent, TrackerError> {
        let characters = &mut self.characters_sub;
        let reports = &mut self.reports_sub;

        let (feed, snapshot) = tokio::select! {
            snapshot = characters.next_snapshot() => (Feed::Characters, snapshot),
            snapshot = next_report_snapshot(reports) => (Feed::Reports, snapshot),
        };

        let Some(snapshot) = snapshot else {
            return Ok(TrackerEvent::Closed);
        };
        let docs = snapshot.map_err(|e| {
            warn!("Snapshot refresh failed in room {}: {}", self.room.id(), e);
            e
        })?;

        match feed {
            Feed::Characters => {
                self.apply_characters(&docs).await?;
                Ok(TrackerEvent::CharactersChanged)
            }
            Feed::Reports => {
                self.apply_reports(&docs);
                Ok(TrackerEvent::ReportsChanged)
            }
        }
    }

    async fn apply_characters(&mut self, docs: &[Document]) -> Result<(), TrackerError> {
        let previous_head = self.head_id();
        self.order = build_order(docs, self.active_turn.as_deref());
        debug!(
            "Room {} order refreshed: {} combatants",
            self.room.id(),
            self.order.len()
        );

        if self.head_id() != previous_head || self.reports_sub.is_none() {
            self.follow_head().await?;
        }
        Ok(())
    }

    fn apply_reports(&mut self, docs: &[Document]) {
        self.reports = docs.iter().map(AttackReport::from_document).collect();
    }

    /// Point the report subscription at the current head of the order
    async fn follow_head(&mut self) -> Result<(), TrackerError> {
        if let Some(mut sub) = self.reports_sub.take() {
            sub.close();
        }
        self.reports.clear();

        let Some(head) = self.head_id() else {
            return Ok(());
        };

        let mut sub = subscribe(self.gateway.clone(), self.room.reports(&head)?);
        if let Some(snapshot) = sub.next_snapshot().await {
            let docs = snapshot.map_err(|e| {
                warn!("Failed to load reports of {}: {}", head, e);
                e
            })?;
            self.apply_reports(&docs);
        }
        self.reports_sub = Some(sub);
        Ok(())
    }

    async fn set_active_turn(&mut self, id: &str) -> Result<(), TrackerError> {
        self.active_turn = Some(id.to_string());

        let fields = RoomSettings::active_turn_fields(id);
        let result = match self.gateway.update(self.room.settings(), fields.clone()).await {
            // First turn ever in this room
            Err(GatewayError::NotFound(_)) => self.gateway.set(self.room.settings(), fields).await,
            other => other,
        };

        result.map_err(|e| {
            warn!(
                "Failed to move active turn to {} in room {}: {}",
                id,
                self.room.id(),
                e
            );
            TrackerError::from(e)
        })
    }

    /// Delete every pending report filed by `attacker_id`
    async fn discard_reports(&mut self, attacker_id: &str) -> Result<usize, TrackerError> {
        let collection = self.room.reports(attacker_id)?;
        let docs = self.gateway.list(&collection).await.map_err(|e| {
            warn!("Failed to list reports of {}: {}", attacker_id, e);
            e
        })?;

        let mut removed = 0;
        let mut first_error = None;
        for report in docs
            .iter()
            .map(AttackReport::from_document)
            .filter(|r| r.attacker == attacker_id)
        {
            match self.gateway.delete(&report.path).await {
                Ok(_) => {
                    removed += 1;
                    self.reports.retain(|r| r.path != report.path);
                }
                Err(e) => {
                    warn!("Failed to delete report {}: {}", report.path, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                debug!("Discarded {} reports of {}", removed, attacker_id);
                Ok(removed)
            }
        }
    }

    /// Roll initiative for every combatant
    ///
    /// All totals are written in one batch. If the batch fails the in-memory
    /// order is left as it was. On success the top roller becomes active.
    pub async fn roll_initiative(&mut self) -> Result<Change<Vec<Combatant>>, TrackerError> {
        let before = self.order.clone();
        if before.is_empty() {
            return Ok(Change::new(before.clone(), before));
        }

        let rolled = order::roll_initiative(&before, &self.initiative_die, self.dice.as_ref());

        let ops = rolled
            .iter()
            .map(|c| {
                Ok(WriteOp::Update {
                    path: self.room.character(&c.id)?,
                    fields: initiative_fields(c),
                })
            })
            .collect::<Result<Vec<_>, TrackerError>>()?;

        if let Err(e) = self.gateway.batch(ops).await {
            warn!(
                "Failed to persist initiative rolls in room {}: {}",
                self.room.id(),
                e
            );
            return Err(e.into());
        }

        self.order = rolled;
        let head = self.order[0].id.clone();
        info!(
            "Rolled initiative in room {}: {} goes first",
            self.room.id(),
            head
        );

        let mut first_error = self.set_active_turn(&head).await.err();
        if before.first().map(|c| &c.id) != Some(&head) {
            if let Err(e) = self.follow_head().await {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(Change::new(before, self.order.clone()))
    }

    /// End the active combatant's turn
    ///
    /// Discards the active combatant's reports, rotates it to the back and
    /// moves the pointer to the new head. The rotation stands even if a
    /// write fails; the first failure is returned.
    pub async fn advance_turn(&mut self) -> Result<Change<Option<String>>, TrackerError> {
        let before = self.head_id();
        let Some(head) = before.clone() else {
            return Ok(Change::new(None, None));
        };

        let mut first_error = self.discard_reports(&head).await.err();

        self.order.rotate_left(1);
        let after = self.head_id();

        if let Some(new_head) = &after {
            if let Err(e) = self.set_active_turn(new_head).await {
                first_error.get_or_insert(e);
            }
        }
        if after != before {
            if let Err(e) = self.follow_head().await {
                first_error.get_or_insert(e);
            }
        }

        debug!(
            "Room {} turn: {:?} -> {:?}",
            self.room.id(),
            before,
            after
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(Change::new(before, after)),
        }
    }

    /// Take a combatant out of the rotation
    ///
    /// Discards its reports and sends it to the back of the order; it stays
    /// in the list. Unknown ids are ignored (`Ok(None)`).
    pub async fn remove_combatant(
        &mut self,
        id: &str,
    ) -> Result<Option<Change<Option<String>>>, TrackerError> {
        if self.order.len() < 2 {
            return Err(TrackerError::TooFewCombatants {
                needed: 2,
                have: self.order.len(),
            });
        }
        if self.combatant(id).is_none() {
            debug!("No combatant {} in room {}, nothing to remove", id, self.room.id());
            return Ok(None);
        }

        let before = self.head_id();
        let mut first_error = self.discard_reports(id).await.err();

        send_to_back(&mut self.order, id);
        let after = self.head_id();

        if let Some(new_head) = &after {
            if let Err(e) = self.set_active_turn(new_head).await {
                first_error.get_or_insert(e);
            }
        }
        if after != before {
            if let Err(e) = self.follow_head().await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Some(Change::new(before, after))),
        }
    }

    /// Damage (negative delta) or heal (positive delta) a combatant
    ///
    /// Hit points never drop below zero. Unknown ids are ignored (`Ok(None)`).
    pub async fn apply_delta(
        &mut self,
        id: &str,
        delta: i64,
    ) -> Result<Option<Change<i64>>, TrackerError> {
        let Some(index) = self.order.iter().position(|c| c.id == id) else {
            debug!("No combatant {} in room {}, ignoring hp change", id, self.room.id());
            return Ok(None);
        };

        let before = self.order[index].hp;
        let after = adjust_hp(before, delta);

        let mut fields = Fields::new();
        fields.insert(Stat::Pv.field().to_string(), Value::from(after));

        let path = self.room.character(id)?;
        if let Err(e) = self.gateway.update(&path, fields).await {
            warn!("Failed to update hit points of {}: {}", id, e);
            return Err(e.into());
        }

        self.order[index].hp = after;
        debug!("{} hit points: {} -> {}", id, before, after);
        Ok(Some(Change::new(before, after)))
    }

    /// Apply a pending report's damage and consume the report
    ///
    /// Target and damage default to the report's own; damage below zero is
    /// treated as zero. Unknown reports or targets are ignored (`Ok(None)`).
    pub async fn apply_report(
        &mut self,
        report_id: &str,
        target: Option<&str>,
        damage: Option<i64>,
    ) -> Result<Option<Change<i64>>, TrackerError> {
        let Some(report) = self.reports.iter().find(|r| r.id == report_id).cloned() else {
            debug!("No pending report {} in room {}", report_id, self.room.id());
            return Ok(None);
        };

        let target = target.unwrap_or(&report.target);
        let damage = damage.unwrap_or(report.damage).max(0);

        let change = self.apply_delta(target, -damage).await?;
        if change.is_some() {
            if let Err(e) = self.gateway.delete(&report.path).await {
                warn!("Failed to consume report {}: {}", report.path, e);
                return Err(e.into());
            }
            self.reports.retain(|r| r.id != report.id);
        }
        Ok(change)
    }

    /// Tear down both subscriptions
    pub fn close(&mut self) {
        self.characters_sub.close();
        if let Some(mut sub) = self.reports_sub.take() {
            sub.close();
        }
        info!("Closed turn tracker for room {}", self.room.id());
    }
}
