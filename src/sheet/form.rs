//! Character edit form

use serde_json::Value;

use crate::schema::{parse_leading_int, CharacterRecord, Stat};
use crate::store::Fields;

/// Raw values of the thirteen editable stats, in form order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    values: Vec<(Stat, i64)>,
}

impl EditForm {
    /// Prefill from stored values; bonuses are not included
    pub fn from_record(record: &CharacterRecord) -> Self {
        Self {
            values: Stat::EDITABLE
                .iter()
                .map(|stat| (*stat, record.stat(*stat)))
                .collect(),
        }
    }

    pub fn get(&self, stat: Stat) -> i64 {
        self.values
            .iter()
            .find(|(s, _)| *s == stat)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    pub fn set(&mut self, stat: Stat, value: i64) {
        match self.values.iter_mut().find(|(s, _)| *s == stat) {
            Some(entry) => entry.1 = value,
            None => self.values.push((stat, value)),
        }
    }

    /// Set from typed text; anything without a leading integer becomes 0
    pub fn set_from_input(&mut self, stat: Stat, input: &str) {
        self.set(stat, parse_leading_int(input).unwrap_or(0));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, i64)> + '_ {
        self.values.iter().copied()
    }

    /// Partial update writing every form field
    pub fn fields(&self) -> Fields {
        self.values
            .iter()
            .map(|(stat, value)| (stat.field().to_string(), Value::from(*value)))
            .collect()
    }

    pub fn apply_to(&self, record: &mut CharacterRecord) {
        for (stat, value) in &self.values {
            record.set_stat(*stat, *value);
        }
    }
}
