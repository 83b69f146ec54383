//! Temporary stat modifiers

use std::collections::BTreeMap;

use super::{int_field, truthy, Stat};
use crate::store::Document;

/// One bonus document: an on/off switch plus per-stat modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusRecord {
    pub id: String,
    pub active: bool,
    /// Only stats present on the document appear here
    pub values: BTreeMap<Stat, i64>,
}

impl BonusRecord {
    pub fn from_document(doc: &Document) -> Self {
        let values = Stat::BONUSABLE
            .iter()
            .filter_map(|stat| doc.get(stat.field()).map(|v| (*stat, int_field(Some(v)))))
            .collect();

        Self {
            id: doc.id().to_string(),
            active: truthy(doc.get("active")),
            values,
        }
    }

    /// Modifier for a stat, missing = 0
    pub fn value(&self, stat: Stat) -> i64 {
        self.values.get(&stat).copied().unwrap_or(0)
    }
}
