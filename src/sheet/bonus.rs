//! Bonus aggregation

use std::collections::BTreeMap;

use crate::schema::{BonusRecord, Stat};
use crate::store::Document;

/// Summed modifiers of a character's active bonus records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusSet {
    totals: BTreeMap<Stat, i64>,
}

impl Default for BonusSet {
    fn default() -> Self {
        Self {
            totals: Stat::BONUSABLE.iter().map(|stat| (*stat, 0)).collect(),
        }
    }
}

impl BonusSet {
    /// Every tracked stat starts at zero; only active records contribute
    pub fn aggregate(records: &[BonusRecord]) -> Self {
        let mut set = Self::default();
        for record in records.iter().filter(|r| r.active) {
            for (stat, value) in &record.values {
                if let Some(total) = set.totals.get_mut(stat) {
                    *total = total.saturating_add(*value);
                }
            }
        }
        set
    }

    pub fn from_documents(docs: &[Document]) -> Self {
        let records: Vec<BonusRecord> = docs.iter().map(BonusRecord::from_document).collect();
        Self::aggregate(&records)
    }

    /// Total modifier for a stat; untracked stats are always 0
    pub fn get(&self, stat: Stat) -> i64 {
        self.totals.get(&stat).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.totals.values().all(|v| *v == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, i64)> + '_ {
        self.totals.iter().map(|(stat, value)| (*stat, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(active: bool, values: &[(Stat, i64)]) -> BonusRecord {
        BonusRecord {
            id: "b".to_string(),
            active,
            values: values.iter().copied().collect(),
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let set = BonusSet::aggregate(&[]);
        assert!(set.is_zero());
        assert_eq!(set.iter().count(), Stat::BONUSABLE.len());
    }

    #[test]
    fn test_inactive_records_ignored() {
        let set = BonusSet::aggregate(&[
            record(false, &[(Stat::For, 3)]),
            record(false, &[(Stat::Defense, 1)]),
        ]);
        assert!(set.is_zero());
    }

    #[test]
    fn test_active_records_summed() {
        let records = vec![
            record(true, &[(Stat::For, 2), (Stat::Defense, 1)]),
            record(false, &[(Stat::For, 10)]),
            record(true, &[(Stat::For, -1), (Stat::Pv, 5)]),
        ];
        let set = BonusSet::aggregate(&records);
        assert_eq!(set.get(Stat::For), 1);
        assert_eq!(set.get(Stat::Defense), 1);
        assert_eq!(set.get(Stat::Pv), 5);
        assert_eq!(set.get(Stat::Dex), 0);

        // Same snapshot, same result
        assert_eq!(BonusSet::aggregate(&records), set);
    }

    #[test]
    fn test_max_hp_never_bonused() {
        let set = BonusSet::aggregate(&[record(true, &[(Stat::PvMax, 4)])]);
        assert_eq!(set.get(Stat::PvMax), 0);
        assert!(set.is_zero());
    }
}
