//! Hit point adjustment

/// New hit points after a delta (negative = damage, positive = healing)
///
/// Never goes below zero. There is no upper clamp: healing through this path
/// can push a character past its maximum.
pub fn adjust_hp(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}
