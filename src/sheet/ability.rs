//! Ability score modifiers

/// Modifier for an ability score: `floor((value - 10) / 2)`
pub fn ability_modifier(value: i64) -> i64 {
    value.saturating_sub(10).div_euclid(2)
}

/// Signed modifier as shown on a sheet, e.g. `+2`, `+0`, `-1`
pub fn format_modifier(modifier: i64) -> String {
    if modifier >= 0 {
        format!("+{}", modifier)
    } else {
        modifier.to_string()
    }
}
