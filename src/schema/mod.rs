//! Typed records for stored documents
//!
//! Documents arrive as loosely-typed JSON. Everything is validated and
//! defaulted here, once, so the tracker and the sheet never re-check for
//! missing or malformed fields:
//! - Missing strings get display defaults
//! - Numeric fields are coerced with leading-integer parsing (malformed = 0)

mod bonus;
mod character;
mod report;
mod room;
mod stat;

pub use bonus::BonusRecord;
pub use character::{placeholder_avatar, Category, CharacterRecord, Combatant};
pub use report::AttackReport;
pub use room::{RoomSettings, UserProfile};
pub use stat::{Stat, UnknownStat};

use serde_json::Value;

/// Display name used when a document has none
pub const UNKNOWN_NAME: &str = "Unknown";

/// Parse the leading integer of a string: optional whitespace, optional sign, digits
///
/// Trailing garbage is ignored (`"12abc"` is 12); no digits at all is `None`.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate instead of failing on absurdly long digit runs
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Coerce a stored value to an integer, treating anything non-numeric as 0
pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    }
}

/// Coerce an optional field, missing = 0
pub fn int_field(value: Option<&Value>) -> i64 {
    value.map(coerce_int).unwrap_or(0)
}

/// Loose truthiness for flag fields (`true`, non-zero numbers, non-empty strings)
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Non-empty string field
pub fn string_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
