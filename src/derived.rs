//! Red-duration bookkeeping.
//!
//! Red is derived: `red = green + yellow`. Editing green or yellow pushes the
//! sum into red; editing red pulls green back out of it. Field values are kept
//! as the raw text the operator typed, and anything that does not parse is
//! left alone until it does.

use crate::lock::Field;

pub const MIN_SECONDS: u32 = 1;
pub const MAX_SECONDS: u32 = 86_400;

/// Raw text of the three timing inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingFields {
    pub green: String,
    pub yellow: String,
    pub red: String,
}

impl TimingFields {
    pub fn new(green: &str, yellow: &str, red: &str) -> Self {
        TimingFields {
            green: green.to_string(),
            yellow: yellow.to_string(),
            red: red.to_string(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Green => &self.green,
            Field::Yellow => &self.yellow,
            Field::Red => &self.red,
        }
    }

    pub fn set(&mut self, field: Field, text: impl Into<String>) {
        let slot = match field {
            Field::Green => &mut self.green,
            Field::Yellow => &mut self.yellow,
            Field::Red => &mut self.red,
        };
        *slot = text.into();
    }

    pub fn seconds(&self, field: Field) -> Option<i64> {
        parse_seconds(self.get(field))
    }
}

/// Parse a field's text as whole seconds, rounding fractional input.
pub fn parse_seconds(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: f64 = trimmed.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round() as i64)
}

/// Clamp a duration into the range the controller accepts.
pub fn clamp_seconds(n: i64) -> u32 {
    n.clamp(MIN_SECONDS as i64, MAX_SECONDS as i64) as u32
}

/// Forward update after green or yellow changed. Returns whether red was
/// rewritten.
pub fn sync_red(fields: &mut TimingFields, red_locked: bool) -> bool {
    let (Some(green), Some(yellow)) = (fields.seconds(Field::Green), fields.seconds(Field::Yellow))
    else {
        return false;
    };
    if red_locked {
        return false;
    }
    match green.checked_add(yellow) {
        Some(red) => {
            fields.red = red.to_string();
            true
        }
        None => false,
    }
}

/// Backward update after red changed: green becomes `red - yellow`, floored
/// at one second. Returns whether green was rewritten.
pub fn red_edited(fields: &mut TimingFields, red_locked: bool) -> bool {
    let (Some(red), Some(yellow)) = (fields.seconds(Field::Red), fields.seconds(Field::Yellow))
    else {
        return false;
    };
    let Some(green) = red.checked_sub(yellow) else {
        return false;
    };
    let green = green.max(MIN_SECONDS as i64);
    fields.green = green.to_string();

    if !red_locked {
        if let Some(red) = green.checked_add(yellow) {
            fields.red = red.to_string();
        }
    }
    true
}
