//! Per-field edit locks.
//!
//! A field is locked while the operator is interacting with it and for a grace
//! window after the last interaction. Locked fields are never overwritten by a
//! status refresh, so a periodic poll cannot clobber a value being typed.

use crate::clock::Clock;
use log::debug;
use std::fmt;

/// Default grace window after the last interaction.
pub const DEFAULT_GRACE_MS: u64 = 5_000;

/// Editable timing fields on the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Green,
    Yellow,
    Red,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Green, Field::Yellow, Field::Red];

    fn index(self) -> usize {
        match self {
            Field::Green => 0,
            Field::Yellow => 1,
            Field::Red => 2,
        }
    }

    /// Accepts the short panel names (`g`, `y`, `r`) as well as full names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "g" | "green" => Some(Field::Green),
            "y" | "yellow" => Some(Field::Yellow),
            "r" | "red" => Some(Field::Red),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Green => "green",
            Field::Yellow => "yellow",
            Field::Red => "red",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldLockState {
    pub active: bool,
    /// `None` until the field is first touched.
    pub last_touch_ms: Option<u64>,
}

pub struct FieldLockManager<K: Clock> {
    clock: K,
    grace_ms: u64,
    states: [FieldLockState; 3],
}

impl<K: Clock> FieldLockManager<K> {
    pub fn new(clock: K, grace_ms: u64) -> Self {
        FieldLockManager {
            clock,
            grace_ms,
            states: [FieldLockState::default(); 3],
        }
    }

    /// Set the active flag and refresh the touch timestamp.
    pub fn mark(&mut self, field: Field, active: bool) {
        let now = self.clock.now_ms();
        let state = &mut self.states[field.index()];
        state.active = active;
        state.last_touch_ms = Some(now);
        debug!("[lock] {} active={} at {}ms", field, active, now);
    }

    /// Refresh the touch timestamp without changing the active flag.
    pub fn touch(&mut self, field: Field) {
        let now = self.clock.now_ms();
        self.states[field.index()].last_touch_ms = Some(now);
    }

    pub fn is_locked(&self, field: Field) -> bool {
        let state = &self.states[field.index()];
        if state.active {
            return true;
        }
        match state.last_touch_ms {
            Some(last) => self.clock.now_ms().saturating_sub(last) < self.grace_ms,
            None => false,
        }
    }

    /// Mark every field inactive. Timestamps refresh, so the grace window
    /// still runs from now.
    pub fn release_all(&mut self) {
        for field in Field::ALL {
            self.mark(field, false);
        }
    }

    pub fn state(&self, field: Field) -> FieldLockState {
        self.states[field.index()]
    }

    pub fn grace_ms(&self) -> u64 {
        self.grace_ms
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manager() -> (ManualClock, FieldLockManager<ManualClock>) {
        let clock = ManualClock::new(1_000);
        let locks = FieldLockManager::new(clock.clone(), DEFAULT_GRACE_MS);
        (clock, locks)
    }

    #[test]
    fn test_untouched_fields_are_unlocked() {
        let (_clock, locks) = manager();
        for field in Field::ALL {
            assert!(!locks.is_locked(field));
        }
    }

    #[test]
    fn test_active_field_stays_locked_past_grace() {
        let (clock, mut locks) = manager();
        locks.mark(Field::Green, true);
        assert!(locks.is_locked(Field::Green));

        clock.advance(60_000);
        assert!(locks.is_locked(Field::Green));
        assert!(!locks.is_locked(Field::Yellow));
    }

    #[test]
    fn test_release_unlocks_exactly_at_grace_boundary() {
        let (clock, mut locks) = manager();
        locks.mark(Field::Red, true);
        clock.advance(300);
        locks.mark(Field::Red, false);

        clock.advance(DEFAULT_GRACE_MS - 1);
        assert!(locks.is_locked(Field::Red));

        clock.advance(1);
        assert!(!locks.is_locked(Field::Red));
    }

    #[test]
    fn test_touch_extends_grace_without_activating() {
        let (clock, mut locks) = manager();
        locks.mark(Field::Yellow, false);
        clock.advance(4_000);
        locks.touch(Field::Yellow);
        assert!(!locks.state(Field::Yellow).active);

        clock.advance(4_000);
        assert!(locks.is_locked(Field::Yellow));

        clock.advance(1_000);
        assert!(!locks.is_locked(Field::Yellow));
    }

    #[test]
    fn test_touch_keeps_active_flag() {
        let (_clock, mut locks) = manager();
        locks.mark(Field::Green, true);
        locks.touch(Field::Green);
        assert!(locks.state(Field::Green).active);
    }

    #[test]
    fn test_release_all_clears_active_but_keeps_grace() {
        let (clock, mut locks) = manager();
        locks.mark(Field::Green, true);
        locks.mark(Field::Yellow, true);
        locks.release_all();

        for field in Field::ALL {
            assert!(!locks.state(field).active);
            assert!(locks.is_locked(field));
        }
        clock.advance(DEFAULT_GRACE_MS);
        for field in Field::ALL {
            assert!(!locks.is_locked(field));
        }
    }

    #[test]
    fn test_custom_grace_window() {
        let clock = ManualClock::new(0);
        let mut locks = FieldLockManager::new(clock.clone(), 250);
        locks.mark(Field::Green, false);
        clock.advance(249);
        assert!(locks.is_locked(Field::Green));
        clock.advance(1);
        assert!(!locks.is_locked(Field::Green));
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(Field::parse("g"), Some(Field::Green));
        assert_eq!(Field::parse("Yellow"), Some(Field::Yellow));
        assert_eq!(Field::parse("R"), Some(Field::Red));
        assert_eq!(Field::parse("blue"), None);
    }
}
