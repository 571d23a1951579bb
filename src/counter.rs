// src/counter.rs
//
// Counter tracking: the latest value reported by the device and the signed
// delta from the previous reading.

/// Result of feeding a value into the counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateResult {
    /// First value since creation or reset (delta is 0)
    Initial(u32),
    /// Value differs from the previous one
    Changed { value: u32, delta: i64 },
    /// Same value as before; nothing to notify
    Unchanged,
}

/// Snapshot of the counter for display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterState {
    current: Option<u32>,
    last_delta: i64,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: u32) -> UpdateResult {
        match self.current {
            None => {
                self.current = Some(value);
                self.last_delta = 0;
                UpdateResult::Initial(value)
            }
            Some(current) if current == value => UpdateResult::Unchanged,
            Some(current) => {
                let delta = i64::from(value) - i64::from(current);
                self.current = Some(value);
                self.last_delta = delta;
                UpdateResult::Changed { value, delta }
            }
        }
    }

    /// Back to the unset state; the displayed delta returns to `+0`.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_delta = 0;
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn last_delta(&self) -> i64 {
        self.last_delta
    }

    /// Value as shown to the user (`0` while unset)
    pub fn value_text(&self) -> String {
        self.current.unwrap_or(0).to_string()
    }

    /// Delta as shown to the user, always signed (`+10`, `-3`, `+0`)
    pub fn delta_text(&self) -> String {
        format_delta(self.last_delta)
    }
}

pub fn format_delta(delta: i64) -> String {
    if delta >= 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}
