//! Modifier key state tracking
//!
//! Keeps the set of modifiers currently held, fed by raw press/release
//! events from the listener thread.

use super::keys::Modifier;
use std::collections::BTreeSet;

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierTracker {
    pressed: BTreeSet<Modifier>,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press(&mut self, modifier: Modifier) {
        self.pressed.insert(modifier);
    }

    pub fn on_release(&mut self, modifier: Modifier) {
        self.pressed.remove(&modifier);
    }

    /// Copy of the currently held modifiers
    pub fn snapshot(&self) -> BTreeSet<Modifier> {
        self.pressed.clone()
    }

    pub fn is_held(&self, modifier: Modifier) -> bool {
        self.pressed.contains(&modifier)
    }

    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Forget everything, used when the listener shuts down
    pub fn clear(&mut self) {
        self.pressed.clear();
    }
}
