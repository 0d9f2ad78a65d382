//! Key definitions and modifier state tracking
//!
//! Platform key sources translate their native key codes into [`Key`]
//! values; everything past that point is platform independent.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Modifier keys that participate in keybind matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
}

impl Modifier {
    /// All tracked modifiers, in display order
    pub const ALL: [Modifier; 3] = [Modifier::Shift, Modifier::Ctrl, Modifier::Alt];
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Alt => write!(f, "Alt"),
        }
    }
}

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    /// Shift key is held
    pub shift: bool,
    /// Control key is held
    pub ctrl: bool,
    /// Alt/Option key is held
    pub alt: bool,
}

impl ModifierState {
    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.shift && !self.ctrl && !self.alt
    }

    /// Mark a modifier as held or released
    pub fn set(&mut self, modifier: Modifier, held: bool) {
        match modifier {
            Modifier::Shift => self.shift = held,
            Modifier::Ctrl => self.ctrl = held,
            Modifier::Alt => self.alt = held,
        }
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Shift => self.shift,
            Modifier::Ctrl => self.ctrl,
            Modifier::Alt => self.alt,
        }
    }

    /// Held modifiers in display order
    pub fn iter(&self) -> impl Iterator<Item = Modifier> {
        let state = *self;
        Modifier::ALL.into_iter().filter(move |m| state.contains(*m))
    }
}

impl FromIterator<Modifier> for ModifierState {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut state = ModifierState::default();
        for modifier in iter {
            state.set(modifier, true);
        }
        state
    }
}

impl<'a> From<&'a BTreeSet<Modifier>> for ModifierState {
    fn from(set: &'a BTreeSet<Modifier>) -> Self {
        set.iter().copied().collect()
    }
}

/// A key as reported by a platform key source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Shift, Control or Alt (either side)
    Modifier(Modifier),
    /// A key that produces a character
    Char(char),
    /// A non-character key, by its token name (`f1`, `space`, `page_up`, ...)
    Named(&'static str),
    /// A key the source could not identify
    Unknown(u32),
}

impl Key {
    /// Normalized token used for keybind matching
    ///
    /// Characters are lower-cased; modifiers and unknown keys have no token.
    pub fn token(&self) -> Option<String> {
        match self {
            Key::Char(c) => Some(c.to_lowercase().collect()),
            Key::Named(name) => Some((*name).to_string()),
            Key::Modifier(_) | Key::Unknown(_) => None,
        }
    }
}

/// A single press or release reported by a key source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    /// `true` for key-down (including auto-repeat), `false` for key-up
    pub pressed: bool,
}

impl KeyInput {
    pub fn down(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn up(key: Key) -> Self {
        Self { key, pressed: false }
    }
}
