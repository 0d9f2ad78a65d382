//! Keybind configuration types
//!
//! The on-disk document maps action names to a modifier list and a key:
//! `{"next_step": {"modifiers": ["shift"], "key": "d"}, ...}`. Missing
//! actions are filled from the defaults during deserialization.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hotkey::{Modifier, ModifierState};

/// Actions that can be bound to a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "next_step")]
    NextStep,
    #[serde(rename = "previous_step")]
    PreviousStep,
    #[serde(rename = "quit_app")]
    Quit,
    #[serde(rename = "minimize_toggle")]
    ToggleMinimize,
}

impl Action {
    /// Matching order used by the dispatcher
    pub const ALL: [Action; 4] = [
        Action::NextStep,
        Action::PreviousStep,
        Action::Quit,
        Action::ToggleMinimize,
    ];

    /// Document key for this action
    pub fn name(&self) -> &'static str {
        match self {
            Action::NextStep => "next_step",
            Action::PreviousStep => "previous_step",
            Action::Quit => "quit_app",
            Action::ToggleMinimize => "minimize_toggle",
        }
    }

    /// Short label shown in the controls line
    pub fn label(&self) -> &'static str {
        match self {
            Action::NextStep => "Next",
            Action::PreviousStep => "Previous",
            Action::Quit => "Quit",
            Action::ToggleMinimize => "Min/Max",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A modifier set plus key bound to one action
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Keybind {
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub key: String,
}

impl Keybind {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: impl Into<String>) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key: key.into(),
        }
    }

    /// Exact match against held modifiers and a normalized key token
    pub fn matches(&self, modifiers: ModifierState, token: &str) -> bool {
        ModifierState::from(&self.modifiers) == modifiers && self.key == token
    }
}

/// Renders a binding as `Shift+D`, or just `D` without modifiers
impl fmt::Display for Keybind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key.to_uppercase())
    }
}

/// Bindings for every action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindConfig {
    pub next_step: Keybind,
    pub previous_step: Keybind,
    pub quit_app: Keybind,
    pub minimize_toggle: Keybind,
}

impl Default for KeybindConfig {
    fn default() -> Self {
        Self {
            next_step: Keybind::new([Modifier::Shift], "d"),
            previous_step: Keybind::new([Modifier::Shift], "s"),
            quit_app: Keybind::new([Modifier::Shift], "q"),
            minimize_toggle: Keybind::new([Modifier::Shift], "r"),
        }
    }
}

impl KeybindConfig {
    pub fn get(&self, action: Action) -> &Keybind {
        match action {
            Action::NextStep => &self.next_step,
            Action::PreviousStep => &self.previous_step,
            Action::Quit => &self.quit_app,
            Action::ToggleMinimize => &self.minimize_toggle,
        }
    }

    pub fn get_mut(&mut self, action: Action) -> &mut Keybind {
        match action {
            Action::NextStep => &mut self.next_step,
            Action::PreviousStep => &mut self.previous_step,
            Action::Quit => &mut self.quit_app,
            Action::ToggleMinimize => &mut self.minimize_toggle,
        }
    }

    /// Bindings in dispatcher matching order
    pub fn entries(&self) -> impl Iterator<Item = (Action, &Keybind)> {
        Action::ALL.into_iter().map(move |action| (action, self.get(action)))
    }

    /// Controls help line, e.g. `Shift+D: Next | Shift+S: Previous | ...`
    pub fn controls_text(&self) -> String {
        [
            Action::NextStep,
            Action::PreviousStep,
            Action::ToggleMinimize,
            Action::Quit,
        ]
        .iter()
        .map(|action| format!("{}: {}", self.get(*action), action.label()))
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let config = KeybindConfig::default();
        let shift = ModifierState {
            shift: true,
            ..Default::default()
        };
        assert!(config.get(Action::NextStep).matches(shift, "d"));
        assert!(config.get(Action::PreviousStep).matches(shift, "s"));
        assert!(config.get(Action::Quit).matches(shift, "q"));
        assert!(config.get(Action::ToggleMinimize).matches(shift, "r"));
    }

    #[test]
    fn test_match_requires_exact_modifiers() {
        let bind = Keybind::new([Modifier::Shift], "d");
        assert!(!bind.matches(ModifierState::default(), "d"));
        assert!(!bind.matches(
            ModifierState {
                shift: true,
                ctrl: true,
                alt: false,
            },
            "d"
        ));
    }

    #[test]
    fn test_missing_actions_default() {
        let json = r#"{"next_step": {"modifiers": ["ctrl"], "key": "n"}, "unknown_action": {"key": "x"}}"#;
        let config: KeybindConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.next_step, Keybind::new([Modifier::Ctrl], "n"));
        assert_eq!(config.previous_step, KeybindConfig::default().previous_step);
        assert_eq!(config.minimize_toggle, KeybindConfig::default().minimize_toggle);
    }

    #[test]
    fn test_missing_modifiers_means_none() {
        let json = r#"{"quit_app": {"key": "f10"}}"#;
        let config: KeybindConfig = serde_json::from_str(json).unwrap();
        assert!(config.quit_app.modifiers.is_empty());
        assert!(config.quit_app.matches(ModifierState::default(), "f10"));
    }

    #[test]
    fn test_document_shape() {
        let json = serde_json::to_value(KeybindConfig::default()).unwrap();
        assert_eq!(json["next_step"]["modifiers"][0], "shift");
        assert_eq!(json["minimize_toggle"]["key"], "r");
    }

    #[test]
    fn test_controls_text() {
        let config = KeybindConfig::default();
        assert_eq!(
            config.controls_text(),
            "Shift+D: Next | Shift+S: Previous | Shift+R: Min/Max | Shift+Q: Quit"
        );
        assert_eq!(Keybind::new([], "space").to_string(), "SPACE");
    }
}
