//! Application lifecycle state machine
//!
//! Running and Minimized toggle into each other; Quit moves either into
//! Terminated, which never leaves.

use serde::{Deserialize, Serialize};

/// The three lifecycle states of the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Overlay visible, hotkeys active
    #[default]
    Running,
    /// Overlay hidden, hotkeys still active
    Minimized,
    /// Quit requested
    Terminated,
}

impl Lifecycle {
    /// Next state after a minimize toggle
    pub fn toggle_minimize(self) -> Self {
        match self {
            Lifecycle::Running => Lifecycle::Minimized,
            Lifecycle::Minimized => Lifecycle::Running,
            Lifecycle::Terminated => Lifecycle::Terminated,
        }
    }

    /// Next state after quit
    pub fn quit(self) -> Self {
        Lifecycle::Terminated
    }

    pub fn is_visible(&self) -> bool {
        *self == Lifecycle::Running
    }

    pub fn is_terminated(&self) -> bool {
        *self == Lifecycle::Terminated
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Running => write!(f, "Running"),
            Lifecycle::Minimized => write!(f, "Minimized"),
            Lifecycle::Terminated => write!(f, "Terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(Lifecycle::default(), Lifecycle::Running);
        assert!(Lifecycle::default().is_visible());
    }

    #[test]
    fn test_toggle_round_trip() {
        let minimized = Lifecycle::Running.toggle_minimize();
        assert_eq!(minimized, Lifecycle::Minimized);
        assert!(!minimized.is_visible());
        assert_eq!(minimized.toggle_minimize(), Lifecycle::Running);
    }

    #[test]
    fn test_quit_from_any_state() {
        assert_eq!(Lifecycle::Running.quit(), Lifecycle::Terminated);
        assert_eq!(Lifecycle::Minimized.quit(), Lifecycle::Terminated);
    }

    #[test]
    fn test_terminated_is_absorbing() {
        let state = Lifecycle::Terminated;
        assert_eq!(state.toggle_minimize(), Lifecycle::Terminated);
        assert_eq!(state.quit(), Lifecycle::Terminated);
        assert!(state.is_terminated());
    }
}
