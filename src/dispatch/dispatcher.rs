//! Matches key candidates against the active keybinds
//!
//! A single cooldown is shared by every action: once an action fires,
//! all candidates inside the debounce window are dropped before matching.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::hotkey::ModifierState;
use crate::keybind::{Action, KeybindConfig};

/// Default minimum time between two accepted actions
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

pub struct Dispatcher {
    config: KeybindConfig,
    debounce: Duration,
    /// When the last action fired
    last_action_at: Option<Instant>,
}

impl Dispatcher {
    pub fn new(config: KeybindConfig, debounce: Duration) -> Self {
        Self {
            config,
            debounce,
            last_action_at: None,
        }
    }

    pub fn config(&self) -> &KeybindConfig {
        &self.config
    }

    /// Swap in a new configuration; applies from the next candidate on
    pub fn set_config(&mut self, config: KeybindConfig) {
        debug!("dispatcher keybinds replaced");
        self.config = config;
    }

    /// Resolve a candidate to at most one action
    pub fn on_candidate(
        &mut self,
        modifiers: ModifierState,
        token: &str,
        now: Instant,
    ) -> Option<Action> {
        if let Some(last) = self.last_action_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.debounce {
                trace!(token, elapsed_ms = elapsed.as_millis() as u64, "candidate debounced");
                return None;
            }
        }

        let action = self
            .config
            .entries()
            .find(|(_, bind)| bind.matches(modifiers, token))
            .map(|(action, _)| action)?;

        debug!(%action, token, ?modifiers, "keybind matched");
        self.last_action_at = Some(now);
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;
    use crate::keybind::Keybind;

    const SHIFT: ModifierState = ModifierState {
        shift: true,
        ctrl: false,
        alt: false,
    };

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(KeybindConfig::default(), DEFAULT_DEBOUNCE)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_matches_default_bindings() {
        let mut d = dispatcher();
        let t0 = Instant::now();
        assert_eq!(d.on_candidate(SHIFT, "d", t0), Some(Action::NextStep));
        assert_eq!(d.on_candidate(SHIFT, "s", t0 + ms(300)), Some(Action::PreviousStep));
        assert_eq!(d.on_candidate(SHIFT, "r", t0 + ms(600)), Some(Action::ToggleMinimize));
        assert_eq!(d.on_candidate(SHIFT, "q", t0 + ms(900)), Some(Action::Quit));
    }

    #[test]
    fn test_no_match_without_modifier() {
        let mut d = dispatcher();
        assert_eq!(d.on_candidate(ModifierState::default(), "d", Instant::now()), None);
    }

    #[test]
    fn test_extra_modifier_does_not_match() {
        let mut d = dispatcher();
        let shift_ctrl = ModifierState {
            ctrl: true,
            ..SHIFT
        };
        assert_eq!(d.on_candidate(shift_ctrl, "d", Instant::now()), None);
    }

    #[test]
    fn test_debounce_window() {
        let t = Instant::now() + ms(1_000);

        let mut inside = dispatcher();
        assert!(inside.on_candidate(SHIFT, "d", t - ms(100)).is_some());
        assert_eq!(inside.on_candidate(SHIFT, "d", t), None);

        let mut outside = dispatcher();
        assert!(outside.on_candidate(SHIFT, "d", t - ms(250)).is_some());
        assert_eq!(outside.on_candidate(SHIFT, "d", t), Some(Action::NextStep));
    }

    #[test]
    fn test_debounce_is_global_across_actions() {
        let mut d = dispatcher();
        let t0 = Instant::now();
        assert_eq!(d.on_candidate(SHIFT, "d", t0), Some(Action::NextStep));
        // A different action inside the window is dropped too
        assert_eq!(d.on_candidate(SHIFT, "s", t0 + ms(150)), None);
        assert_eq!(d.on_candidate(SHIFT, "s", t0 + ms(200)), Some(Action::PreviousStep));
    }

    #[test]
    fn test_unmatched_candidate_does_not_reset_window() {
        let mut d = dispatcher();
        let t0 = Instant::now();
        assert!(d.on_candidate(SHIFT, "x", t0).is_none());
        assert_eq!(d.on_candidate(SHIFT, "d", t0 + ms(10)), Some(Action::NextStep));
    }

    #[test]
    fn test_press_repeat_scenario() {
        let mut d = dispatcher();
        let t0 = Instant::now();
        assert_eq!(d.on_candidate(SHIFT, "d", t0), Some(Action::NextStep));
        assert_eq!(d.on_candidate(SHIFT, "d", t0 + ms(150)), None);
        assert_eq!(d.on_candidate(SHIFT, "d", t0 + ms(250)), Some(Action::NextStep));
    }

    #[test]
    fn test_set_config_applies_immediately() {
        let mut d = dispatcher();
        let mut config = KeybindConfig::default();
        config.next_step = Keybind::new([Modifier::Alt], "n");
        d.set_config(config);

        let alt = ModifierState {
            alt: true,
            ..Default::default()
        };
        let t0 = Instant::now();
        assert_eq!(d.on_candidate(SHIFT, "d", t0), None);
        assert_eq!(d.on_candidate(alt, "n", t0), Some(Action::NextStep));
    }

    #[test]
    fn test_multi_modifier_binding() {
        let mut config = KeybindConfig::default();
        config.quit_app = Keybind::new([Modifier::Ctrl, Modifier::Shift], "q");
        let mut d = Dispatcher::new(config, DEFAULT_DEBOUNCE);

        let ctrl_shift = ModifierState {
            ctrl: true,
            ..SHIFT
        };
        let t0 = Instant::now();
        assert_eq!(d.on_candidate(SHIFT, "q", t0), None);
        assert_eq!(d.on_candidate(ctrl_shift, "q", t0), Some(Action::Quit));
    }
}
