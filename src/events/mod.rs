//! Events module for overlay state changes
//!
//! Everything a presentation surface needs to redraw: the current step,
//! guide replacement, visibility and the controls line.

use serde::{Deserialize, Serialize};

/// Events emitted by the overlay controller after each state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayEvent {
    /// The cursor moved to another step
    StepChanged {
        /// Zero-based index of the current step
        index: usize,
        total: usize,
        text: String,
    },

    /// A different guide was loaded
    StepsReplaced { title: String, total: usize },

    /// The overlay was minimized
    Hidden,

    /// The overlay was restored
    Shown,

    /// Keybinds were changed and saved
    KeybindsChanged {
        /// Rendered controls line
        controls: String,
    },

    /// Quit was requested; the daemon is shutting down
    Terminated,
}

impl std::fmt::Display for OverlayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayEvent::StepChanged { index, total, .. } => {
                write!(f, "STEP_CHANGED ({}/{})", index + 1, total)
            }
            OverlayEvent::StepsReplaced { title, total } => {
                write!(f, "STEPS_REPLACED ({}, {} steps)", title, total)
            }
            OverlayEvent::Hidden => write!(f, "HIDDEN"),
            OverlayEvent::Shown => write!(f, "SHOWN"),
            OverlayEvent::KeybindsChanged { .. } => write!(f, "KEYBINDS_CHANGED"),
            OverlayEvent::Terminated => write!(f, "TERMINATED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = OverlayEvent::StepChanged {
            index: 2,
            total: 9,
            text: "Build your first Castle Heart".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("step_changed"));
        assert!(json.contains("Castle Heart"));
        assert_eq!(event.to_string(), "STEP_CHANGED (3/9)");
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"hidden"}"#;
        let event: OverlayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, OverlayEvent::Hidden);
    }
}
